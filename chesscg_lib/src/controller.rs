use crate::board::{Color, Coord, PieceKind};
use crate::input::{self, BoardGeometry};
use crate::messages::{ClientMessage, GameSnapshot, GameStatus};
use crate::promotion::PromotionSelector;
use log::trace;
use smallvec::SmallVec;

/// Whether the server's move list for the current snapshot is the player's real legal moves
/// or the premove candidates it offers while the opponent is to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveContext {
   Legal,
   Premove,
}

pub type Targets = SmallVec<[Coord; 8]>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
   Idle,
   SquareSelected {
      origin: Coord,
      targets: Targets,
      context: MoveContext,
   },
   PromotionPending {
      from: Coord,
      to: Coord,
      context: MoveContext,
   },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Premove {
   pub from: Coord,
   pub to: Coord,
   pub promotion: Option<PieceKind>,
}

/// Turns square clicks, drags and promotion picks into wire messages.
///
/// The controller never decides legality on its own. Destinations come from the move list
/// attached to the latest snapshot, and every newer snapshot is free to throw local
/// speculation away.
pub struct MoveController {
   player: Color,
   snapshot: Option<GameSnapshot>,
   selection: Selection,
   premove: Option<Premove>,
}

impl MoveController {
   pub fn new(player: Color) -> MoveController {
      MoveController {
         player,
         snapshot: None,
         selection: Selection::Idle,
         premove: None,
      }
   }

   pub fn player(&self) -> Color {
      self.player
   }

   pub fn snapshot(&self) -> Option<&GameSnapshot> {
      self.snapshot.as_ref()
   }

   pub fn selection(&self) -> &Selection {
      &self.selection
   }

   pub fn premove(&self) -> Option<Premove> {
      self.premove
   }

   pub fn active_square(&self) -> Option<Coord> {
      match &self.selection {
         Selection::SquareSelected { origin, .. } => Some(*origin),
         Selection::PromotionPending { from, .. } => Some(*from),
         Selection::Idle => None,
      }
   }

   pub fn possible_moves(&self) -> &[Coord] {
      match &self.selection {
         Selection::SquareSelected { targets, .. } => targets.as_slice(),
         _ => &[],
      }
   }

   pub fn context(&self) -> MoveContext {
      if self.is_player_turn() {
         MoveContext::Legal
      } else {
         MoveContext::Premove
      }
   }

   pub fn is_player_turn(&self) -> bool {
      self.snapshot.as_ref().map(|s| s.turn == self.player).unwrap_or(false)
   }

   pub fn is_promotion_pending(&self) -> bool {
      matches!(self.selection, Selection::PromotionPending { .. })
   }

   pub fn promotion_selector(&self) -> PromotionSelector {
      PromotionSelector::new(self.is_promotion_pending(), self.player)
   }

   fn game_over(&self) -> bool {
      self.snapshot.as_ref().map(|s| s.status.is_terminal()).unwrap_or(true)
   }

   /// Replaces the authoritative state. A changed board or turn drops the selection, a changed
   /// board also drops the premove (executing it changes the board too).
   pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) {
      let (board_changed, turn_changed) = match &self.snapshot {
         Some(previous) => (previous.squares != snapshot.squares, previous.turn != snapshot.turn),
         None => (true, true),
      };
      if board_changed || turn_changed || snapshot.status.is_terminal() {
         if self.selection != Selection::Idle {
            trace!("snapshot changed the position, dropping selection");
         }
         self.selection = Selection::Idle;
      }
      if board_changed || snapshot.status.is_terminal() {
         self.premove = None;
      }
      self.snapshot = Some(snapshot);
   }

   pub fn select_square(&mut self, coord: Coord) -> Option<ClientMessage> {
      if self.game_over() {
         return None;
      }
      match std::mem::replace(&mut self.selection, Selection::Idle) {
         Selection::Idle => {
            self.try_select(coord);
            None
         }
         Selection::SquareSelected { origin, targets, context } => {
            if targets.contains(&coord) {
               if self.is_promotion(origin, coord) {
                  trace!("{}{} needs a promotion choice", origin, coord);
                  self.selection = Selection::PromotionPending {
                     from: origin,
                     to: coord,
                     context,
                  };
                  None
               } else {
                  Some(self.emit_move(origin, coord, None, context))
               }
            } else if self.try_select(coord) {
               None
            } else if self.premove.take().is_some() {
               Some(ClientMessage::ResetPremove)
            } else {
               None
            }
         }
         pending @ Selection::PromotionPending { .. } => {
            // the selector is modal; the board waits for a choice
            self.selection = pending;
            None
         }
      }
   }

   pub fn select_promotion(&mut self, kind: PieceKind) -> Option<ClientMessage> {
      if self.game_over() || !kind.is_promotion_target() {
         return None;
      }
      match self.selection {
         Selection::PromotionPending { from, to, context } => {
            self.selection = Selection::Idle;
            Some(self.emit_move(from, to, Some(kind), context))
         }
         _ => None,
      }
   }

   pub fn cancel_promotion(&mut self) {
      if self.is_promotion_pending() {
         self.selection = Selection::Idle;
      }
   }

   /// A drag is a click on `origin` followed by a click on the drop cell.
   pub fn drag(&mut self, origin: Coord, dx: f32, dy: f32, geometry: BoardGeometry) -> Option<ClientMessage> {
      if self.game_over() || self.is_promotion_pending() || !self.owns(origin) {
         return None;
      }
      if self.active_square() != Some(origin) {
         // picking up a piece never completes the previous selection
         self.selection = Selection::Idle;
         self.try_select(origin);
      }
      let screen_origin = input::to_screen(origin, self.player);
      let drop = input::drag_destination(geometry, screen_origin, dx, dy)?;
      let destination = input::to_absolute(drop, self.player);
      if destination == origin {
         return None;
      }
      self.select_square(destination)
   }

   pub fn resign(&self) -> Option<ClientMessage> {
      self.in_progress().then(|| ClientMessage::Resign)
   }

   pub fn request_draw(&self) -> Option<ClientMessage> {
      self.in_progress().then(|| ClientMessage::RequestDraw)
   }

   fn in_progress(&self) -> bool {
      self.snapshot.as_ref().map(|s| s.status == GameStatus::InProgress).unwrap_or(false)
   }

   fn try_select(&mut self, coord: Coord) -> bool {
      let snapshot = match &self.snapshot {
         Some(s) => s,
         None => return false,
      };
      if !self.owns(coord) {
         return false;
      }
      let targets: Targets = snapshot.targets_from(coord).collect();
      trace!("selected {} with {} targets", coord, targets.len());
      self.selection = Selection::SquareSelected {
         origin: coord,
         targets,
         context: self.context(),
      };
      true
   }

   fn owns(&self, coord: Coord) -> bool {
      self
         .snapshot
         .as_ref()
         .and_then(|s| s.squares.piece(coord))
         .map(|p| p.color == self.player)
         .unwrap_or(false)
   }

   fn is_promotion(&self, from: Coord, to: Coord) -> bool {
      self
         .snapshot
         .as_ref()
         .and_then(|s| s.squares.piece(from))
         .map(|p| p.kind == PieceKind::Pawn && to.row == p.color.last_rank())
         .unwrap_or(false)
   }

   fn emit_move(&mut self, from: Coord, to: Coord, promotion: Option<PieceKind>, context: MoveContext) -> ClientMessage {
      if context == MoveContext::Premove {
         self.premove = Some(Premove { from, to, promotion });
      }
      trace!("sending {}{} ({:?})", from, to, context);
      ClientMessage::Move { from, to, promotion }
   }
}
