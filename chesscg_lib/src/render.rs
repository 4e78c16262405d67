use crate::board::{Color, Coord, Piece, PieceKind, BOARD_SIZE};
use crate::controller::{MoveContext, MoveController};
use crate::input::{to_absolute, ScreenCoord};
use std::fmt::Write;

pub fn glyph(kind: PieceKind, color: Color) -> char {
   match (color, kind) {
      (Color::White, PieceKind::Pawn) => '♙',
      (Color::White, PieceKind::Knight) => '♘',
      (Color::White, PieceKind::Bishop) => '♗',
      (Color::White, PieceKind::Rook) => '♖',
      (Color::White, PieceKind::Queen) => '♕',
      (Color::White, PieceKind::King) => '♔',
      (Color::Black, PieceKind::Pawn) => '♟',
      (Color::Black, PieceKind::Knight) => '♞',
      (Color::Black, PieceKind::Bishop) => '♝',
      (Color::Black, PieceKind::Rook) => '♜',
      (Color::Black, PieceKind::Queen) => '♛',
      (Color::Black, PieceKind::King) => '♚',
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveHint {
   /// Destination is empty; drawn as a dot.
   Quiet(MoveContext),
   /// Destination holds a piece; drawn as a ring.
   Capture(MoveContext),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileView {
   pub coord: Coord,
   pub light: bool,
   pub piece: Option<Piece>,
   pub active: bool,
   pub hint: Option<MoveHint>,
   pub check: bool,
   pub last_move: bool,
   pub premove: bool,
}

impl TileView {
   pub fn symbol(&self) -> char {
      match &self.piece {
         Some(p) => glyph(p.kind, p.color),
         None if self.light => '·',
         None => ' ',
      }
   }

   fn marker(&self) -> (char, char) {
      if self.active {
         ('[', ']')
      } else if self.check {
         ('!', '!')
      } else if self.premove {
         ('{', '}')
      } else {
         match self.hint {
            Some(MoveHint::Capture(MoveContext::Legal)) => ('(', ')'),
            Some(MoveHint::Capture(MoveContext::Premove)) => ('<', '>'),
            Some(MoveHint::Quiet(MoveContext::Legal)) => ('*', ' '),
            Some(MoveHint::Quiet(MoveContext::Premove)) => ('+', ' '),
            None if self.last_move => ('\'', '\''),
            None => (' ', ' '),
         }
      }
   }
}

/// Everything needed to draw the cell at `coord`.
pub fn tile_view(controller: &MoveController, coord: Coord) -> TileView {
   let snapshot = controller.snapshot();
   let piece = snapshot.and_then(|s| s.squares.piece(coord)).cloned();
   let hint = if controller.possible_moves().contains(&coord) {
      let context = controller.context();
      Some(if piece.is_some() {
         MoveHint::Capture(context)
      } else {
         MoveHint::Quiet(context)
      })
   } else {
      None
   };
   let check = match (&piece, snapshot) {
      (Some(p), Some(s)) => p.kind == PieceKind::King && *s.kings_in_check.get(p.color),
      _ => false,
   };
   let last_move = snapshot
      .and_then(|s| s.last_move)
      .map(|m| m.from == coord || m.to == coord)
      .unwrap_or(false);
   let premove = controller
      .premove()
      .map(|p| p.from == coord || p.to == coord)
      .unwrap_or(false);
   TileView {
      coord,
      light: coord.is_light(),
      piece,
      active: controller.active_square() == Some(coord),
      hint,
      check,
      last_move,
      premove,
   }
}

/// Tiles in display order: row 0 is the top of the screen from the local player's side.
pub fn board_view(controller: &MoveController) -> Vec<Vec<TileView>> {
   let perspective = controller.player();
   (0..BOARD_SIZE)
      .map(|row| {
         (0..BOARD_SIZE)
            .map(|col| tile_view(controller, to_absolute(ScreenCoord { row, col }, perspective)))
            .collect()
      })
      .collect()
}

/// Plain-text board with file/rank labels around the tiles.
pub fn render_board(view: &[Vec<TileView>]) -> String {
   let mut out = String::new();
   let files: String = match view.first() {
      Some(row) => row.iter().map(|t| format!(" {} ", (b'a' + t.coord.col) as char)).collect(),
      None => return out,
   };
   let _ = writeln!(out, "  {}", files);
   for row in view {
      let rank = row.first().map(|t| BOARD_SIZE - t.coord.row).unwrap_or(0);
      let _ = write!(out, "{} ", rank);
      for tile in row {
         let (left, right) = tile.marker();
         let _ = write!(out, "{}{}{}", left, tile.symbol(), right);
      }
      let _ = writeln!(out, " {}", rank);
   }
   let _ = writeln!(out, "  {}", files);
   out
}
