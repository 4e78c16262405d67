use crate::api::{ApiClient, GameInfo};
use crate::config::Config;
use crate::transport::{self, ConnectionStatus, SharedStatus, TransportSettings};
use anyhow::Result;
use chesscg_lib::board::{Color, Coord, PieceKind};
use chesscg_lib::controller::MoveController;
use chesscg_lib::input::{cell_at, to_absolute, BoardGeometry, ScreenCoord};
use chesscg_lib::messages::{ClientMessage, GameSnapshot};
use chesscg_lib::panel::{self, DrawOffer};
use chesscg_lib::render::{board_view, render_board};
use fxhash::FxHashSet;
use log::{info, trace, warn};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
   Square(Coord),
   Tap(ScreenCoord),
   Drag { x: f32, y: f32, dx: f32, dy: f32 },
   Promote(PieceKind),
   Cancel,
   Draw,
   Resign,
   Board,
   Status,
   Quit,
}

fn arg<T: FromStr>(args: &[&str], i: usize, what: &str) -> Result<T, String> {
   let raw = args.get(i).ok_or_else(|| format!("Missing {}", what))?;
   raw.parse::<T>().map_err(|_| format!("Bad {}: {}", what, raw))
}

impl FromStr for Command {
   type Err = String;

   fn from_str(s: &str) -> Result<Command, String> {
      let args: Vec<&str> = s.split_whitespace().collect();
      let first = match args.first() {
         Some(first) => first.to_ascii_lowercase(),
         None => return Err("Empty command".to_string()),
      };
      let expected = match first.as_str() {
         "tap" => 3,
         "drag" => 5,
         "promote" => 2,
         _ => 1,
      };
      if args.len() != expected {
         return Err(format!("Expected {} arguments to {}, got {}", expected - 1, first, args.len() - 1));
      }
      match first.as_str() {
         "tap" => {
            let row: u8 = arg(&args, 1, "row")?;
            let col: u8 = arg(&args, 2, "col")?;
            ScreenCoord::new(row, col)
               .map(Command::Tap)
               .ok_or_else(|| format!("No cell at {} {}", row, col))
         }
         "drag" => Ok(Command::Drag {
            x: arg(&args, 1, "x")?,
            y: arg(&args, 2, "y")?,
            dx: arg(&args, 3, "dx")?,
            dy: arg(&args, 4, "dy")?,
         }),
         "promote" => Ok(Command::Promote(arg(&args, 1, "piece")?)),
         "cancel" => Ok(Command::Cancel),
         "draw" => Ok(Command::Draw),
         "resign" => Ok(Command::Resign),
         "board" => Ok(Command::Board),
         "status" => Ok(Command::Status),
         "quit" | "exit" => Ok(Command::Quit),
         square => square
            .parse::<Coord>()
            .map(Command::Square)
            .map_err(|_| format!("Unknown command {}", s.trim())),
      }
   }
}

pub enum Event {
   Command(Command),
   BadInput(String),
   Snapshot(GameSnapshot),
   Status(ConnectionStatus),
   GameInfo(GameInfo),
}

/// What the driver should do after one event.
#[derive(Debug, Default)]
pub struct Step {
   pub output: Vec<String>,
   pub outbound: Option<ClientMessage>,
   pub fetch_info: Option<String>,
   pub quit: bool,
}

impl Step {
   fn say(mut self, line: impl Into<String>) -> Step {
      self.output.push(line.into());
      self
   }
}

pub struct Session {
   controller: MoveController,
   fixed_color: bool,
   geometry: BoardGeometry,
   info: Option<GameInfo>,
   requested_rooms: FxHashSet<String>,
   status: SharedStatus,
}

impl Session {
   pub fn new(color: Option<Color>, board_px: f32, status: SharedStatus) -> Session {
      Session {
         controller: MoveController::new(color.unwrap_or(Color::White)),
         fixed_color: color.is_some(),
         geometry: BoardGeometry::new(board_px, board_px),
         info: None,
         requested_rooms: FxHashSet::default(),
         status,
      }
   }

   pub fn controller(&self) -> &MoveController {
      &self.controller
   }

   pub fn apply(&mut self, event: Event) -> Step {
      match event {
         Event::Command(command) => self.command(command),
         Event::BadInput(e) => Step::default().say(e),
         Event::Snapshot(snapshot) => self.snapshot(snapshot),
         Event::Status(status) => Step::default().say(format!("[{}]", status)),
         Event::GameInfo(info) => {
            let room = self.controller.snapshot().and_then(|s| s.id.as_deref());
            if room.map_or(true, |room| room == info.room_id) {
               self.info = Some(info);
            } else {
               trace!("Dropping players of room {}", info.room_id);
            }
            Step::default()
         }
      }
   }

   fn snapshot(&mut self, snapshot: GameSnapshot) -> Step {
      let mut step = Step::default();
      if !self.fixed_color {
         if let Some(color) = snapshot.local_color().filter(|c| *c != self.controller.player()) {
            info!("Playing as {}", color);
            self.controller = MoveController::new(color);
         }
      }
      if let (Some(info), Some(room)) = (&self.info, &snapshot.id) {
         if info.room_id != *room {
            info!("Now in room {}", room);
            self.info = None;
         }
      }
      if let Some(room) = snapshot.id.as_ref().filter(|room| self.info.is_none() && !self.requested_rooms.contains(*room)) {
         self.requested_rooms.insert(room.clone());
         step.fetch_info = Some(room.clone());
      }
      let redraw = match self.controller.snapshot() {
         Some(previous) => {
            previous.squares != snapshot.squares
               || previous.turn != snapshot.turn
               || previous.status != snapshot.status
               || previous.draw_requests != snapshot.draw_requests
         }
         None => true,
      };
      self.controller.apply_snapshot(snapshot);
      if redraw {
         step.output.push(self.panel());
      }
      step
   }

   fn command(&mut self, command: Command) -> Step {
      trace!("{:?}", command);
      let mut step = Step::default();
      let sent = match command {
         Command::Square(coord) => self.controller.select_square(coord),
         Command::Tap(screen) => self.controller.select_square(to_absolute(screen, self.controller.player())),
         Command::Drag { x, y, dx, dy } => match cell_at(self.geometry, x, y) {
            Some(screen) => {
               let origin = to_absolute(screen, self.controller.player());
               self.controller.drag(origin, dx, dy, self.geometry)
            }
            None => return step.say(format!("{} {} is off the board", x, y)),
         },
         Command::Promote(kind) => {
            let selector = self.controller.promotion_selector();
            match selector.select(kind) {
               Some(kind) => self.controller.select_promotion(kind),
               None if selector.is_visible() => return step.say(format!("Can't promote to {}", kind)),
               None => return step.say("No promotion pending"),
            }
         }
         Command::Cancel => {
            self.controller.cancel_promotion();
            None
         }
         Command::Draw => self.controller.request_draw(),
         Command::Resign => self.controller.resign(),
         Command::Board => return step.say(self.panel()),
         Command::Status => return step.say(self.status_line()),
         Command::Quit => {
            return Step {
               quit: true,
               ..Step::default()
            }
         }
      };
      if let Some(message) = &sent {
         step.output.push(describe(message));
      }
      step.outbound = sent;
      step.output.push(render_board(&board_view(&self.controller)));
      let selector = self.controller.promotion_selector();
      if selector.is_visible() {
         step.output.push(format!("Promote to: {}", selector.render()));
      }
      step
   }

   fn status_line(&self) -> String {
      let turn = match self.controller.snapshot() {
         Some(s) if self.controller.is_player_turn() => format!("your move ({})", s.status),
         Some(s) => format!("waiting ({})", s.status),
         None => "waiting for the server".to_string(),
      };
      format!("{} as {}, {}", self.status.get(), self.controller.player(), turn)
   }

   fn clock_line(&self, snapshot: &GameSnapshot, color: Color, fallback: &str) -> String {
      let slot = self
         .info
         .as_ref()
         .map(|i| i.players.get(color))
         .or_else(|| snapshot.players.as_ref().map(|p| p.get(color)));
      let active = if panel::timer_active(snapshot, color) { '>' } else { ' ' };
      format!(
         "{} {}  {}",
         active,
         panel::format_clock(panel::clock_seconds(snapshot, color)),
         panel::player_label(slot, fallback)
      )
   }

   fn panel(&self) -> String {
      let board = render_board(&board_view(&self.controller));
      let snapshot = match self.controller.snapshot() {
         Some(s) => s,
         None => return board,
      };
      let me = self.controller.player();
      let mut lines = vec![self.clock_line(snapshot, !me, "Opponent"), board, self.clock_line(snapshot, me, "You")];
      match panel::draw_offer(snapshot, me) {
         DrawOffer::Offered => lines.push("Draw offered (waiting for opponent)".to_string()),
         DrawOffer::Incoming => lines.push("Opponent offers a draw, type `draw` to accept".to_string()),
         DrawOffer::None => (),
      }
      if snapshot.status.is_terminal() {
         lines.push(panel::game_end_message(snapshot.winner, snapshot.end_reason));
      }
      let selector = self.controller.promotion_selector();
      if selector.is_visible() {
         lines.push(format!("Promote to: {}", selector.render()));
      }
      lines.join("\n")
   }
}

fn describe(message: &ClientMessage) -> String {
   match message {
      ClientMessage::Move {
         from,
         to,
         promotion: Some(kind),
      } => format!("-> {}{}={}", from, to, kind),
      ClientMessage::Move { from, to, .. } => format!("-> {}{}", from, to),
      ClientMessage::ResetPremove => "-> premove cleared".to_string(),
      ClientMessage::Resign => "-> resigned".to_string(),
      ClientMessage::RequestDraw => "-> draw requested".to_string(),
   }
}

async fn read_commands(events: mpsc::Sender<Event>) {
   let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
   loop {
      let event = match lines.next_line().await {
         Ok(Some(line)) if line.trim().is_empty() => continue,
         Ok(Some(line)) => match line.parse::<Command>() {
            Ok(command) => Event::Command(command),
            Err(e) => Event::BadInput(e),
         },
         Ok(None) => Event::Command(Command::Quit),
         Err(e) => {
            warn!("Encountered I/O error reading commands: {}", e);
            Event::Command(Command::Quit)
         }
      };
      let quit = matches!(event, Event::Command(Command::Quit));
      if events.send(event).await.is_err() || quit {
         break;
      }
   }
}

fn spawn_info_fetch(api: Arc<ApiClient>, room: String, events: mpsc::Sender<Event>) {
   tokio::spawn(async move {
      match api.game_info(&room).await {
         Ok(info) => {
            let _ = events.send(Event::GameInfo(info)).await;
         }
         Err(e) => warn!("Couldn't load players for room {}: {:#}", room, e),
      }
   });
}

pub struct PlayOptions {
   pub room: Option<String>,
   pub color: Option<Color>,
   pub board_px: f32,
}

pub async fn run(config: Config, api: Arc<ApiClient>, opts: PlayOptions) -> Result<()> {
   let (event_tx, mut event_rx) = mpsc::channel(64);
   let (out_tx, out_rx) = mpsc::channel(16);
   let status = SharedStatus::new();

   let settings = TransportSettings {
      websocket_url: config.websocket_url.clone(),
      reconnect: config.reconnect.clone(),
   };
   let transport = tokio::spawn(transport::run(api.clone(), settings, event_tx.clone(), out_rx, status.clone()));
   tokio::spawn(read_commands(event_tx.clone()));

   let mut session = Session::new(opts.color, opts.board_px, status);
   if let Some(room) = opts.room {
      session.requested_rooms.insert(room.clone());
      spawn_info_fetch(api.clone(), room, event_tx.clone());
   }

   while let Some(event) = event_rx.recv().await {
      let step = session.apply(event);
      for line in &step.output {
         println!("{}", line);
      }
      if let Some(message) = step.outbound {
         if out_tx.send(message).await.is_err() {
            warn!("Transport has stopped, message not sent");
         }
      }
      if let Some(room) = step.fetch_info {
         spawn_info_fetch(api.clone(), room, event_tx.clone());
      }
      if step.quit {
         break;
      }
   }

   // closing the outbound channel tells the transport to close the socket
   drop(out_tx);
   if tokio::time::timeout(Duration::from_secs(2), transport).await.is_err() {
      warn!("Transport didn't shut down in time");
   }
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;
   use chesscg_lib::board::{Board, PerColor, Piece};
   use chesscg_lib::messages::{decode_snapshot, GameStatus, MoveCandidate, PlayerSlot};

   fn c(s: &str) -> Coord {
      s.parse().unwrap()
   }

   fn game(turn: Color, pieces: &[(&str, PieceKind, Color)], moves: &[(&str, &str)]) -> GameSnapshot {
      let mut board = Board::empty();
      for (square, kind, color) in pieces {
         board.set(c(square), Some(Piece::new(*kind, *color)));
      }
      let mut snapshot = decode_snapshot(
         &serde_json::json!({
            "id": "room-1",
            "player_id": 7,
            "squares": Vec::<Vec<Option<Piece>>>::from(board),
            "turn": turn,
            "status": "in progress",
            "players": {"white": {"id": 7, "name": "me"}, "black": {"id": 8, "name": "Guest_2", "elo": 900}},
         })
         .to_string(),
      )
      .unwrap();
      snapshot.moves = moves.iter().map(|(f, t)| MoveCandidate { from: c(f), to: c(t) }).collect();
      snapshot
   }

   #[test]
   fn parses_commands() {
      assert_eq!("e2".parse::<Command>(), Ok(Command::Square(c("e2"))));
      assert_eq!("tap 6 4".parse::<Command>(), Ok(Command::Tap(ScreenCoord { row: 6, col: 4 })));
      assert_eq!(
         "drag 10 20 -80 0.5".parse::<Command>(),
         Ok(Command::Drag {
            x: 10.0,
            y: 20.0,
            dx: -80.0,
            dy: 0.5
         })
      );
      assert_eq!("promote q".parse::<Command>(), Ok(Command::Promote(PieceKind::Queen)));
      assert_eq!("PROMOTE knight".parse::<Command>(), Ok(Command::Promote(PieceKind::Knight)));
      assert_eq!("  resign ".parse::<Command>(), Ok(Command::Resign));
      assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
      assert!("tap 8 0".parse::<Command>().is_err());
      assert!("tap 1".parse::<Command>().is_err());
      assert!("drag a b c d".parse::<Command>().is_err());
      assert!("castle".parse::<Command>().is_err());
      assert!("".parse::<Command>().is_err());
   }

   #[test]
   fn clicks_become_outbound_moves() {
      let mut session = Session::new(None, 640.0, SharedStatus::new());
      let step = session.apply(Event::Snapshot(game(
         Color::White,
         &[("e2", PieceKind::Pawn, Color::White), ("e8", PieceKind::King, Color::Black)],
         &[("e2", "e4")],
      )));
      assert_eq!(step.fetch_info.as_deref(), Some("room-1"));
      assert_eq!(step.output.len(), 1);
      assert!(step.output[0].contains("Guest (900)"));

      let step = session.apply(Event::Command(Command::Square(c("e2"))));
      assert!(step.outbound.is_none());
      let step = session.apply(Event::Command(Command::Square(c("e4"))));
      assert_eq!(
         step.outbound,
         Some(ClientMessage::Move {
            from: c("e2"),
            to: c("e4"),
            promotion: None
         })
      );
      assert_eq!(step.output[0], "-> e2e4");

      // same room again doesn't refetch players
      let step = session.apply(Event::Snapshot(game(Color::Black, &[], &[])));
      assert!(step.fetch_info.is_none());
   }

   #[test]
   fn color_follows_player_id_unless_fixed() {
      let mut snapshot = game(Color::White, &[("e7", PieceKind::Pawn, Color::Black)], &[]);
      snapshot.player_id = Some("8".to_string());

      let mut session = Session::new(None, 640.0, SharedStatus::new());
      session.apply(Event::Snapshot(snapshot.clone()));
      assert_eq!(session.controller().player(), Color::Black);
      // black's screen cell (6, 3) is e7
      session.apply(Event::Command(Command::Tap(ScreenCoord { row: 6, col: 3 })));
      assert_eq!(session.controller().active_square(), Some(c("e7")));

      let mut fixed = Session::new(Some(Color::White), 640.0, SharedStatus::new());
      fixed.apply(Event::Snapshot(snapshot));
      assert_eq!(fixed.controller().player(), Color::White);
   }

   #[test]
   fn drag_and_promotion_commands() {
      let mut session = Session::new(Some(Color::White), 800.0, SharedStatus::new());
      session.apply(Event::Snapshot(game(
         Color::White,
         &[("d7", PieceKind::Pawn, Color::White)],
         &[("d7", "d8")],
      )));
      // d7 is screen (1, 3); drag one cell up
      let step = session.apply(Event::Command(Command::Drag {
         x: 350.0,
         y: 150.0,
         dx: 0.0,
         dy: -100.0,
      }));
      assert!(step.outbound.is_none());
      assert!(step.output.iter().any(|l| l.starts_with("Promote to:")));

      let step = session.apply(Event::Command(Command::Promote(PieceKind::King)));
      assert_eq!(step.output, vec!["Can't promote to king".to_string()]);
      let step = session.apply(Event::Command(Command::Promote(PieceKind::Rook)));
      assert_eq!(
         step.outbound,
         Some(ClientMessage::Move {
            from: c("d7"),
            to: c("d8"),
            promotion: Some(PieceKind::Rook)
         })
      );
      let step = session.apply(Event::Command(Command::Promote(PieceKind::Rook)));
      assert_eq!(step.output, vec!["No promotion pending".to_string()]);

      let step = session.apply(Event::Command(Command::Drag {
         x: 900.0,
         y: 0.0,
         dx: 0.0,
         dy: 0.0,
      }));
      assert_eq!(step.output, vec!["900 0 is off the board".to_string()]);
   }

   #[test]
   fn player_names_follow_the_current_room() {
      let players = |name: &str| PerColor {
         white: PlayerSlot {
            name: Some(name.to_string()),
            ..PlayerSlot::default()
         },
         black: PlayerSlot::default(),
      };
      let mut session = Session::new(Some(Color::White), 640.0, SharedStatus::new());
      session.apply(Event::Snapshot(game(Color::White, &[], &[])));

      session.apply(Event::GameInfo(GameInfo {
         room_id: "room-0".to_string(),
         players: players("stale"),
      }));
      assert!(!session.apply(Event::Command(Command::Board)).output[0].contains("stale"));

      session.apply(Event::GameInfo(GameInfo {
         room_id: "room-1".to_string(),
         players: players("fresh"),
      }));
      assert!(session.apply(Event::Command(Command::Board)).output[0].contains("fresh"));

      // a new room after a reconnect drops the old names and asks again
      let mut moved = game(Color::Black, &[], &[]);
      moved.id = Some("room-2".to_string());
      let step = session.apply(Event::Snapshot(moved));
      assert_eq!(step.fetch_info.as_deref(), Some("room-2"));
      assert!(!step.output[0].contains("fresh"));
   }

   #[test]
   fn finished_game_shows_result_and_blocks_resign() {
      let mut session = Session::new(Some(Color::White), 640.0, SharedStatus::new());
      let mut snapshot = game(Color::White, &[], &[]);
      snapshot.status = GameStatus::Complete;
      snapshot.winner = Some(chesscg_lib::messages::Winner::Black);
      snapshot.end_reason = Some(chesscg_lib::messages::EndReason::Checkmate);
      let step = session.apply(Event::Snapshot(snapshot));
      assert!(step.output[0].ends_with("Black wins by checkmate."));
      assert!(session.apply(Event::Command(Command::Resign)).outbound.is_none());
      assert!(session.apply(Event::Command(Command::Quit)).quit);
   }
}
