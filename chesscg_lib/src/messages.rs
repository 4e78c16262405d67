use crate::board::{Board, Color, Coord, PerColor, Piece, PieceKind};
use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Server to Client

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
   #[serde(rename = "not started")]
   NotStarted,
   #[serde(rename = "in progress")]
   InProgress,
   #[serde(rename = "complete")]
   Complete,
   #[serde(rename = "aborted")]
   Aborted,
}

impl GameStatus {
   pub fn is_terminal(self) -> bool {
      matches!(self, GameStatus::Complete | GameStatus::Aborted)
   }
}

impl fmt::Display for GameStatus {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      let s = match self {
         GameStatus::NotStarted => "not started",
         GameStatus::InProgress => "in progress",
         GameStatus::Complete => "complete",
         GameStatus::Aborted => "aborted",
      };
      write!(f, "{}", s)
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
   White,
   Black,
   Draw,
   Aborted,
}

impl Winner {
   pub fn color(self) -> Option<Color> {
      match self {
         Winner::White => Some(Color::White),
         Winner::Black => Some(Color::Black),
         Winner::Draw | Winner::Aborted => None,
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
   Checkmate,
   Time,
   Resignation,
   Stalemate,
   DrawAgreement,
   Aborted,
   ThreefoldRepetition,
   #[serde(other)]
   Other,
}

/// One `{from, to}` pair from the server's move list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCandidate {
   pub from: Coord,
   pub to: Coord,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerSlot {
   #[serde(default, deserialize_with = "string_or_number")]
   pub id: Option<String>,
   #[serde(default)]
   pub name: Option<String>,
   #[serde(default)]
   pub connected: bool,
   #[serde(default)]
   pub elo: Option<u32>,
}

/// A complete authoritative game state push.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GameSnapshot {
   #[serde(default, deserialize_with = "string_or_number")]
   pub id: Option<String>,
   #[serde(default, deserialize_with = "string_or_number")]
   pub player_id: Option<String>,
   pub squares: Board,
   pub turn: Color,
   pub status: GameStatus,
   #[serde(default)]
   pub kings_in_check: PerColor<bool>,
   #[serde(default)]
   pub time: PerColor<f64>,
   #[serde(default)]
   pub moves: Vec<MoveCandidate>,
   #[serde(default)]
   pub draw_requests: PerColor<bool>,
   #[serde(default)]
   pub opponent_connected: bool,
   #[serde(default)]
   pub players: Option<PerColor<PlayerSlot>>,
   #[serde(default)]
   pub winner: Option<Winner>,
   #[serde(default)]
   pub end_reason: Option<EndReason>,
   #[serde(default)]
   pub last_move: Option<MoveCandidate>,
   #[serde(default)]
   pub captured_pieces: PerColor<Vec<Piece>>,
}

impl GameSnapshot {
   /// Resolves which side this client plays by matching `player_id` against the player slots.
   pub fn local_color(&self) -> Option<Color> {
      let player_id = self.player_id.as_ref()?;
      let players = self.players.as_ref()?;
      [Color::White, Color::Black]
         .iter()
         .copied()
         .find(|color| players.get(*color).id.as_ref() == Some(player_id))
   }

   pub fn targets_from(&self, origin: Coord) -> impl Iterator<Item = Coord> + '_ {
      self.moves.iter().filter(move |m| m.from == origin).map(|m| m.to)
   }
}

pub fn decode_snapshot(frame: &str) -> Result<GameSnapshot, Error> {
   Ok(serde_json::from_str(frame)?)
}

// Ids show up as JSON numbers on older servers and strings on newer ones
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
   #[derive(Deserialize)]
   #[serde(untagged)]
   enum Id {
      Str(String),
      Num(i64),
   }
   Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
      Id::Str(s) => s,
      Id::Num(n) => n.to_string(),
   }))
}

// Client to Server

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
   Move {
      from: Coord,
      to: Coord,
      #[serde(skip_serializing_if = "Option::is_none")]
      promotion: Option<PieceKind>,
   },
   ResetPremove,
   Resign,
   RequestDraw,
}

impl ClientMessage {
   pub fn encode(&self) -> String {
      // Only plain enums, integers and strings; serialization can't fail
      serde_json::to_string(self).unwrap_or_default()
   }
}
