use thiserror::Error;

use crate::board::{Color, PieceKind};

#[derive(Debug, Error)]
pub enum Error {
   #[error("malformed frame: {0}")]
   MalformedFrame(#[from] serde_json::Error),
   #[error("malformed board: {0}")]
   MalformedBoard(String),
   #[error("no {color} piece starts on loadout slot {slot}")]
   EmptySlot { color: Color, slot: String },
   #[error("modifier {modifier} is not in the catalog")]
   UnknownModifier { modifier: String },
   #[error("modifier {modifier} applies to {expected}, not {actual}")]
   InapplicableModifier {
      modifier: String,
      expected: PieceKind,
      actual: PieceKind,
   },
   #[error("modifier {modifier} is already assigned to {slot}")]
   DuplicateModifier { modifier: String, slot: String },
}
