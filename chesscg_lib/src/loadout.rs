//! Modifier loadouts: which catalog modifiers a player puts on each starting piece.
//!
//! Slots address the two-row preview board rather than the game board. Row 0 holds the pawns
//! and row 1 the back rank, for either color.

use crate::board::{back_rank_piece, Color, PerColor, PieceKind, PieceModifier, BOARD_SIZE};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A catalog entry as served by the modifiers endpoint. `uses == 0` means unlimited.
pub type ModifierInfo = PieceModifier;

impl ModifierInfo {
   pub fn applies_to(&self, kind: PieceKind) -> bool {
      self.applicable_piece.map(|k| k == kind).unwrap_or(true)
   }

   pub fn is_unlimited(&self) -> bool {
      self.uses == 0
   }
}

#[derive(Deserialize)]
pub struct ModifierCatalog {
   pub modifiers: Vec<ModifierInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadoutSlot {
   row: u8,
   col: u8,
}

impl LoadoutSlot {
   pub fn new(row: u8, col: u8) -> Option<LoadoutSlot> {
      if row < 2 && col < BOARD_SIZE {
         Some(LoadoutSlot { row, col })
      } else {
         None
      }
   }

   pub fn checked(color: Color, row: u8, col: u8) -> Result<LoadoutSlot, Error> {
      LoadoutSlot::new(row, col).ok_or_else(|| Error::EmptySlot {
         color,
         slot: format!("{},{}", row, col),
      })
   }

   pub fn piece_kind(self) -> PieceKind {
      if self.row == 0 {
         PieceKind::Pawn
      } else {
         back_rank_piece(self.col).unwrap_or(PieceKind::Pawn)
      }
   }
}

impl fmt::Display for LoadoutSlot {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{},{}", self.row, self.col)
   }
}

impl FromStr for LoadoutSlot {
   type Err = String;

   fn from_str(s: &str) -> Result<LoadoutSlot, String> {
      let (row, col) = s.split_once(',').ok_or_else(|| format!("Expected row,col, got {}", s))?;
      let row = row.trim().parse::<u8>().map_err(|e| e.to_string())?;
      let col = col.trim().parse::<u8>().map_err(|e| e.to_string())?;
      LoadoutSlot::new(row, col).ok_or_else(|| format!("No loadout slot at {}", s))
   }
}

/// Slot key (`"row,col"`) to assigned modifier types.
pub type SlotModifiers = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
   #[serde(default)]
   pub white: SlotModifiers,
   #[serde(default)]
   pub black: SlotModifiers,
}

impl Loadout {
   fn side(&self, color: Color) -> &SlotModifiers {
      match color {
         Color::White => &self.white,
         Color::Black => &self.black,
      }
   }

   fn side_mut(&mut self, color: Color) -> &mut SlotModifiers {
      match color {
         Color::White => &mut self.white,
         Color::Black => &mut self.black,
      }
   }

   pub fn modifiers(&self, color: Color, slot: LoadoutSlot) -> &[String] {
      self.side(color).get(&slot.to_string()).map(|v| v.as_slice()).unwrap_or(&[])
   }

   /// Non-empty slots in board order. Keys that don't name a slot are skipped.
   pub fn entries(&self, color: Color) -> Vec<(LoadoutSlot, &[String])> {
      let mut entries: Vec<_> = self
         .side(color)
         .iter()
         .filter(|(_, mods)| !mods.is_empty())
         .filter_map(|(key, mods)| key.parse::<LoadoutSlot>().ok().map(|slot| (slot, mods.as_slice())))
         .collect();
      entries.sort_by_key(|(slot, _)| *slot);
      entries
   }

   pub fn assign(&mut self, catalog: &[ModifierInfo], color: Color, slot: LoadoutSlot, modifier: &str) -> Result<(), Error> {
      let info = catalog
         .iter()
         .find(|m| m.kind == modifier)
         .ok_or_else(|| Error::UnknownModifier {
            modifier: modifier.to_string(),
         })?;
      let piece = slot.piece_kind();
      if let Some(expected) = info.applicable_piece.filter(|k| *k != piece) {
         return Err(Error::InapplicableModifier {
            modifier: modifier.to_string(),
            expected,
            actual: piece,
         });
      }
      let assigned = self.side_mut(color).entry(slot.to_string()).or_default();
      if assigned.iter().any(|m| m == modifier) {
         return Err(Error::DuplicateModifier {
            modifier: modifier.to_string(),
            slot: slot.to_string(),
         });
      }
      assigned.push(modifier.to_string());
      Ok(())
   }

   pub fn remove(&mut self, color: Color, slot: LoadoutSlot, modifier: &str) -> bool {
      let side = self.side_mut(color);
      let key = slot.to_string();
      let removed = match side.get_mut(&key) {
         Some(assigned) => {
            let before = assigned.len();
            assigned.retain(|m| m != modifier);
            assigned.len() != before
         }
         None => false,
      };
      if side.get(&key).map(|v| v.is_empty()).unwrap_or(false) {
         side.remove(&key);
      }
      removed
   }

   /// Total catalog score of a side. Modifiers missing from the catalog count as zero.
   pub fn score(&self, catalog: &[ModifierInfo], color: Color) -> i32 {
      self
         .side(color)
         .values()
         .flatten()
         .filter_map(|name| catalog.iter().find(|m| &m.kind == name))
         .map(|m| m.score)
         .sum()
   }

   pub fn scores(&self, catalog: &[ModifierInfo]) -> PerColor<i32> {
      PerColor {
         white: self.score(catalog, Color::White),
         black: self.score(catalog, Color::Black),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn catalog() -> Vec<ModifierInfo> {
      serde_json::from_str::<ModifierCatalog>(
         r#"{"modifiers": [
            {"type": "Knook", "score": 4, "applicable_piece": "rook", "description": "Knight and rook", "uses": 0},
            {"type": "Reverse", "score": 1, "applicable_piece": "pawn", "description": "Moves backwards", "uses": 3},
            {"type": "Lucky", "score": 2, "applicable_piece": null, "description": "Any piece", "uses": 0}
         ]}"#,
      )
      .unwrap()
      .modifiers
   }

   #[test]
   fn slots_map_to_starting_pieces() {
      assert_eq!(LoadoutSlot::new(0, 5).unwrap().piece_kind(), PieceKind::Pawn);
      assert_eq!(LoadoutSlot::new(1, 0).unwrap().piece_kind(), PieceKind::Rook);
      assert_eq!(LoadoutSlot::new(1, 3).unwrap().piece_kind(), PieceKind::Queen);
      assert_eq!(LoadoutSlot::new(1, 4).unwrap().piece_kind(), PieceKind::King);
      assert_eq!(LoadoutSlot::new(2, 0), None);
      assert_eq!("1,6".parse::<LoadoutSlot>(), Ok(LoadoutSlot::new(1, 6).unwrap()));
      assert!("1;6".parse::<LoadoutSlot>().is_err());
      assert!("3,0".parse::<LoadoutSlot>().is_err());
      assert!(matches!(LoadoutSlot::checked(Color::Black, 1, 8), Err(Error::EmptySlot { .. })));
   }

   #[test]
   fn assign_checks_piece_and_duplicates() {
      let catalog = catalog();
      let mut loadout = Loadout::default();
      let rook = LoadoutSlot::new(1, 7).unwrap();
      let pawn = LoadoutSlot::new(0, 2).unwrap();

      loadout.assign(&catalog, Color::White, rook, "Knook").unwrap();
      loadout.assign(&catalog, Color::White, rook, "Lucky").unwrap();
      assert!(matches!(
         loadout.assign(&catalog, Color::White, rook, "Knook"),
         Err(Error::DuplicateModifier { .. })
      ));
      assert!(matches!(
         loadout.assign(&catalog, Color::White, pawn, "Knook"),
         Err(Error::InapplicableModifier {
            expected: PieceKind::Rook,
            actual: PieceKind::Pawn,
            ..
         })
      ));
      assert!(matches!(
         loadout.assign(&catalog, Color::White, pawn, "Teleport"),
         Err(Error::UnknownModifier { .. })
      ));
      loadout.assign(&catalog, Color::Black, pawn, "Reverse").unwrap();

      assert_eq!(loadout.modifiers(Color::White, rook), &["Knook".to_string(), "Lucky".to_string()]);
      assert!(loadout.modifiers(Color::White, pawn).is_empty());
      assert_eq!(loadout.scores(&catalog), PerColor { white: 6, black: 1 });
   }

   #[test]
   fn remove_reports_change() {
      let catalog = catalog();
      let mut loadout = Loadout::default();
      let slot = LoadoutSlot::new(0, 0).unwrap();
      loadout.assign(&catalog, Color::Black, slot, "Reverse").unwrap();
      assert!(!loadout.remove(Color::White, slot, "Reverse"));
      assert!(loadout.remove(Color::Black, slot, "Reverse"));
      assert!(!loadout.remove(Color::Black, slot, "Reverse"));
      assert!(loadout.black.is_empty());
   }

   #[test]
   fn wire_shape() {
      let loadout: Loadout = serde_json::from_str(r#"{"white": {"1,0": ["Knook"], "bogus": ["Lucky"]}}"#).unwrap();
      assert!(loadout.black.is_empty());
      let entries = loadout.entries(Color::White);
      assert_eq!(entries.len(), 1);
      assert_eq!(entries[0].0, LoadoutSlot::new(1, 0).unwrap());
      assert_eq!(
         serde_json::to_string(&loadout).unwrap(),
         r#"{"white":{"1,0":["Knook"],"bogus":["Lucky"]},"black":{}}"#
      );
   }
}
