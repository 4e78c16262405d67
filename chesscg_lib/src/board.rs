use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub const BOARD_SIZE: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
   White,
   Black,
}

impl Color {
   /// Row a pawn of this color promotes on. White starts at row 7 and walks toward row 0.
   pub fn last_rank(self) -> u8 {
      match self {
         Color::White => 0,
         Color::Black => BOARD_SIZE - 1,
      }
   }

   pub fn name(self) -> &'static str {
      match self {
         Color::White => "white",
         Color::Black => "black",
      }
   }
}

impl std::ops::Not for Color {
   type Output = Color;
   fn not(self) -> Color {
      match self {
         Color::Black => Color::White,
         Color::White => Color::Black,
      }
   }
}

impl fmt::Display for Color {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{}", self.name())
   }
}

impl FromStr for Color {
   type Err = String;

   fn from_str(s: &str) -> Result<Color, String> {
      match s {
         "white" | "w" => Ok(Color::White),
         "black" | "b" => Ok(Color::Black),
         _ => Err(format!("Expected white or black, got {}", s)),
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
   Pawn,
   Rook,
   Knight,
   Bishop,
   Queen,
   King,
}

impl PieceKind {
   pub fn name(self) -> &'static str {
      match self {
         PieceKind::Pawn => "pawn",
         PieceKind::Rook => "rook",
         PieceKind::Knight => "knight",
         PieceKind::Bishop => "bishop",
         PieceKind::Queen => "queen",
         PieceKind::King => "king",
      }
   }

   pub fn is_promotion_target(self) -> bool {
      matches!(
         self,
         PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
      )
   }
}

impl fmt::Display for PieceKind {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "{}", self.name())
   }
}

impl FromStr for PieceKind {
   type Err = String;

   fn from_str(s: &str) -> Result<PieceKind, String> {
      match s {
         "p" | "pawn" => Ok(PieceKind::Pawn),
         "r" | "rook" => Ok(PieceKind::Rook),
         "n" | "knight" => Ok(PieceKind::Knight),
         "b" | "bishop" => Ok(PieceKind::Bishop),
         "q" | "queen" => Ok(PieceKind::Queen),
         "k" | "king" => Ok(PieceKind::King),
         _ => Err(format!("Expected a piece name or one of ASCII prnbqk, got {}", s)),
      }
   }
}

/// An absolute board coordinate. Row 0 is black's home rank, row 7 is white's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
   pub row: u8,
   pub col: u8,
}

impl Coord {
   pub fn new(row: u8, col: u8) -> Option<Coord> {
      if row < BOARD_SIZE && col < BOARD_SIZE {
         Some(Coord { row, col })
      } else {
         None
      }
   }

   pub fn is_light(self) -> bool {
      (self.row + self.col) % 2 == 0
   }

   pub fn all() -> impl Iterator<Item = Coord> {
      (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
   }
}

impl fmt::Display for Coord {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      let file = match self.col {
         0 => "a",
         1 => "b",
         2 => "c",
         3 => "d",
         4 => "e",
         5 => "f",
         6 => "g",
         7 => "h",
         _ => "?",
      };
      write!(f, "{}{}", file, BOARD_SIZE - self.row)
   }
}

impl FromStr for Coord {
   type Err = String;

   fn from_str(algebraic: &str) -> Result<Coord, String> {
      if algebraic.len() != 2 {
         return Err(format!("{} not a valid algebraic location; expected 2 bytes", algebraic));
      }
      let col: u8 = match algebraic.as_bytes()[0] {
         b'a' => 0,
         b'b' => 1,
         b'c' => 2,
         b'd' => 3,
         b'e' => 4,
         b'f' => 5,
         b'g' => 6,
         b'h' => 7,
         file => return Err(format!("{} is not a valid algebraic file, expected a..=h", file as char)),
      };
      let row = match algebraic.as_bytes()[1] {
         b'1' => 7,
         b'2' => 6,
         b'3' => 5,
         b'4' => 4,
         b'5' => 3,
         b'6' => 2,
         b'7' => 1,
         b'8' => 0,
         rank => return Err(format!("{} is not a valid algebraic rank, expected 1..=8", rank as char)),
      };
      Ok(Coord { row, col })
   }
}

// Outbound messages always carry [row, col]
impl Serialize for Coord {
   fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let mut tup = serializer.serialize_tuple(2)?;
      tup.serialize_element(&self.row)?;
      tup.serialize_element(&self.col)?;
      tup.end()
   }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireCoord {
   Pair(u8, u8),
   Object { row: u8, col: u8 },
}

impl<'de> Deserialize<'de> for Coord {
   fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Coord, D::Error> {
      let (row, col) = match WireCoord::deserialize(deserializer)? {
         WireCoord::Pair(row, col) => (row, col),
         WireCoord::Object { row, col } => (row, col),
      };
      Coord::new(row, col).ok_or_else(|| de::Error::custom(format!("square ({}, {}) is off the board", row, col)))
   }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceModifier {
   #[serde(rename = "type", alias = "modifier_type")]
   pub kind: String,
   #[serde(default)]
   pub score: i32,
   #[serde(default)]
   pub applicable_piece: Option<PieceKind>,
   #[serde(default)]
   pub description: String,
   #[serde(default)]
   pub uses: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
   #[serde(rename = "type")]
   pub kind: PieceKind,
   pub color: Color,
   #[serde(default)]
   pub modifiers: Vec<PieceModifier>,
}

impl Piece {
   pub fn new(kind: PieceKind, color: Color) -> Piece {
      Piece {
         kind,
         color,
         modifiers: Vec::new(),
      }
   }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerColor<T> {
   pub white: T,
   pub black: T,
}

impl<T> PerColor<T> {
   pub fn get(&self, color: Color) -> &T {
      match color {
         Color::White => &self.white,
         Color::Black => &self.black,
      }
   }
}

type Squares = [[Option<Piece>; BOARD_SIZE as usize]; BOARD_SIZE as usize];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Option<Piece>>>", into = "Vec<Vec<Option<Piece>>>")]
pub struct Board {
   squares: Squares,
}

impl Board {
   pub fn empty() -> Board {
      Board::default()
   }

   pub fn piece(&self, coord: Coord) -> Option<&Piece> {
      self.squares[coord.row as usize][coord.col as usize].as_ref()
   }

   pub fn set(&mut self, coord: Coord, piece: Option<Piece>) {
      self.squares[coord.row as usize][coord.col as usize] = piece;
   }
}

impl TryFrom<Vec<Vec<Option<Piece>>>> for Board {
   type Error = Error;

   fn try_from(rows: Vec<Vec<Option<Piece>>>) -> Result<Board, Error> {
      if rows.len() != BOARD_SIZE as usize {
         return Err(Error::MalformedBoard(format!("expected 8 rows, got {}", rows.len())));
      }
      let mut board = Board::empty();
      for (row_index, row) in rows.into_iter().enumerate() {
         if row.len() != BOARD_SIZE as usize {
            return Err(Error::MalformedBoard(format!(
               "expected 8 squares in row {}, got {}",
               row_index,
               row.len()
            )));
         }
         for (col_index, square) in row.into_iter().enumerate() {
            board.squares[row_index][col_index] = square;
         }
      }
      Ok(board)
   }
}

impl From<Board> for Vec<Vec<Option<Piece>>> {
   fn from(board: Board) -> Vec<Vec<Option<Piece>>> {
      board.squares.iter().map(|row| row.to_vec()).collect()
   }
}

const BACK_RANK: [PieceKind; 8] = [
   PieceKind::Rook,
   PieceKind::Knight,
   PieceKind::Bishop,
   PieceKind::Queen,
   PieceKind::King,
   PieceKind::Bishop,
   PieceKind::Knight,
   PieceKind::Rook,
];

/// Piece kind that starts on `col` of the back rank.
pub fn back_rank_piece(col: u8) -> Option<PieceKind> {
   BACK_RANK.get(col as usize).copied()
}

#[cfg(test)]
mod tests {
   use crate::board::*;

   #[test]
   fn algebraic_to_coord_conversions() {
      assert_eq!("a8".parse::<Coord>(), Ok(Coord { row: 0, col: 0 }));
      assert_eq!("e4".parse::<Coord>(), Ok(Coord { row: 4, col: 4 }));
      assert_eq!("e2".parse::<Coord>(), Ok(Coord { row: 6, col: 4 }));
      assert_eq!("h1".parse::<Coord>(), Ok(Coord { row: 7, col: 7 }));
      assert!("i1".parse::<Coord>().is_err());
      assert!("a9".parse::<Coord>().is_err());
      assert!("a10".parse::<Coord>().is_err());
   }

   #[test]
   fn coords_to_algebraic() {
      for coord in Coord::all() {
         assert_eq!(coord.to_string().parse::<Coord>(), Ok(coord));
      }
      assert_eq!(Coord { row: 6, col: 4 }.to_string(), "e2");
   }

   #[test]
   fn coord_bounds() {
      assert_eq!(Coord::new(7, 7), Some(Coord { row: 7, col: 7 }));
      assert_eq!(Coord::new(8, 0), None);
      assert_eq!(Coord::new(0, 8), None);
   }

   #[test]
   fn coord_wire_shapes() {
      let coord = Coord { row: 6, col: 4 };
      assert_eq!(serde_json::to_string(&coord).unwrap(), "[6,4]");
      assert_eq!(serde_json::from_str::<Coord>("[6,4]").unwrap(), coord);
      assert_eq!(serde_json::from_str::<Coord>(r#"{"row":6,"col":4}"#).unwrap(), coord);
      assert!(serde_json::from_str::<Coord>("[9,4]").is_err());
   }

   #[test]
   fn last_rank_per_color() {
      assert_eq!(Color::White.last_rank(), 0);
      assert_eq!(Color::Black.last_rank(), 7);
      assert_eq!(!Color::White, Color::Black);
   }

   #[test]
   fn piece_kind_parsing() {
      assert_eq!("q".parse::<PieceKind>(), Ok(PieceKind::Queen));
      assert_eq!("knight".parse::<PieceKind>(), Ok(PieceKind::Knight));
      assert!("x".parse::<PieceKind>().is_err());
      assert!(PieceKind::Rook.is_promotion_target());
      assert!(!PieceKind::King.is_promotion_target());
      assert!(!PieceKind::Pawn.is_promotion_target());
   }

   #[test]
   fn board_rejects_wrong_shape() {
      let rows: Vec<Vec<Option<Piece>>> = vec![vec![None; 8]; 7];
      assert!(Board::try_from(rows).is_err());
      let mut rows: Vec<Vec<Option<Piece>>> = vec![vec![None; 8]; 8];
      rows[3].pop();
      assert!(Board::try_from(rows).is_err());
   }

   #[test]
   fn back_rank_layout() {
      assert_eq!(back_rank_piece(0), Some(PieceKind::Rook));
      assert_eq!(back_rank_piece(3), Some(PieceKind::Queen));
      assert_eq!(back_rank_piece(4), Some(PieceKind::King));
      assert_eq!(back_rank_piece(6), Some(PieceKind::Knight));
      assert_eq!(back_rank_piece(8), None);
   }
}
