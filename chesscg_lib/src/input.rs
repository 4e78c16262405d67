//! Screen/board coordinate mapping and pointer adapters.
//!
//! The board is drawn from the local player's side, so black sees it rotated. Everything
//! outside this module speaks absolute coordinates.

use crate::board::{Color, Coord, BOARD_SIZE};

/// A cell as drawn, row 0 at the top of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenCoord {
   pub row: u8,
   pub col: u8,
}

impl ScreenCoord {
   pub fn new(row: u8, col: u8) -> Option<ScreenCoord> {
      if row < BOARD_SIZE && col < BOARD_SIZE {
         Some(ScreenCoord { row, col })
      } else {
         None
      }
   }
}

fn flip(v: u8, perspective: Color) -> u8 {
   match perspective {
      Color::White => v,
      Color::Black => BOARD_SIZE - 1 - v,
   }
}

pub fn to_screen(coord: Coord, perspective: Color) -> ScreenCoord {
   ScreenCoord {
      row: flip(coord.row, perspective),
      col: flip(coord.col, perspective),
   }
}

pub fn to_absolute(screen: ScreenCoord, perspective: Color) -> Coord {
   Coord {
      row: flip(screen.row, perspective),
      col: flip(screen.col, perspective),
   }
}

/// Rendered pixel size of the whole board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardGeometry {
   pub width: f32,
   pub height: f32,
}

impl BoardGeometry {
   pub fn new(width: f32, height: f32) -> BoardGeometry {
      BoardGeometry { width, height }
   }

   pub fn cell_width(&self) -> f32 {
      self.width / f32::from(BOARD_SIZE)
   }

   pub fn cell_height(&self) -> f32 {
      self.height / f32::from(BOARD_SIZE)
   }
}

fn offset(base: u8, cells: f32) -> Option<u8> {
   // range check in float space, the cast would saturate first
   let target = f32::from(base) + cells;
   if target.is_finite() && target >= 0.0 && target < f32::from(BOARD_SIZE) {
      Some(target as u8)
   } else {
      None
   }
}

/// The cell under a pixel position, if it is on the board.
pub fn cell_at(geometry: BoardGeometry, x: f32, y: f32) -> Option<ScreenCoord> {
   if geometry.width <= 0.0 || geometry.height <= 0.0 || x < 0.0 || y < 0.0 {
      return None;
   }
   let col = offset(0, (x / geometry.cell_width()).floor())?;
   let row = offset(0, (y / geometry.cell_height()).floor())?;
   Some(ScreenCoord { row, col })
}

/// The cell a drag starting on `origin` lands on after moving the pointer by `(dx, dy)` pixels.
pub fn drag_destination(geometry: BoardGeometry, origin: ScreenCoord, dx: f32, dy: f32) -> Option<ScreenCoord> {
   if geometry.width <= 0.0 || geometry.height <= 0.0 {
      return None;
   }
   let col = offset(origin.col, (dx / geometry.cell_width()).floor())?;
   let row = offset(origin.row, (dy / geometry.cell_height()).floor())?;
   Some(ScreenCoord { row, col })
}

#[cfg(test)]
mod tests {
   use crate::input::*;

   #[test]
   fn black_sees_the_board_rotated() {
      let corner = Coord::new(0, 0).unwrap();
      assert_eq!(to_screen(corner, Color::Black), ScreenCoord { row: 7, col: 7 });
      assert_eq!(to_absolute(ScreenCoord { row: 7, col: 7 }, Color::Black), corner);
      assert_eq!(to_screen(corner, Color::White), ScreenCoord { row: 0, col: 0 });
      for coord in Coord::all() {
         for color in [Color::White, Color::Black] {
            assert_eq!(to_absolute(to_screen(coord, color), color), coord);
         }
      }
   }

   #[test]
   fn pixels_to_cells() {
      let geometry = BoardGeometry::new(640.0, 480.0);
      assert_eq!(cell_at(geometry, 0.0, 0.0), Some(ScreenCoord { row: 0, col: 0 }));
      assert_eq!(cell_at(geometry, 639.9, 479.9), Some(ScreenCoord { row: 7, col: 7 }));
      assert_eq!(cell_at(geometry, 81.0, 59.0), Some(ScreenCoord { row: 0, col: 1 }));
      assert_eq!(cell_at(geometry, 640.0, 10.0), None);
      assert_eq!(cell_at(geometry, -1.0, 10.0), None);
   }

   #[test]
   fn drag_displacement_floors() {
      let geometry = BoardGeometry::new(800.0, 800.0);
      let origin = ScreenCoord { row: 6, col: 4 };
      assert_eq!(drag_destination(geometry, origin, 99.0, 0.0), Some(origin));
      assert_eq!(drag_destination(geometry, origin, 100.0, -200.0), Some(ScreenCoord { row: 4, col: 5 }));
      // floor, not truncation: a tiny leftward nudge is already the previous cell
      assert_eq!(drag_destination(geometry, origin, -1.0, 0.0), Some(ScreenCoord { row: 6, col: 3 }));
      assert_eq!(drag_destination(geometry, origin, 0.0, 200.0), None);
      assert_eq!(drag_destination(geometry, origin, f32::NAN, 0.0), None);
      assert_eq!(drag_destination(BoardGeometry::new(0.0, 0.0), origin, 1.0, 1.0), None);
      assert_eq!(drag_destination(geometry, origin, 1.0e12, 0.0), None);
      assert_eq!(drag_destination(geometry, origin, 0.0, -1.0e30), None);
      assert_eq!(drag_destination(geometry, origin, f32::INFINITY, 0.0), None);
      assert_eq!(cell_at(geometry, 1.0e20, 0.0), None);
   }
}
