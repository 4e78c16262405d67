use crate::board::{Color, PieceKind};
use crate::render::glyph;

pub const PROMOTION_CHOICES: [PieceKind; 4] = [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

/// Modal piece picker shown while a promotion is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromotionSelector {
   visible: bool,
   color: Color,
}

impl PromotionSelector {
   pub fn new(visible: bool, color: Color) -> PromotionSelector {
      PromotionSelector { visible, color }
   }

   pub fn is_visible(&self) -> bool {
      self.visible
   }

   pub fn choices(&self) -> &'static [PieceKind] {
      if self.visible {
         &PROMOTION_CHOICES
      } else {
         &[]
      }
   }

   pub fn select(&self, kind: PieceKind) -> Option<PieceKind> {
      if self.visible && PROMOTION_CHOICES.contains(&kind) {
         Some(kind)
      } else {
         None
      }
   }

   pub fn render(&self) -> String {
      self
         .choices()
         .iter()
         .enumerate()
         .map(|(i, kind)| format!("[{}] {} {}", i + 1, glyph(*kind, self.color), kind))
         .collect::<Vec<_>>()
         .join("  ")
   }
}
