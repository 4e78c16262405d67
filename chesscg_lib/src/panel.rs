use crate::board::Color;
use crate::messages::{EndReason, GameSnapshot, GameStatus, PlayerSlot, Winner};

/// Clock shown for both sides while waiting for the first move.
pub const PREGAME_CLOCK: f64 = 20.0;

/// `MM:SS.s`, or `H:MM:SS.s` once there is an hour on the clock.
pub fn format_clock(seconds: f64) -> String {
   let total = seconds.max(0.0);
   let hours = (total / 3600.0).floor() as u64;
   let minutes = ((total % 3600.0) / 60.0).floor() as u64;
   let secs = total % 60.0;
   if hours > 0 {
      format!("{}:{:02}:{:04.1}", hours, minutes, secs)
   } else {
      format!("{:02}:{:04.1}", minutes, secs)
   }
}

pub fn clock_seconds(snapshot: &GameSnapshot, color: Color) -> f64 {
   if snapshot.status == GameStatus::NotStarted {
      PREGAME_CLOCK
   } else {
      *snapshot.time.get(color)
   }
}

pub fn timer_active(snapshot: &GameSnapshot, color: Color) -> bool {
   match snapshot.status {
      GameStatus::NotStarted | GameStatus::InProgress => snapshot.turn == color,
      GameStatus::Complete | GameStatus::Aborted => false,
   }
}

pub fn display_name(name: &str) -> &str {
   if name.starts_with("Guest_") {
      "Guest"
   } else {
      name
   }
}

/// Name plus rating, falling back to `fallback` for empty slots.
pub fn player_label(slot: Option<&PlayerSlot>, fallback: &str) -> String {
   let name = slot
      .and_then(|s| s.name.as_deref())
      .filter(|n| !n.is_empty())
      .map(display_name)
      .unwrap_or(fallback);
   match slot.and_then(|s| s.elo) {
      Some(elo) => format!("{} ({})", name, elo),
      None => name.to_string(),
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOffer {
   None,
   /// We asked, the opponent hasn't answered.
   Offered,
   /// The opponent asked; requesting a draw now accepts.
   Incoming,
}

pub fn draw_offer(snapshot: &GameSnapshot, player: Color) -> DrawOffer {
   let ours = *snapshot.draw_requests.get(player);
   let theirs = *snapshot.draw_requests.get(!player);
   if ours {
      DrawOffer::Offered
   } else if theirs {
      DrawOffer::Incoming
   } else {
      DrawOffer::None
   }
}

pub fn game_end_message(winner: Option<Winner>, end_reason: Option<EndReason>) -> String {
   let (winner, reason) = match (winner, end_reason) {
      (Some(w), Some(r)) => (w, r),
      _ => return "Game Over.".to_string(),
   };
   let side = winner.color().map(Color::name);
   match (reason, side) {
      (EndReason::Checkmate, Some(side)) => format!("{} wins by checkmate.", capitalize(side)),
      (EndReason::Time, Some(side)) => format!("{} wins on time.", capitalize(side)),
      (EndReason::Resignation, Some(side)) => format!("{} wins by resignation.", capitalize(side)),
      (EndReason::Stalemate, _) => "Stalemate.".to_string(),
      (EndReason::DrawAgreement, _) => "Draw.".to_string(),
      (EndReason::Aborted, _) => "Game aborted.".to_string(),
      (EndReason::ThreefoldRepetition, _) => "Draw by threefold repetition.".to_string(),
      (_, Some(side)) => format!("{} wins.", capitalize(side)),
      (_, None) if winner == Winner::Draw => "Game drawn.".to_string(),
      (_, None) => "Game Over.".to_string(),
   }
}

fn capitalize(s: &str) -> String {
   let mut chars = s.chars();
   match chars.next() {
      Some(first) => first.to_uppercase().chain(chars).collect(),
      None => String::new(),
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::controller::tests::snapshot;

   #[test]
   fn clocks() {
      assert_eq!(format_clock(0.0), "00:00.0");
      assert_eq!(format_clock(179.5), "02:59.5");
      assert_eq!(format_clock(9.0), "00:09.0");
      assert_eq!(format_clock(3723.4), "1:02:03.4");
      assert_eq!(format_clock(-5.0), "00:00.0");
      assert_eq!(format_clock(f64::NAN), "00:00.0");
   }

   #[test]
   fn timers_follow_turn_until_the_end() {
      let mut s = snapshot(Color::Black, GameStatus::NotStarted, &[], &[]);
      s.time.white = 60.0;
      assert!(timer_active(&s, Color::Black));
      assert!(!timer_active(&s, Color::White));
      assert_eq!(clock_seconds(&s, Color::White), PREGAME_CLOCK);
      s.status = GameStatus::InProgress;
      assert!(timer_active(&s, Color::Black));
      assert_eq!(clock_seconds(&s, Color::White), 60.0);
      s.status = GameStatus::Complete;
      assert!(!timer_active(&s, Color::Black));
   }

   #[test]
   fn player_labels() {
      assert_eq!(display_name("Guest_4821"), "Guest");
      assert_eq!(display_name("magnus"), "magnus");
      let slot = PlayerSlot {
         name: Some("Guest_1".into()),
         elo: Some(1200),
         ..PlayerSlot::default()
      };
      assert_eq!(player_label(Some(&slot), "Opponent"), "Guest (1200)");
      assert_eq!(player_label(None, "You"), "You");
      assert_eq!(player_label(Some(&PlayerSlot::default()), "Opponent"), "Opponent");
   }

   #[test]
   fn draw_offers() {
      let mut s = snapshot(Color::White, GameStatus::InProgress, &[], &[]);
      assert_eq!(draw_offer(&s, Color::White), DrawOffer::None);
      s.draw_requests.black = true;
      assert_eq!(draw_offer(&s, Color::White), DrawOffer::Incoming);
      assert_eq!(draw_offer(&s, Color::Black), DrawOffer::Offered);
      s.draw_requests.white = true;
      assert_eq!(draw_offer(&s, Color::White), DrawOffer::Offered);
   }

   #[test]
   fn end_messages() {
      use EndReason::*;
      assert_eq!(game_end_message(Some(Winner::White), Some(Checkmate)), "White wins by checkmate.");
      assert_eq!(game_end_message(Some(Winner::White), Some(Time)), "White wins on time.");
      assert_eq!(game_end_message(Some(Winner::Black), Some(Resignation)), "Black wins by resignation.");
      assert_eq!(game_end_message(Some(Winner::Draw), Some(Stalemate)), "Stalemate.");
      assert_eq!(game_end_message(Some(Winner::Draw), Some(DrawAgreement)), "Draw.");
      assert_eq!(game_end_message(Some(Winner::Aborted), Some(Aborted)), "Game aborted.");
      assert_eq!(
         game_end_message(Some(Winner::Draw), Some(ThreefoldRepetition)),
         "Draw by threefold repetition."
      );
      assert_eq!(game_end_message(Some(Winner::Draw), Some(Other)), "Game drawn.");
      assert_eq!(game_end_message(Some(Winner::Black), Some(Other)), "Black wins.");
      assert_eq!(game_end_message(Some(Winner::Aborted), Some(Other)), "Game Over.");
      assert_eq!(game_end_message(None, Some(Checkmate)), "Game Over.");
   }
}
