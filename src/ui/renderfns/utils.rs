use crate::api::types::BookingStatus;
use ratatui::prelude::Color;

/// Truncate a string to a maximum length in chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Badge color for a booking status
pub fn booking_status_color(status: BookingStatus) -> Color {
  match status {
    BookingStatus::Approved => Color::Green,
    BookingStatus::Pending => Color::Yellow,
    BookingStatus::Rejected => Color::Red,
    BookingStatus::Cancelled => Color::DarkGray,
  }
}

/// Color for an `attendees/capacity` cell
pub fn capacity_color(attendees: usize, capacity: u32) -> Color {
  if attendees >= capacity as usize {
    Color::Red
  } else if attendees * 10 >= capacity as usize * 8 {
    Color::Yellow
  } else {
    Color::White
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Café Müller Abend", 8), "Café ...");
  }

  #[test]
  fn test_booking_status_color() {
    assert_eq!(booking_status_color(BookingStatus::Approved), Color::Green);
    assert_eq!(booking_status_color(BookingStatus::Rejected), Color::Red);
    assert_eq!(booking_status_color(BookingStatus::Pending), Color::Yellow);
  }

  #[test]
  fn test_capacity_color() {
    assert_eq!(capacity_color(2, 20), Color::White);
    assert_eq!(capacity_color(16, 20), Color::Yellow);
    assert_eq!(capacity_color(20, 20), Color::Red);
  }
}
