use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;

/// Single-line text input with a cursor.
///
/// The cursor is a byte offset that always sits on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  /// Input prefilled with `value`, cursor at the end
  pub fn with_value(value: impl Into<String>) -> Self {
    let buffer = value.into();
    let cursor = buffer.len();
    Self { buffer, cursor }
  }

  /// Get the current input value
  pub fn value(&self) -> &str {
    &self.buffer
  }

  fn prev_boundary(&self) -> usize {
    self.buffer[..self.cursor]
      .char_indices()
      .next_back()
      .map(|(i, _)| i)
      .unwrap_or(0)
  }

  fn next_boundary(&self) -> usize {
    self.buffer[self.cursor..]
      .chars()
      .next()
      .map(|c| self.cursor + c.len_utf8())
      .unwrap_or(self.cursor)
  }

  /// Handle an editing key. Enter, Esc and Tab are left to the parent.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Backspace => {
        if self.cursor > 0 {
          let start = self.prev_boundary();
          self.buffer.replace_range(start..self.cursor, "");
          self.cursor = start;
        }
      }
      KeyCode::Delete => {
        let end = self.next_boundary();
        self.buffer.replace_range(self.cursor..end, "");
      }
      KeyCode::Left => self.cursor = self.prev_boundary(),
      KeyCode::Right => self.cursor = self.next_boundary(),
      KeyCode::Home => self.cursor = 0,
      KeyCode::End => self.cursor = self.buffer.len(),
      KeyCode::Char('a') if ctrl => self.cursor = 0,
      KeyCode::Char('e') if ctrl => self.cursor = self.buffer.len(),
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        self.buffer.replace_range(..self.cursor, "");
        self.cursor = 0;
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let before = &self.buffer[..self.cursor];
        let start = before.trim_end().rfind(' ').map(|i| i + 1).unwrap_or(0);
        self.buffer.replace_range(start..self.cursor, "");
        self.cursor = start;
      }
      KeyCode::Char(_) if ctrl => return KeyResult::NotHandled,
      KeyCode::Char(c) => {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
      }
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  /// Spans for the value, with the cursor drawn as a reversed cell when focused
  pub fn spans(&self, focused: bool) -> Vec<Span<'_>> {
    if !focused {
      return vec![Span::raw(self.buffer.as_str())];
    }

    let (before, rest) = self.buffer.split_at(self.cursor);
    let mut chars = rest.chars();
    let under = chars.next().map(String::from).unwrap_or_else(|| " ".to_string());
    let after = chars.as_str();

    vec![
      Span::raw(before),
      Span::styled(under, Style::default().add_modifier(Modifier::REVERSED)),
      Span::raw(after),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn typed(text: &str) -> TextInput {
    let mut input = TextInput::default();
    for c in text.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
    input
  }

  #[test]
  fn test_basic_input() {
    let input = typed("hi");
    assert_eq!(input.value(), "hi");
  }

  #[test]
  fn test_enter_and_esc_are_not_consumed() {
    let mut input = typed("x");
    assert_eq!(input.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
    assert_eq!(input.handle_key(key(KeyCode::Esc)), KeyResult::NotHandled);
    assert_eq!(input.value(), "x");
  }

  #[test]
  fn test_backspace() {
    let mut input = typed("abc");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_cursor_movement() {
    let mut input = typed("ac");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Char('b')));
    assert_eq!(input.value(), "abc");
  }

  #[test]
  fn test_multibyte_editing() {
    let mut input = typed("Zoë");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "Zo");

    let mut input = TextInput::with_value("café bar");
    for _ in 0..4 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Delete));
    assert_eq!(input.value(), "caf bar");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = typed("hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = typed("Berlin Mitte");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "Berlin ");
  }
}
