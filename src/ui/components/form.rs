use super::{KeyResult, TextInput};
use crate::validation::FieldErrors;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a form that the parent view handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  Submitted,
  Cancelled,
}

#[derive(Debug, Clone)]
struct FormField {
  name: &'static str,
  label: &'static str,
  input: TextInput,
}

/// Modal multi-field text form with inline per-field errors.
///
/// Tab/Down and BackTab/Up move between fields, Enter on the last field (or
/// Ctrl-S anywhere) submits, Esc cancels.
#[derive(Debug, Clone)]
pub struct Form {
  title: String,
  fields: Vec<FormField>,
  focus: usize,
  errors: FieldErrors,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      fields: Vec::new(),
      focus: 0,
      errors: FieldErrors::default(),
    }
  }

  pub fn field(mut self, name: &'static str, label: &'static str, value: &str) -> Self {
    self.fields.push(FormField {
      name,
      label,
      input: TextInput::with_value(value),
    });
    self
  }

  /// Current text of field `name`
  pub fn value(&self, name: &str) -> String {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.input.value().to_string())
      .unwrap_or_default()
  }

  pub fn set_errors(&mut self, errors: FieldErrors) {
    // Jump to the first field that failed
    if let Some(idx) = self
      .fields
      .iter()
      .position(|f| errors.get(f.name).is_some())
    {
      self.focus = idx;
    }
    self.errors = errors;
  }

  pub fn errors(&self) -> &FieldErrors {
    &self.errors
  }

  fn move_focus(&mut self, forward: bool) {
    let len = self.fields.len();
    if len == 0 {
      return;
    }
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Esc => KeyResult::Event(FormEvent::Cancelled),
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        KeyResult::Event(FormEvent::Submitted)
      }
      KeyCode::Enter if self.focus + 1 >= self.fields.len() => KeyResult::Event(FormEvent::Submitted),
      KeyCode::Enter | KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        KeyResult::Handled
      }
      _ => match self.fields.get_mut(self.focus) {
        Some(field) => {
          field.input.handle_key(key);
          KeyResult::Handled
        }
        None => KeyResult::NotHandled,
      },
    }
  }

  /// Render the form as a centered overlay
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::Cyan)
      };

      let mut spans = vec![Span::styled(format!("{:>12}: ", field.label), label_style)];
      spans.extend(field.input.spans(focused));
      lines.push(Line::from(spans));

      if let Some(error) = self.errors.get(field.name) {
        lines.push(Line::from(Span::styled(
          format!("{:>14}{}", "", error),
          Style::default().fg(Color::Red),
        )));
      }
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
      " Tab next  Enter/Ctrl-S save  Esc cancel",
      Style::default().fg(Color::DarkGray),
    )));

    let width = area.width.saturating_sub(4).clamp(20, 72);
    let height = (lines.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::validation::AttendeeForm;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn attendee_form() -> Form {
    Form::new("Add Attendee")
      .field("name", "Name", "")
      .field("email", "Email", "")
  }

  fn type_text(form: &mut Form, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_fill_and_submit() {
    let mut form = attendee_form();
    type_text(&mut form, "Jo");
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    type_text(&mut form, "jo@x.com");

    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
    assert_eq!(form.value("name"), "Jo");
    assert_eq!(form.value("email"), "jo@x.com");
  }

  #[test]
  fn test_focus_wraps() {
    let mut form = attendee_form();
    form.handle_key(key(KeyCode::BackTab));
    type_text(&mut form, "x@y.z");
    assert_eq!(form.value("email"), "x@y.z");
    assert_eq!(form.value("name"), "");
  }

  #[test]
  fn test_errors_move_focus_to_first_invalid_field() {
    let mut form = attendee_form();
    type_text(&mut form, "Jo");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "nope");

    let raw = AttendeeForm {
      name: form.value("name"),
      email: form.value("email"),
    };
    form.set_errors(raw.validate().unwrap_err());
    assert_eq!(form.errors().get("email"), Some("Invalid email address"));

    form.handle_key(key(KeyCode::Backspace));
    assert_eq!(form.value("email"), "nop");
  }

  #[test]
  fn test_cancel() {
    let mut form = attendee_form();
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }
}
