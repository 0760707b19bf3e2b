use super::KeyResult;
use crate::api::types::BookingStatus;
use crate::ui::renderfns::booking_status_color;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by status picker that parent needs to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPickerEvent {
  Selected(BookingStatus),
  Cancelled,
}

/// Overlay for choosing an attendee's booking status
#[derive(Debug, Clone, Default)]
pub struct StatusPicker {
  active: bool,
  selected: usize,
  title: String,
}

impl StatusPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with `current` preselected
  pub fn show(&mut self, title: String, current: BookingStatus) {
    self.active = true;
    self.selected = BookingStatus::ALL
      .iter()
      .position(|s| *s == current)
      .unwrap_or(0);
    self.title = title;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<StatusPickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let len = BookingStatus::ALL.len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(StatusPickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let status = BookingStatus::ALL[self.selected];
        self.hide();
        KeyResult::Event(StatusPickerEvent::Selected(status))
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % len;
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = (self.selected + len - 1) % len;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the status picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (self.title.len() as u16 + 6).clamp(20, area.width.max(20)).min(area.width);
    let height = (BookingStatus::ALL.len() as u16 + 2).min(area.height);

    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let items: Vec<ListItem> = BookingStatus::ALL
      .iter()
      .map(|status| {
        ListItem::new(Line::from(Span::styled(
          status.label(),
          Style::default().fg(booking_status_color(*status)),
        )))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
      .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
