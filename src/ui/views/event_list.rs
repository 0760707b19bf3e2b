use crate::admin::Action;
use crate::api::types::Event;
use crate::cache::QueryKey;
use crate::event::Notice;
use crate::ui::components::{ConfirmDialog, ConfirmEvent, Form, FormEvent, KeyResult};
use crate::ui::context::Context;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{capacity_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::AttendeeListView;
use crate::validation::EventForm;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone)]
enum FormMode {
  Create,
  Edit(String),
}

/// Root view: all events (or the public listing) with create/edit/delete
pub struct EventListView {
  ctx: Context,
  source: QueryKey,
  events: Vec<Event>,
  list_state: ListState,
  form: Option<(FormMode, Form)>,
  confirm: ConfirmDialog,
  pending_delete: Option<String>,
}

impl EventListView {
  pub fn new(ctx: Context) -> Self {
    let mut view = Self {
      ctx,
      source: QueryKey::Events,
      events: Vec::new(),
      list_state: ListState::default(),
      form: None,
      confirm: ConfirmDialog::new(),
      pending_delete: None,
    };
    view.tick();
    view
  }

  fn is_public(&self) -> bool {
    self.source == QueryKey::PublicEvents
  }

  fn selected_event(&self) -> Option<&Event> {
    self.list_state.selected().and_then(|i| self.events.get(i))
  }

  /// Selected event if it can be written to, else a notice explaining why not
  fn writable_selection(&self) -> Option<Event> {
    let event = self.selected_event()?.clone();
    if event.is_optimistic() {
      self.ctx.notify(Notice::error("Event is still being saved"));
      return None;
    }
    Some(event)
  }

  fn open_form(&mut self, mode: FormMode, values: EventForm) {
    let title = match mode {
      FormMode::Create => "New Event",
      FormMode::Edit(_) => "Edit Event",
    };
    let form = Form::new(title)
      .field("title", "Title", &values.title)
      .field("description", "Description", &values.description)
      .field("location", "Location", &values.location)
      .field("date", "Date", &values.date)
      .field("capacity", "Capacity", &values.capacity);
    self.form = Some((mode, form));
  }

  fn submit_form(&mut self) {
    let Some((mode, form)) = self.form.as_mut() else {
      return;
    };

    let raw = EventForm {
      title: form.value("title"),
      description: form.value("description"),
      location: form.value("location"),
      date: form.value("date"),
      capacity: form.value("capacity"),
    };
    let fields = match raw.validate() {
      Ok(fields) => fields,
      Err(errors) => {
        form.set_errors(errors);
        return;
      }
    };
    let mode = mode.clone();
    self.form = None;

    let admin = self.ctx.admin.clone();
    match mode {
      FormMode::Create => self.ctx.dispatch(Action::CreateEvent, async move {
        admin.create_event(fields).await
      }),
      FormMode::Edit(id) => self.ctx.dispatch(Action::UpdateEvent, async move {
        admin.update_event(&id, fields).await
      }),
    }
  }

  fn delete_pending(&mut self) {
    let Some(id) = self.pending_delete.take() else {
      return;
    };
    let admin = self.ctx.admin.clone();
    self.ctx.dispatch(Action::DeleteEvent, async move {
      admin.delete_event(&id).await
    });
  }

  fn refresh(&self) {
    // Handles are dropped; failures show up through last_error
    self.ctx.admin.refresh();
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.events.len();
    ensure_valid_selection(&mut self.list_state, len);

    let cache = self.ctx.admin.cache();
    let label = if self.is_public() { "Public Events" } else { "Events" };
    let title = if let Some(error) = cache.last_error(self.source) {
      format!(" {} (error: {}) ", label, error)
    } else if cache.is_fetching(self.source) {
      format!(" {} ({}, refreshing...) ", label, len)
    } else {
      format!(" {} ({}) ", label, len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.events.is_empty() {
      let content = if cache.get(self.source).is_none() && cache.last_error(self.source).is_none() {
        "Loading events..."
      } else if cache.last_error(self.source).is_some() {
        "Failed to load events. Press 'r' to retry."
      } else if self.is_public() {
        "No public events."
      } else {
        "No events yet. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .events
      .iter()
      .map(|event| {
        let booked = event.attendees.len();
        let mut spans = vec![
          Span::styled(
            format!("{:<32}", truncate(&event.title, 32)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", event.date_only()),
            Style::default().fg(Color::White),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<24}", truncate(&event.location, 24))),
          Span::raw(" "),
          Span::styled(
            format!("{:>4}/{:<4}", booked, event.capacity),
            Style::default().fg(capacity_color(booked, event.capacity)),
          ),
        ];
        if event.is_optimistic() {
          spans.push(Span::styled(
            " saving...",
            Style::default().fg(Color::DarkGray).italic(),
          ));
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for EventListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((_, form)) = self.form.as_mut() {
      match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted) => self.submit_form(),
        KeyResult::Event(FormEvent::Cancelled) => self.form = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.delete_pending();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('p') => {
        self.source = if self.is_public() {
          QueryKey::Events
        } else {
          QueryKey::PublicEvents
        };
        self.list_state = ListState::default();
        self.tick();
      }
      KeyCode::Enter if !self.is_public() => {
        if let Some(event) = self.writable_selection() {
          return ViewAction::Push(Box::new(AttendeeListView::new(
            self.ctx.clone(),
            event.id.clone(),
          )));
        }
      }
      KeyCode::Char('n') if !self.is_public() => {
        self.open_form(FormMode::Create, EventForm::default());
      }
      KeyCode::Char('e') if !self.is_public() => {
        if let Some(event) = self.writable_selection() {
          self.open_form(FormMode::Edit(event.id.clone()), EventForm::from_event(&event));
        }
      }
      KeyCode::Char('d') if !self.is_public() => {
        if let Some(event) = self.writable_selection() {
          self.confirm.show(
            "Delete Event",
            format!("Delete \"{}\" and all its bookings?", event.title),
          );
          self.pending_delete = Some(event.id);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    if let Some((_, form)) = &self.form {
      form.render_overlay(frame, area);
    }
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    if self.is_public() {
      "Public Events".to_string()
    } else {
      "Events".to_string()
    }
  }

  fn tick(&mut self) {
    let cache = self.ctx.admin.cache();
    let _ = cache.ensure_fresh(self.source);
    self.events = cache.get(self.source).unwrap_or_default();
  }

  fn is_capturing_input(&self) -> bool {
    self.form.is_some() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.is_public() {
      return vec![
        ShortcutInfo::new("p", "all events").with_priority(10),
        ShortcutInfo::new("r", "refresh").with_priority(20),
        ShortcutInfo::new("q", "quit").with_priority(90),
      ];
    }
    vec![
      ShortcutInfo::new("n", "new").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("enter", "attendees").with_priority(40),
      ShortcutInfo::new("p", "public").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
