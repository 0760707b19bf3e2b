use crate::admin::Action;
use crate::api::types::{is_temp_id, Attendee, Event};
use crate::cache::QueryKey;
use crate::event::Notice;
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, Form, FormEvent, KeyResult, StatusPicker, StatusPickerEvent,
};
use crate::ui::context::Context;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{booking_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation::AttendeeForm;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone)]
enum FormMode {
  Add,
  Edit(String),
}

/// Attendees of one event, with booking management
pub struct AttendeeListView {
  ctx: Context,
  event_id: String,
  event: Option<Event>,
  list_state: ListState,
  form: Option<(FormMode, Form)>,
  confirm: ConfirmDialog,
  pending_delete: Option<String>,
  picker: StatusPicker,
  picking: Option<String>,
}

impl AttendeeListView {
  pub fn new(ctx: Context, event_id: String) -> Self {
    let mut view = Self {
      ctx,
      event_id,
      event: None,
      list_state: ListState::default(),
      form: None,
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      picker: StatusPicker::new(),
      picking: None,
    };
    view.tick();
    view
  }

  fn attendees(&self) -> &[Attendee] {
    self.event.as_ref().map(|e| e.attendees.as_slice()).unwrap_or(&[])
  }

  fn selected_attendee(&self) -> Option<&Attendee> {
    self.list_state.selected().and_then(|i| self.attendees().get(i))
  }

  fn writable_selection(&self) -> Option<Attendee> {
    let attendee = self.selected_attendee()?.clone();
    if is_temp_id(&attendee.id) {
      self.ctx.notify(Notice::error("Attendee is still being saved"));
      return None;
    }
    Some(attendee)
  }

  fn open_form(&mut self, mode: FormMode, values: AttendeeForm) {
    let title = match mode {
      FormMode::Add => "Add Attendee",
      FormMode::Edit(_) => "Edit Attendee",
    };
    let form = Form::new(title)
      .field("name", "Name", &values.name)
      .field("email", "Email", &values.email);
    self.form = Some((mode, form));
  }

  fn submit_form(&mut self) {
    let Some((mode, form)) = self.form.as_mut() else {
      return;
    };

    let raw = AttendeeForm {
      name: form.value("name"),
      email: form.value("email"),
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
    let event_id = self.event_id.clone();
    match mode {
      FormMode::Add => self.ctx.dispatch(Action::CreateAttendee, async move {
        admin.create_attendee(&event_id, fields).await
      }),
      FormMode::Edit(attendee_id) => self.ctx.dispatch(Action::UpdateAttendee, async move {
        admin.update_attendee(&event_id, &attendee_id, fields).await
      }),
    }
  }

  fn delete_pending(&mut self) {
    let Some(attendee_id) = self.pending_delete.take() else {
      return;
    };
    let admin = self.ctx.admin.clone();
    let event_id = self.event_id.clone();
    self.ctx.dispatch(Action::DeleteAttendee, async move {
      admin.delete_attendee(&event_id, &attendee_id).await
    });
  }

  fn open_status_picker(&mut self) {
    if !self.ctx.is_admin() {
      self
        .ctx
        .notify(Notice::error("Only admins can change booking status"));
      return;
    }
    if let Some(attendee) = self.writable_selection() {
      self
        .picker
        .show(format!("Status: {}", attendee.name), attendee.status);
      self.picking = Some(attendee.id);
    }
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let Some(event) = &self.event else {
      return;
    };
    let line = Line::from(vec![
      Span::styled(event.date_only(), Style::default().fg(Color::White)),
      Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
      Span::raw(event.location.as_str()),
      Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!("{}/{} booked", event.attendees.len(), event.capacity)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.attendees().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match &self.event {
      Some(event) => format!(" {} ({}) ", truncate(&event.title, 40), len),
      None => " Attendees ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.attendees().is_empty() {
      let loaded = self.ctx.admin.cache().get(QueryKey::Events).is_some();
      let content = match (&self.event, loaded) {
        (Some(_), _) => "No attendees yet. Press 'a' to add one.",
        (None, true) => "Event not found",
        (None, false) => "Loading...",
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .attendees()
      .iter()
      .map(|attendee| {
        let status = attendee.status;
        let line = Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&attendee.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<32}", truncate(&attendee.email, 32))),
          Span::raw(" "),
          Span::styled(
            format!(" {} ", status.label()),
            Style::default()
              .fg(Color::Black)
              .bg(booking_status_color(status)),
          ),
        ]);
        ListItem::new(line)
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

impl View for AttendeeListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((_, form)) = self.form.as_mut() {
      match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted) => self.submit_form(),
        KeyResult::Event(FormEvent::Cancelled) => self.form = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(StatusPickerEvent::Selected(status)) => {
        if let Some(attendee_id) = self.picking.take() {
          let admin = self.ctx.admin.clone();
          let event_id = self.event_id.clone();
          self.ctx.dispatch(Action::UpdateBookingStatus, async move {
            admin
              .update_booking_status(&event_id, &attendee_id, status, None)
              .await
          });
        }
        return ViewAction::None;
      }
      KeyResult::Event(StatusPickerEvent::Cancelled) => {
        self.picking = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
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
      KeyCode::Char('r') => {
        self.ctx.admin.refresh();
      }
      KeyCode::Char('a') if self.event.is_some() => {
        self.open_form(FormMode::Add, AttendeeForm::default());
      }
      KeyCode::Char('e') => {
        if let Some(attendee) = self.writable_selection() {
          self.open_form(
            FormMode::Edit(attendee.id.clone()),
            AttendeeForm::from_attendee(&attendee),
          );
        }
      }
      KeyCode::Char('d') => {
        if let Some(attendee) = self.writable_selection() {
          self.confirm.show(
            "Remove Attendee",
            format!("Remove {} from this event?", attendee.name),
          );
          self.pending_delete = Some(attendee.id);
        }
      }
      KeyCode::Char('s') => self.open_status_picker(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);

    self.render_summary(frame, chunks[0]);
    self.render_list(frame, chunks[1]);

    if let Some((_, form)) = &self.form {
      form.render_overlay(frame, area);
    }
    self.confirm.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.event {
      Some(event) => truncate(&event.title, 30),
      None => "Attendees".to_string(),
    }
  }

  fn tick(&mut self) {
    let cache = self.ctx.admin.cache();
    let _ = cache.ensure_fresh(QueryKey::Events);
    self.event = cache
      .get(QueryKey::Events)
      .and_then(|events| events.into_iter().find(|e| e.id == self.event_id));
  }

  fn is_capturing_input(&self) -> bool {
    self.form.is_some() || self.confirm.is_active() || self.picker.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new("a", "add").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("d", "remove").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if self.ctx.is_admin() {
      shortcuts.push(ShortcutInfo::new("s", "status").with_priority(40));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::admin::Admin;
  use crate::api::fake::FakeApi;
  use crate::api::types::{BookingStatus, User};
  use crate::auth::Session;
  use crate::event::{AppEvent, NoticeKind};
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use tokio::sync::mpsc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn event_with_attendee() -> Event {
    Event {
      id: "e1".to_string(),
      title: "Rust Meetup".to_string(),
      description: "Monthly gathering".to_string(),
      location: "Berlin".to_string(),
      date: "2024-05-01T00:00:00.000Z".to_string(),
      capacity: 20,
      attendees: vec![Attendee {
        id: "a1".to_string(),
        event_id: "e1".to_string(),
        name: "Jo".to_string(),
        email: "jo@x.com".to_string(),
        status: BookingStatus::Pending,
        created_at: String::new(),
        updated_at: String::new(),
      }],
      created_at: String::new(),
      updated_at: String::new(),
    }
  }

  fn session(role: &str) -> Session {
    Session {
      user: Some(User {
        id: "u1".to_string(),
        name: None,
        email: "ops@x.com".to_string(),
        role: role.to_string(),
      }),
    }
  }

  async fn setup(
    session: Session,
    event_id: &str,
  ) -> (Arc<FakeApi>, AttendeeListView, mpsc::UnboundedReceiver<AppEvent>) {
    let api = Arc::new(FakeApi::with_events(vec![event_with_attendee()]));
    let admin = Admin::new(api.clone());
    for refetch in admin.refresh() {
      refetch.wait().await.unwrap();
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let view = AttendeeListView::new(Context::new(admin, session, tx), event_id.to_string());
    (api, view, rx)
  }

  async fn next_notice(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Notice {
    match rx.recv().await {
      Some(AppEvent::Notice(notice)) => notice,
      other => panic!("expected notice, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_missing_event() {
    let (_api, view, _rx) = setup(Session::default(), "gone").await;
    assert!(view.event.is_none());
    assert_eq!(view.breadcrumb_label(), "Attendees");
  }

  #[tokio::test]
  async fn test_status_picker_is_admin_only() {
    let (_api, mut view, mut rx) = setup(session("user"), "e1").await;
    view.list_state.select(Some(0));

    view.handle_key(key(KeyCode::Char('s')));
    assert!(!view.is_capturing_input());
    let notice = next_notice(&mut rx).await;
    assert_eq!(notice.kind, NoticeKind::Error);
  }

  #[tokio::test]
  async fn test_admin_approves_booking() {
    let (api, mut view, mut rx) = setup(session("admin"), "e1").await;
    view.list_state.select(Some(0));

    view.handle_key(key(KeyCode::Char('s')));
    assert!(view.is_capturing_input());
    view.handle_key(key(KeyCode::Down));
    view.handle_key(key(KeyCode::Enter));

    let notice = next_notice(&mut rx).await;
    assert_eq!(notice.text, "Booking status updated");
    assert_eq!(
      api.server_events()[0].attendees[0].status,
      BookingStatus::Approved
    );
  }

  #[tokio::test]
  async fn test_remove_attendee_after_confirmation() {
    let (api, mut view, mut rx) = setup(Session::default(), "e1").await;
    view.list_state.select(Some(0));

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(api.server_events()[0].attendees.len(), 1);

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Enter));
    let notice = next_notice(&mut rx).await;
    assert_eq!(notice.text, "Attendee removed successfully");
    assert!(api.server_events()[0].attendees.is_empty());
  }
}
