//! In-memory events service for tests.

use super::types::{
  Attendee, AttendeePayload, Event, EventPayload, MessageResponse, NewAttendeePayload,
  StatusUpdate, User,
};
use super::{ApiError, EventsApi};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
  events: Vec<Event>,
  user: Option<User>,
  token: Option<String>,
  write_error: Option<Option<String>>,
  next_id: u32,
  list_calls: usize,
  status_updates: Vec<(String, StatusUpdate)>,
}

#[derive(Default)]
pub struct FakeApi {
  state: Mutex<FakeState>,
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_events(events: Vec<Event>) -> Self {
    let api = Self::new();
    api.state.lock().unwrap().events = events;
    api
  }

  pub fn with_user(self, user: User) -> Self {
    self.state.lock().unwrap().user = Some(user);
    self
  }

  /// Make every write fail with a 400, optionally carrying a server message
  pub fn fail_writes(&self, message: Option<&str>) {
    self.state.lock().unwrap().write_error = Some(message.map(String::from));
  }

  pub fn server_events(&self) -> Vec<Event> {
    self.state.lock().unwrap().events.clone()
  }

  pub fn list_calls(&self) -> usize {
    self.state.lock().unwrap().list_calls
  }

  pub fn status_updates(&self) -> Vec<(String, StatusUpdate)> {
    self.state.lock().unwrap().status_updates.clone()
  }

  pub fn token(&self) -> Option<String> {
    self.state.lock().unwrap().token.clone()
  }

  fn check_write(state: &FakeState) -> Result<(), ApiError> {
    match &state.write_error {
      Some(message) => Err(ApiError::Status {
        status: StatusCode::BAD_REQUEST,
        message: message.clone(),
      }),
      None => Ok(()),
    }
  }

  fn not_found(what: &str) -> ApiError {
    ApiError::Status {
      status: StatusCode::NOT_FOUND,
      message: Some(format!("{} not found", what)),
    }
  }

  fn find_attendee<'a>(state: &'a mut FakeState, id: &str) -> Option<&'a mut Attendee> {
    state
      .events
      .iter_mut()
      .flat_map(|e| e.attendees.iter_mut())
      .find(|a| a.id == id)
  }
}

#[async_trait]
impl EventsApi for FakeApi {
  fn set_token(&self, token: Option<String>) {
    self.state.lock().unwrap().token = token;
  }

  async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
    let mut state = self.state.lock().unwrap();
    state.list_calls += 1;
    Ok(state.events.clone())
  }

  async fn list_public_events(&self) -> Result<Vec<Event>, ApiError> {
    Ok(self.state.lock().unwrap().events.clone())
  }

  async fn create_event(&self, payload: EventPayload) -> Result<Event, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    state.next_id += 1;
    let event = Event {
      id: format!("e{}", state.next_id),
      title: payload.title,
      description: payload.description,
      location: payload.location,
      date: payload.date,
      capacity: payload.capacity,
      attendees: Vec::new(),
      created_at: "2024-01-01T00:00:00.000Z".to_string(),
      updated_at: "2024-01-01T00:00:00.000Z".to_string(),
    };
    state.events.push(event.clone());
    Ok(event)
  }

  async fn update_event(&self, id: &str, payload: EventPayload) -> Result<Event, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    let event = state
      .events
      .iter_mut()
      .find(|e| e.id == id)
      .ok_or_else(|| Self::not_found("Event"))?;
    event.title = payload.title;
    event.description = payload.description;
    event.location = payload.location;
    event.date = payload.date;
    event.capacity = payload.capacity;
    Ok(event.clone())
  }

  async fn delete_event(&self, id: &str) -> Result<MessageResponse, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    state.events.retain(|e| e.id != id);
    Ok(MessageResponse {
      message: Some("Event deleted".to_string()),
    })
  }

  async fn create_attendee(&self, payload: NewAttendeePayload) -> Result<Attendee, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    state.next_id += 1;
    let attendee = Attendee {
      id: format!("a{}", state.next_id),
      event_id: payload.event_id.clone(),
      name: payload.name,
      email: payload.email,
      status: Default::default(),
      created_at: "2024-01-01T00:00:00.000Z".to_string(),
      updated_at: "2024-01-01T00:00:00.000Z".to_string(),
    };
    let event = state
      .events
      .iter_mut()
      .find(|e| e.id == payload.event_id)
      .ok_or_else(|| Self::not_found("Event"))?;
    event.attendees.push(attendee.clone());
    Ok(attendee)
  }

  async fn update_attendee(&self, id: &str, payload: AttendeePayload) -> Result<Attendee, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    let attendee = Self::find_attendee(&mut state, id).ok_or_else(|| Self::not_found("Attendee"))?;
    attendee.name = payload.name;
    attendee.email = payload.email;
    Ok(attendee.clone())
  }

  async fn delete_attendee(&self, id: &str) -> Result<MessageResponse, ApiError> {
    let mut state = self.state.lock().unwrap();
    Self::check_write(&state)?;
    for event in &mut state.events {
      event.attendees.retain(|a| a.id != id);
    }
    Ok(MessageResponse {
      message: Some("Attendee removed".to_string()),
    })
  }

  async fn update_booking_status(
    &self,
    id: &str,
    update: StatusUpdate,
  ) -> Result<MessageResponse, ApiError> {
    let mut state = self.state.lock().unwrap();
    state.status_updates.push((id.to_string(), update.clone()));
    Self::check_write(&state)?;
    let attendee = Self::find_attendee(&mut state, id).ok_or_else(|| Self::not_found("Attendee"))?;
    attendee.status = update.status;
    Ok(MessageResponse {
      message: Some("Booking status updated".to_string()),
    })
  }

  async fn current_user(&self) -> Result<User, ApiError> {
    let state = self.state.lock().unwrap();
    match (&state.token, &state.user) {
      (Some(_), Some(user)) => Ok(user.clone()),
      _ => Err(ApiError::Status {
        status: StatusCode::UNAUTHORIZED,
        message: Some("Unauthorized".to_string()),
      }),
    }
  }
}
