use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking status of an attendee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
  Cancelled,
}

impl BookingStatus {
  pub const ALL: [BookingStatus; 4] = [
    BookingStatus::Pending,
    BookingStatus::Approved,
    BookingStatus::Rejected,
    BookingStatus::Cancelled,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      BookingStatus::Pending => "Pending",
      BookingStatus::Approved => "Approved",
      BookingStatus::Rejected => "Rejected",
      BookingStatus::Cancelled => "Cancelled",
    }
  }
}

impl fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// An attendee registered for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
  pub id: String,
  pub event_id: String,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub status: BookingStatus,
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub updated_at: String,
}

/// An event with its attendee list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub location: String,
  pub date: String,
  pub capacity: u32,
  #[serde(default)]
  pub attendees: Vec<Attendee>,
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub updated_at: String,
}

impl Event {
  /// Whether this record only exists locally, pending server confirmation
  pub fn is_optimistic(&self) -> bool {
    is_temp_id(&self.id)
  }

  /// `YYYY-MM-DD` part of the event date, used to prefill edit forms
  pub fn date_only(&self) -> &str {
    self.date.split('T').next().unwrap_or(&self.date)
  }
}

/// Authenticated user returned by `/auth/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  #[serde(default)]
  pub name: Option<String>,
  pub email: String,
  #[serde(default)]
  pub role: String,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == "admin"
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.email)
  }
}

/// Event fields sent on create/update (no id, attendees or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
  pub title: String,
  pub description: String,
  pub location: String,
  pub date: String,
  pub capacity: u32,
}

/// Attendee fields sent on update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeePayload {
  pub name: String,
  pub email: String,
}

/// Attendee fields sent on create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendeePayload {
  pub name: String,
  pub email: String,
  pub event_id: String,
}

pub const DEFAULT_REJECTION_REASON: &str = "Rejected by admin";

/// Body of `PATCH /attendees/{id}/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
  pub status: BookingStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rejection_reason: Option<String>,
}

impl StatusUpdate {
  /// Build a status update. Rejections always carry a reason.
  pub fn new(status: BookingStatus, rejection_reason: Option<String>) -> Self {
    let rejection_reason = match (status, rejection_reason) {
      (BookingStatus::Rejected, None) => Some(DEFAULT_REJECTION_REASON.to_string()),
      (_, reason) => reason,
    };
    Self {
      status,
      rejection_reason,
    }
  }
}

/// Confirmation returned by delete and status endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
  #[serde(default)]
  pub message: Option<String>,
}

/// Body of `/auth/me`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MeResponse {
  pub user: User,
}

/// Event listings come back either bare or wrapped
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum EventsResponse {
  List(Vec<Event>),
  Wrapped { events: Vec<Event> },
}

impl From<EventsResponse> for Vec<Event> {
  fn from(response: EventsResponse) -> Self {
    match response {
      EventsResponse::List(events) => events,
      EventsResponse::Wrapped { events } => events,
    }
  }
}

/// Error body returned by the server on failure
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
  pub error: Option<String>,
}

const TEMP_ID_PREFIX: &str = "temp-";

/// Client-side id for a record that hasn't been confirmed by the server yet
pub fn temp_id(now: DateTime<Utc>) -> String {
  format!("{}{}", TEMP_ID_PREFIX, now.timestamp_millis())
}

pub fn is_temp_id(id: &str) -> bool {
  id.starts_with(TEMP_ID_PREFIX)
}

/// ISO-8601 timestamp with millisecond precision, as the server emits them
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
