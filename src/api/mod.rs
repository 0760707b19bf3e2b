//! Remote API for the events service.

mod client;
mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;

use async_trait::async_trait;
use types::{
  Attendee, AttendeePayload, Event, EventPayload, MessageResponse, NewAttendeePayload,
  StatusUpdate, User,
};

/// Operations the admin console needs from the events service.
///
/// `ApiClient` is the HTTP implementation; tests substitute an in-memory one.
#[async_trait]
pub trait EventsApi: Send + Sync {
  /// Replace (or forget) the bearer token sent with subsequent requests
  fn set_token(&self, token: Option<String>);

  async fn list_events(&self) -> Result<Vec<Event>, ApiError>;

  async fn list_public_events(&self) -> Result<Vec<Event>, ApiError>;

  async fn create_event(&self, payload: EventPayload) -> Result<Event, ApiError>;

  async fn update_event(&self, id: &str, payload: EventPayload) -> Result<Event, ApiError>;

  async fn delete_event(&self, id: &str) -> Result<MessageResponse, ApiError>;

  async fn create_attendee(&self, payload: NewAttendeePayload) -> Result<Attendee, ApiError>;

  async fn update_attendee(&self, id: &str, payload: AttendeePayload) -> Result<Attendee, ApiError>;

  async fn delete_attendee(&self, id: &str) -> Result<MessageResponse, ApiError>;

  async fn update_booking_status(
    &self,
    id: &str,
    update: StatusUpdate,
  ) -> Result<MessageResponse, ApiError>;

  /// Resolve the user behind the current token
  async fn current_user(&self) -> Result<User, ApiError>;
}
