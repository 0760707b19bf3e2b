//! Admin actions: every write the console can perform on events and attendees.
//!
//! Each action patches the cached `events` list optimistically, performs the
//! remote write, and settles through a `MutationCoordinator`.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::api::types::{
  Attendee, BookingStatus, Event, MessageResponse, NewAttendeePayload, StatusUpdate,
};
use crate::api::{ApiError, EventsApi};
use crate::cache::{CacheStore, QueryKey, Refetch};
use crate::mutation::{
  AttendeeChanges, EventChanges, EventsPatch, MutationCoordinator, MutationError, Settlement,
  DEFAULT_FAILURE_MESSAGE,
};
use crate::validation::{AttendeeFields, EventFields};

/// The kinds of write an operator can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  CreateEvent,
  UpdateEvent,
  DeleteEvent,
  CreateAttendee,
  UpdateAttendee,
  DeleteAttendee,
  UpdateBookingStatus,
}

impl Action {
  /// Reported when the server rejects the write without a message
  pub fn fallback_message(self) -> &'static str {
    match self {
      Action::DeleteEvent => "Failed to delete event",
      Action::DeleteAttendee => "Failed to remove attendee",
      Action::UpdateBookingStatus => "Failed to update booking status",
      _ => DEFAULT_FAILURE_MESSAGE,
    }
  }

  pub fn success_message(self) -> &'static str {
    match self {
      Action::CreateEvent => "Event created successfully",
      Action::UpdateEvent => "Event updated successfully",
      Action::DeleteEvent => "Event deleted successfully",
      Action::CreateAttendee => "Attendee added successfully",
      Action::UpdateAttendee => "Attendee updated successfully",
      Action::DeleteAttendee => "Attendee removed successfully",
      Action::UpdateBookingStatus => "Booking status updated successfully",
    }
  }

  fn prefers_server_message(self) -> bool {
    matches!(self, Action::DeleteEvent | Action::UpdateBookingStatus)
  }

  /// Text for the operator: `Ok` on success, `Err` with the failure message otherwise.
  pub fn describe<R: Confirmation>(self, outcome: &Result<R, MutationError>) -> Result<String, String> {
    match outcome {
      Ok(response) => {
        let server = response
          .server_message()
          .filter(|_| self.prefers_server_message());
        Ok(server.unwrap_or(self.success_message()).to_string())
      }
      Err(e) => Err(e.message().to_string()),
    }
  }
}

/// Successful write responses that may carry a message for the operator
pub trait Confirmation {
  fn server_message(&self) -> Option<&str> {
    None
  }
}

impl Confirmation for Event {}

impl Confirmation for Attendee {}

impl Confirmation for MessageResponse {
  fn server_message(&self) -> Option<&str> {
    self.message.as_deref().filter(|m| !m.is_empty())
  }
}

/// Entry point for reads and writes against the events service.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct Admin {
  api: Arc<dyn EventsApi>,
  cache: CacheStore<Vec<Event>>,
}

impl Admin {
  pub fn new(api: Arc<dyn EventsApi>) -> Self {
    let cache = CacheStore::new();

    let list_api = Arc::clone(&api);
    cache.register(QueryKey::Events, move || {
      let api = Arc::clone(&list_api);
      async move { api.list_events().await }
    });

    let public_api = Arc::clone(&api);
    cache.register(QueryKey::PublicEvents, move || {
      let api = Arc::clone(&public_api);
      async move { api.list_public_events().await }
    });

    Self { api, cache }
  }

  pub fn api(&self) -> &Arc<dyn EventsApi> {
    &self.api
  }

  pub fn cache(&self) -> &CacheStore<Vec<Event>> {
    &self.cache
  }

  pub fn event(&self, id: &str) -> Option<Event> {
    self
      .cache
      .get(QueryKey::Events)?
      .into_iter()
      .find(|e| e.id == id)
  }

  /// Refetch both listings
  pub fn refresh(&self) -> Vec<Refetch> {
    vec![
      self.cache.invalidate(QueryKey::Events),
      self.cache.invalidate(QueryKey::PublicEvents),
    ]
  }

  async fn mutate<R, W, Fut>(&self, action: Action, patch: EventsPatch, write: W) -> Settlement<R>
  where
    W: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, ApiError>>,
  {
    info!(?action, "dispatching");
    MutationCoordinator::new(self.cache.clone(), QueryKey::Events)
      .with_fallback_message(action.fallback_message())
      .run(
        patch,
        |previous, patch| patch.apply(previous.map(Vec::as_slice)),
        |_| write(),
      )
      .await
  }

  pub async fn create_event(&self, fields: EventFields) -> Settlement<Event> {
    let patch = EventsPatch::new_event(&fields, Utc::now());
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::CreateEvent, patch, move || async move {
        api.create_event(fields.into()).await
      })
      .await
  }

  pub async fn update_event(&self, id: &str, fields: EventFields) -> Settlement<Event> {
    let patch = EventsPatch::UpdateEvent {
      id: id.to_string(),
      changes: EventChanges::from(&fields),
    };
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::UpdateEvent, patch, move || async move {
        api.update_event(id, fields.into()).await
      })
      .await
  }

  pub async fn delete_event(&self, id: &str) -> Settlement<MessageResponse> {
    let patch = EventsPatch::RemoveEvent { id: id.to_string() };
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::DeleteEvent, patch, move || async move {
        api.delete_event(id).await
      })
      .await
  }

  pub async fn create_attendee(&self, event_id: &str, fields: AttendeeFields) -> Settlement<Attendee> {
    let patch = EventsPatch::new_attendee(event_id, &fields, Utc::now());
    let payload = NewAttendeePayload {
      name: fields.name,
      email: fields.email,
      event_id: event_id.to_string(),
    };
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::CreateAttendee, patch, move || async move {
        api.create_attendee(payload).await
      })
      .await
  }

  pub async fn update_attendee(
    &self,
    event_id: &str,
    attendee_id: &str,
    fields: AttendeeFields,
  ) -> Settlement<Attendee> {
    let patch = EventsPatch::UpdateAttendee {
      event_id: event_id.to_string(),
      attendee_id: attendee_id.to_string(),
      changes: AttendeeChanges::from(&fields),
    };
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::UpdateAttendee, patch, move || async move {
        api.update_attendee(attendee_id, fields.into()).await
      })
      .await
  }

  pub async fn delete_attendee(&self, event_id: &str, attendee_id: &str) -> Settlement<MessageResponse> {
    let patch = EventsPatch::RemoveAttendee {
      event_id: event_id.to_string(),
      attendee_id: attendee_id.to_string(),
    };
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::DeleteAttendee, patch, move || async move {
        api.delete_attendee(attendee_id).await
      })
      .await
  }

  /// Change an attendee's booking status. Rejections without a reason get a default one.
  pub async fn update_booking_status(
    &self,
    event_id: &str,
    attendee_id: &str,
    status: BookingStatus,
    rejection_reason: Option<String>,
  ) -> Settlement<MessageResponse> {
    let patch = EventsPatch::UpdateAttendee {
      event_id: event_id.to_string(),
      attendee_id: attendee_id.to_string(),
      changes: AttendeeChanges::status(status),
    };
    let update = StatusUpdate::new(status, rejection_reason);
    let api = Arc::clone(&self.api);
    self
      .mutate(Action::UpdateBookingStatus, patch, move || async move {
        api.update_booking_status(attendee_id, update).await
      })
      .await
  }
}
