//! Optimistic patches for the cached event list.
//!
//! Each patch names exactly which fields it touches. Applying one is pure and
//! total: an absent list is treated as empty, and targets that no longer exist
//! leave the list unchanged.

use chrono::{DateTime, Utc};

use crate::api::types::{iso_timestamp, temp_id, Attendee, BookingStatus, Event};
use crate::validation::{AttendeeFields, EventFields};

/// Field-level changes to an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
  pub title: Option<String>,
  pub description: Option<String>,
  pub location: Option<String>,
  pub date: Option<String>,
  pub capacity: Option<u32>,
}

impl EventChanges {
  fn apply_to(&self, event: &mut Event) {
    if let Some(title) = &self.title {
      event.title = title.clone();
    }
    if let Some(description) = &self.description {
      event.description = description.clone();
    }
    if let Some(location) = &self.location {
      event.location = location.clone();
    }
    if let Some(date) = &self.date {
      event.date = date.clone();
    }
    if let Some(capacity) = self.capacity {
      event.capacity = capacity;
    }
  }
}

impl From<&EventFields> for EventChanges {
  fn from(fields: &EventFields) -> Self {
    Self {
      title: Some(fields.title.clone()),
      description: Some(fields.description.clone()),
      location: Some(fields.location.clone()),
      date: Some(fields.date.clone()),
      capacity: Some(fields.capacity),
    }
  }
}

/// Field-level changes to an attendee
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendeeChanges {
  pub name: Option<String>,
  pub email: Option<String>,
  pub status: Option<BookingStatus>,
}

impl AttendeeChanges {
  pub fn status(status: BookingStatus) -> Self {
    Self {
      status: Some(status),
      ..Default::default()
    }
  }

  fn apply_to(&self, attendee: &mut Attendee) {
    if let Some(name) = &self.name {
      attendee.name = name.clone();
    }
    if let Some(email) = &self.email {
      attendee.email = email.clone();
    }
    if let Some(status) = self.status {
      attendee.status = status;
    }
  }
}

impl From<&AttendeeFields> for AttendeeChanges {
  fn from(fields: &AttendeeFields) -> Self {
    Self {
      name: Some(fields.name.clone()),
      email: Some(fields.email.clone()),
      status: None,
    }
  }
}

/// A speculative change to the cached list of events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsPatch {
  AddEvent(Event),
  UpdateEvent {
    id: String,
    changes: EventChanges,
  },
  RemoveEvent {
    id: String,
  },
  AddAttendee {
    event_id: String,
    attendee: Attendee,
  },
  UpdateAttendee {
    event_id: String,
    attendee_id: String,
    changes: AttendeeChanges,
  },
  RemoveAttendee {
    event_id: String,
    attendee_id: String,
  },
}

impl EventsPatch {
  /// Append a placeholder event with a temporary id
  pub fn new_event(fields: &EventFields, now: DateTime<Utc>) -> Self {
    let timestamp = iso_timestamp(now);
    Self::AddEvent(Event {
      id: temp_id(now),
      title: fields.title.clone(),
      description: fields.description.clone(),
      location: fields.location.clone(),
      date: fields.date.clone(),
      capacity: fields.capacity,
      attendees: Vec::new(),
      created_at: timestamp.clone(),
      updated_at: timestamp,
    })
  }

  /// Append a placeholder attendee with a temporary id to an event
  pub fn new_attendee(event_id: &str, fields: &AttendeeFields, now: DateTime<Utc>) -> Self {
    let timestamp = iso_timestamp(now);
    Self::AddAttendee {
      event_id: event_id.to_string(),
      attendee: Attendee {
        id: temp_id(now),
        event_id: event_id.to_string(),
        name: fields.name.clone(),
        email: fields.email.clone(),
        status: BookingStatus::Pending,
        created_at: timestamp.clone(),
        updated_at: timestamp,
      },
    }
  }

  pub fn apply(&self, previous: Option<&[Event]>) -> Vec<Event> {
    let mut events = previous.map(<[Event]>::to_vec).unwrap_or_default();

    match self {
      Self::AddEvent(event) => events.push(event.clone()),
      Self::UpdateEvent { id, changes } => {
        if let Some(event) = events.iter_mut().find(|e| &e.id == id) {
          changes.apply_to(event);
        }
      }
      Self::RemoveEvent { id } => events.retain(|e| &e.id != id),
      Self::AddAttendee { event_id, attendee } => {
        if let Some(event) = events.iter_mut().find(|e| &e.id == event_id) {
          event.attendees.push(attendee.clone());
        }
      }
      Self::UpdateAttendee {
        event_id,
        attendee_id,
        changes,
      } => {
        let attendee = events
          .iter_mut()
          .filter(|e| &e.id == event_id)
          .flat_map(|e| e.attendees.iter_mut())
          .find(|a| &a.id == attendee_id);
        if let Some(attendee) = attendee {
          changes.apply_to(attendee);
        }
      }
      Self::RemoveAttendee {
        event_id,
        attendee_id,
      } => {
        if let Some(event) = events.iter_mut().find(|e| &e.id == event_id) {
          event.attendees.retain(|a| &a.id != attendee_id);
        }
      }
    }

    events
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
  }

  fn event(id: &str) -> Event {
    Event {
      id: id.to_string(),
      title: "Rust Meetup".to_string(),
      description: "Monthly gathering".to_string(),
      location: "Berlin".to_string(),
      date: "2024-05-01T00:00:00.000Z".to_string(),
      capacity: 20,
      attendees: Vec::new(),
      created_at: String::new(),
      updated_at: String::new(),
    }
  }

  fn attendee(id: &str, event_id: &str) -> Attendee {
    Attendee {
      id: id.to_string(),
      event_id: event_id.to_string(),
      name: "Jo".to_string(),
      email: "jo@x.com".to_string(),
      status: BookingStatus::Pending,
      created_at: String::new(),
      updated_at: String::new(),
    }
  }

  fn fields() -> EventFields {
    EventFields {
      title: "Launch".to_string(),
      description: "Product launch".to_string(),
      location: "Paris".to_string(),
      date: "2024-06-01T00:00:00.000Z".to_string(),
      capacity: 50,
    }
  }

  #[test]
  fn test_add_event_to_absent_list() {
    let events = EventsPatch::new_event(&fields(), now()).apply(None);
    assert_eq!(events.len(), 1);
    assert!(events[0].is_optimistic());
    assert!(events[0].attendees.is_empty());
    assert_eq!(events[0].created_at, "2024-03-01T12:00:00.000Z");
  }

  #[test]
  fn test_add_event_appends() {
    let events = EventsPatch::new_event(&fields(), now()).apply(Some(&[event("e1")][..]));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, "e1");
    assert_eq!(events[1].title, "Launch");
  }

  #[test]
  fn test_update_event_touches_only_named_fields() {
    let patch = EventsPatch::UpdateEvent {
      id: "e1".to_string(),
      changes: EventChanges {
        capacity: Some(5),
        ..Default::default()
      },
    };
    let events = patch.apply(Some(&[event("e1"), event("e2")][..]));
    assert_eq!(events[0].capacity, 5);
    assert_eq!(events[0].title, "Rust Meetup");
    assert_eq!(events[1].capacity, 20);
  }

  #[test]
  fn test_update_unknown_event_is_noop() {
    let before = vec![event("e1")];
    let patch = EventsPatch::UpdateEvent {
      id: "missing".to_string(),
      changes: EventChanges::from(&fields()),
    };
    assert_eq!(patch.apply(Some(before.as_slice())), before);
  }

  #[test]
  fn test_remove_event() {
    let patch = EventsPatch::RemoveEvent {
      id: "e1".to_string(),
    };
    let events = patch.apply(Some(&[event("e1"), event("e2")][..]));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "e2");
  }

  #[test]
  fn test_add_attendee() {
    let fields = AttendeeFields {
      name: "Jo".to_string(),
      email: "jo@x.com".to_string(),
    };
    let events = EventsPatch::new_attendee("e1", &fields, now()).apply(Some(&[event("e1")][..]));
    let attendees = &events[0].attendees;
    assert_eq!(attendees.len(), 1);
    assert!(attendees[0].id.starts_with("temp-"));
    assert_eq!(attendees[0].event_id, "e1");
    assert_eq!(attendees[0].status, BookingStatus::Pending);
  }

  #[test]
  fn test_update_attendee_status() {
    let mut e1 = event("e1");
    e1.attendees.push(attendee("a1", "e1"));
    e1.attendees.push(attendee("a2", "e1"));

    let patch = EventsPatch::UpdateAttendee {
      event_id: "e1".to_string(),
      attendee_id: "a2".to_string(),
      changes: AttendeeChanges::status(BookingStatus::Approved),
    };
    let events = patch.apply(Some(&[e1][..]));
    assert_eq!(events[0].attendees[0].status, BookingStatus::Pending);
    assert_eq!(events[0].attendees[1].status, BookingStatus::Approved);
    assert_eq!(events[0].attendees[1].name, "Jo");
  }

  #[test]
  fn test_remove_attendee() {
    let mut e1 = event("e1");
    e1.attendees.push(attendee("a1", "e1"));

    let patch = EventsPatch::RemoveAttendee {
      event_id: "e1".to_string(),
      attendee_id: "a1".to_string(),
    };
    assert!(patch.apply(Some(&[e1][..]))[0].attendees.is_empty());
  }

  #[test]
  fn test_remove_attendee_from_absent_list() {
    let patch = EventsPatch::RemoveAttendee {
      event_id: "e1".to_string(),
      attendee_id: "a1".to_string(),
    };
    assert!(patch.apply(None).is_empty());
  }
}
