//! Form validation for events and attendees.
//!
//! Forms hold raw text as typed; `validate` either produces checked fields
//! ready for a mutation or a per-field error map. Nothing invalid reaches the
//! network.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use crate::api::types::{iso_timestamp, Attendee, AttendeePayload, Event, EventPayload};

static EMAIL_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.0.get(field).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  fn add(&mut self, field: &'static str, message: &str) {
    // First failing rule wins for a field
    self.0.entry(field).or_insert_with(|| message.to_string());
  }

  fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
    if self.is_empty() {
      Ok(value())
    } else {
      Err(self)
    }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    f.write_str(&parts.join("; "))
  }
}

impl std::error::Error for FieldErrors {}

/// Checked event fields, date already normalized to ISO-8601
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
  pub title: String,
  pub description: String,
  pub location: String,
  pub date: String,
  pub capacity: u32,
}

impl From<EventFields> for EventPayload {
  fn from(fields: EventFields) -> Self {
    Self {
      title: fields.title,
      description: fields.description,
      location: fields.location,
      date: fields.date,
      capacity: fields.capacity,
    }
  }
}

/// Checked attendee fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeFields {
  pub name: String,
  pub email: String,
}

impl From<AttendeeFields> for AttendeePayload {
  fn from(fields: AttendeeFields) -> Self {
    Self {
      name: fields.name,
      email: fields.email,
    }
  }
}

/// Raw event form input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventForm {
  pub title: String,
  pub description: String,
  pub location: String,
  pub date: String,
  pub capacity: String,
}

impl EventForm {
  /// Prefill from an existing event; the date keeps only its day part
  pub fn from_event(event: &Event) -> Self {
    Self {
      title: event.title.clone(),
      description: event.description.clone(),
      location: event.location.clone(),
      date: event.date_only().to_string(),
      capacity: event.capacity.to_string(),
    }
  }

  pub fn validate(&self) -> Result<EventFields, FieldErrors> {
    let mut errors = FieldErrors::default();

    let title = self.title.trim();
    if title.chars().count() < 3 {
      errors.add("title", "Title must be at least 3 characters");
    }

    let description = self.description.trim();
    if description.chars().count() < 5 {
      errors.add("description", "Description must be at least 5 characters");
    }

    let location = self.location.trim();
    if location.is_empty() {
      errors.add("location", "Location is required");
    }

    let date = self.date.trim();
    let normalized = if date.is_empty() {
      errors.add("date", "Date is required");
      None
    } else {
      let normalized = normalize_date(date);
      if normalized.is_none() {
        errors.add("date", "Date must be a valid date");
      }
      normalized
    };

    let capacity = match self.capacity.trim().parse::<i64>() {
      Ok(n) if n <= 0 => {
        errors.add("capacity", "Capacity must be greater than 0");
        None
      }
      Ok(n) => match u32::try_from(n) {
        Ok(n) => Some(n),
        Err(_) => {
          errors.add("capacity", "Capacity is too large");
          None
        }
      },
      Err(_) => {
        errors.add("capacity", "Capacity must be a whole number");
        None
      }
    };

    errors.into_result(|| EventFields {
      title: title.to_string(),
      description: description.to_string(),
      location: location.to_string(),
      date: normalized.unwrap_or_default(),
      capacity: capacity.unwrap_or_default(),
    })
  }
}

/// Raw attendee form input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendeeForm {
  pub name: String,
  pub email: String,
}

impl AttendeeForm {
  pub fn from_attendee(attendee: &Attendee) -> Self {
    Self {
      name: attendee.name.clone(),
      email: attendee.email.clone(),
    }
  }

  pub fn validate(&self) -> Result<AttendeeFields, FieldErrors> {
    let mut errors = FieldErrors::default();

    let name = self.name.trim();
    if name.is_empty() {
      errors.add("name", "Name is required");
    }

    let email = self.email.trim();
    if !EMAIL_RE.is_match(email) {
      errors.add("email", "Invalid email address");
    }

    errors.into_result(|| AttendeeFields {
      name: name.to_string(),
      email: email.to_string(),
    })
  }
}

/// Normalize a `YYYY-MM-DD` or RFC 3339 date to a UTC ISO-8601 timestamp.
pub fn normalize_date(input: &str) -> Option<String> {
  if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
    let midnight = day.and_hms_opt(0, 0, 0)?.and_utc();
    return Some(iso_timestamp(midnight));
  }

  DateTime::parse_from_rfc3339(input)
    .ok()
    .map(|dt| iso_timestamp(dt.with_timezone(&Utc)))
}
