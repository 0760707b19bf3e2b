use std::fmt;

/// Identifies a cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// Every event, as seen by the admin
  Events,
  /// The public listing, derived from the same records as `Events`
  PublicEvents,
}

impl QueryKey {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Events => "events",
      Self::PublicEvents => "publicEvents",
    }
  }

  /// Keys whose contents are derived from this one and go stale with it
  pub fn dependents(&self) -> &'static [QueryKey] {
    match self {
      Self::Events => &[QueryKey::PublicEvents],
      Self::PublicEvents => &[],
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
