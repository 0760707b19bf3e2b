//! Optimistic mutations over the query cache.

mod coordinator;
mod patch;

pub use coordinator::{MutationCoordinator, MutationError, Settlement, DEFAULT_FAILURE_MESSAGE};
pub use patch::{AttendeeChanges, EventChanges, EventsPatch};
