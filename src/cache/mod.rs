//! Client-side query cache.
//!
//! Holds the last fetched value per query key, tracks staleness, and runs
//! background refetches that can be cancelled so a late response never
//! overwrites a newer local write.

mod keys;
mod store;

pub use keys::QueryKey;
pub use store::{CacheError, CacheStore, Refetch, RefetchOutcome};
