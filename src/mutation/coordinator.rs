//! Runs one remote write with an optimistic local patch.
//!
//! Protocol for every mutation on a key:
//! 1. cancel in-flight refetches, snapshot the entry and apply the patch (one atomic step)
//! 2. await the remote write
//! 3. success: drop the snapshot and invalidate the key and its dependents
//! 4. failure: restore the snapshot and report the server's message
//! 5. settled (always): invalidate the key and its dependents again

use std::future::Future;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cache::{CacheError, CacheStore, QueryKey, Refetch};

pub const DEFAULT_FAILURE_MESSAGE: &str = "Something went wrong";

/// Lifecycle of the mutation a coordinator is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
  Idle,
  AppliedOptimistic,
  SettledSuccess,
  SettledFailure,
}

impl MutationState {
  pub fn can_advance_to(self, next: MutationState) -> bool {
    use MutationState::*;
    matches!(
      (self, next),
      (Idle, AppliedOptimistic)
        | (AppliedOptimistic, SettledSuccess)
        | (AppliedOptimistic, SettledFailure)
        | (SettledSuccess, Idle)
        | (SettledFailure, Idle)
    )
  }
}

/// What the remote write reported, fed to the coordinator's state machine
#[derive(Debug)]
pub enum MutationEvent<'a> {
  Success,
  Failure(&'a ApiError),
  Settled,
}

/// A failed mutation, already rolled back
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct MutationError {
  message: String,
  #[source]
  source: ApiError,
}

impl MutationError {
  fn new(source: ApiError, fallback: &str) -> Self {
    let message = source.server_message().unwrap_or(fallback).to_string();
    Self { message, source }
  }

  /// Message to show the operator
  pub fn message(&self) -> &str {
    &self.message
  }
}

/// Result of a settled mutation plus the refetches that will re-sync the cache
#[derive(Debug)]
pub struct Settlement<R> {
  outcome: Result<R, MutationError>,
  refetches: Vec<Refetch>,
}

impl<R> Settlement<R> {
  pub fn outcome(&self) -> &Result<R, MutationError> {
    &self.outcome
  }

  pub fn is_success(&self) -> bool {
    self.outcome.is_ok()
  }

  /// Wait for the settle-phase refetches, returning the first failure.
  pub async fn synced(&mut self) -> Result<(), CacheError> {
    let mut first_error = None;
    for refetch in self.refetches.drain(..) {
      if let Err(e) = refetch.wait().await {
        first_error.get_or_insert(e);
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  /// The outcome alone; pending refetches keep running detached.
  pub fn into_outcome(self) -> Result<R, MutationError> {
    self.outcome
  }
}

struct Snapshot<V> {
  previous: Option<V>,
}

/// Executes mutations against one query key of a `CacheStore`.
pub struct MutationCoordinator<V> {
  cache: CacheStore<V>,
  key: QueryKey,
  fallback_message: String,
  state: MutationState,
  snapshot: Option<Snapshot<V>>,
  refetches: Vec<Refetch>,
}

impl<V: Clone + Send + 'static> MutationCoordinator<V> {
  pub fn new(cache: CacheStore<V>, key: QueryKey) -> Self {
    Self {
      cache,
      key,
      fallback_message: DEFAULT_FAILURE_MESSAGE.to_string(),
      state: MutationState::Idle,
      snapshot: None,
      refetches: Vec::new(),
    }
  }

  /// Message reported when a failed write carries no server message
  pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
    self.fallback_message = message.into();
    self
  }

  pub fn state(&self) -> MutationState {
    self.state
  }

  /// Run one mutation.
  ///
  /// `patch` must be pure; it receives `None` when the key is absent. `write`
  /// is the only await point.
  pub async fn run<I, R, P, W, Fut>(&mut self, input: I, patch: P, write: W) -> Settlement<R>
  where
    P: FnOnce(Option<&V>, &I) -> V,
    W: FnOnce(I) -> Fut,
    Fut: Future<Output = Result<R, ApiError>>,
  {
    let previous = self
      .cache
      .apply_optimistic(self.key, |previous| patch(previous, &input));
    self.snapshot = Some(Snapshot { previous });
    self.advance(MutationState::AppliedOptimistic);
    debug!(key = %self.key, "optimistic patch applied");

    let result = write(input).await;

    match &result {
      Ok(_) => self.on_event(MutationEvent::Success),
      Err(e) => self.on_event(MutationEvent::Failure(e)),
    }
    self.on_event(MutationEvent::Settled);

    Settlement {
      outcome: result.map_err(|e| MutationError::new(e, &self.fallback_message)),
      refetches: std::mem::take(&mut self.refetches),
    }
  }

  fn on_event(&mut self, event: MutationEvent<'_>) {
    match event {
      MutationEvent::Success => {
        self.advance(MutationState::SettledSuccess);
        self.snapshot = None;
        self.invalidate_all();
        info!(key = %self.key, "mutation succeeded");
      }
      MutationEvent::Failure(error) => {
        self.advance(MutationState::SettledFailure);
        if let Some(snapshot) = self.snapshot.take() {
          self.cache.restore(self.key, snapshot.previous);
        }
        warn!(key = %self.key, %error, "mutation failed, rolled back");
      }
      MutationEvent::Settled => {
        // Success already started these refetches; invalidating again would abort them
        if self.refetches.is_empty() {
          self.invalidate_all();
        }
        self.advance(MutationState::Idle);
      }
    }
  }

  fn invalidate_all(&mut self) {
    self.refetches = std::iter::once(self.key)
      .chain(self.key.dependents().iter().copied())
      .map(|key| self.cache.invalidate(key))
      .collect();
  }

  fn advance(&mut self, next: MutationState) {
    debug_assert!(
      self.state.can_advance_to(next),
      "invalid mutation transition {:?} -> {:?}",
      self.state,
      next
    );
    self.state = next;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::RefetchOutcome;
  use reqwest::StatusCode;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use tokio::sync::Notify;

  fn rejected(message: Option<&str>) -> ApiError {
    ApiError::Status {
      status: StatusCode::BAD_REQUEST,
      message: message.map(String::from),
    }
  }

  fn push(previous: Option<&Vec<u32>>, item: &u32) -> Vec<u32> {
    let mut next = previous.cloned().unwrap_or_default();
    next.push(*item);
    next
  }

  #[test]
  fn test_state_transitions() {
    use MutationState::*;
    assert!(Idle.can_advance_to(AppliedOptimistic));
    assert!(AppliedOptimistic.can_advance_to(SettledFailure));
    assert!(SettledSuccess.can_advance_to(Idle));
    assert!(!Idle.can_advance_to(SettledSuccess));
    assert!(!SettledFailure.can_advance_to(AppliedOptimistic));
    assert!(!AppliedOptimistic.can_advance_to(Idle));
  }

  #[tokio::test]
  async fn test_patch_is_visible_during_write() {
    let cache = CacheStore::new();
    cache.set(QueryKey::Events, vec![1]);
    let observer = cache.clone();

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let settlement = coordinator
      .run(2u32, push, |item| async move {
        assert_eq!(observer.get(QueryKey::Events), Some(vec![1, 2]));
        Ok(item)
      })
      .await;

    assert_eq!(settlement.into_outcome().unwrap(), 2);
    assert_eq!(coordinator.state(), MutationState::Idle);
  }

  #[tokio::test]
  async fn test_success_refetches_key_and_dependents() {
    let cache = CacheStore::new();
    cache.register(QueryKey::Events, || async { Ok(vec![10, 20]) });
    cache.register(QueryKey::PublicEvents, || async { Ok(vec![20]) });
    cache.set(QueryKey::Events, vec![10]);

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let mut settlement = coordinator
      .run(99u32, push, |_| async { Ok(()) })
      .await;
    assert!(settlement.is_success());

    settlement.synced().await.unwrap();
    assert_eq!(cache.get(QueryKey::Events), Some(vec![10, 20]));
    assert_eq!(cache.get(QueryKey::PublicEvents), Some(vec![20]));
  }

  #[tokio::test]
  async fn test_each_settle_fetches_once() {
    let cache = CacheStore::new();
    let fetches = Arc::new(AtomicU32::new(0));
    let counter = fetches.clone();
    cache.register(QueryKey::Events, move || {
      counter.fetch_add(1, Ordering::SeqCst);
      async { Ok(vec![1]) }
    });
    cache.set(QueryKey::Events, vec![1]);

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let mut settlement = coordinator.run(2u32, push, |_| async { Ok(()) }).await;
    settlement.synced().await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let mut settlement = coordinator
      .run(3u32, push, |_| async { Err::<(), _>(rejected(None)) })
      .await;
    settlement.synced().await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failure_restores_snapshot() {
    let cache = CacheStore::new();
    cache.set(QueryKey::Events, vec![1, 2, 3]);

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let settlement = coordinator
      .run(4u32, push, |_| async { Err::<(), _>(rejected(Some("Event is full"))) })
      .await;

    let err = settlement.into_outcome().unwrap_err();
    assert_eq!(err.message(), "Event is full");
    assert_eq!(cache.get(QueryKey::Events), Some(vec![1, 2, 3]));
    assert_eq!(coordinator.state(), MutationState::Idle);
  }

  #[tokio::test]
  async fn test_failure_without_server_message_uses_fallback() {
    let cache = CacheStore::new();
    let mut coordinator = MutationCoordinator::new(cache, QueryKey::Events)
      .with_fallback_message("Failed to remove attendee");

    let settlement = coordinator
      .run(1u32, push, |_| async { Err::<(), _>(rejected(None)) })
      .await;

    assert_eq!(
      settlement.into_outcome().unwrap_err().message(),
      "Failed to remove attendee"
    );
  }

  #[tokio::test]
  async fn test_rollback_ignores_concurrent_writes() {
    let cache = CacheStore::new();
    cache.set(QueryKey::Events, vec![1]);
    let intruder = cache.clone();

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let _ = coordinator
      .run(2u32, push, |_| async move {
        intruder.set(QueryKey::Events, vec![7, 7, 7]);
        Err::<(), _>(rejected(None))
      })
      .await;

    assert_eq!(cache.get(QueryKey::Events), Some(vec![1]));
  }

  #[tokio::test]
  async fn test_rollback_from_absent_restores_absent() {
    let cache: CacheStore<Vec<u32>> = CacheStore::new();

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let settlement = coordinator
      .run(5u32, push, |_| async { Err::<(), _>(rejected(None)) })
      .await;

    assert!(!settlement.is_success());
    assert_eq!(cache.get(QueryKey::Events), None);
  }

  #[tokio::test]
  async fn test_key_is_stale_after_settle_either_way() {
    let cache = CacheStore::new();
    cache.set(QueryKey::Events, vec![1]);

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    coordinator.run(2u32, push, |_| async { Ok(()) }).await;
    assert!(cache.is_stale(QueryKey::Events));
    assert!(cache.is_stale(QueryKey::PublicEvents));

    cache.set(QueryKey::Events, vec![1]);
    coordinator
      .run(3u32, push, |_| async { Err::<(), _>(rejected(None)) })
      .await;
    assert!(cache.is_stale(QueryKey::Events));
  }

  #[tokio::test]
  async fn test_pending_refetch_cannot_overwrite_optimistic_patch() {
    let cache = CacheStore::new();
    let gate = Arc::new(Notify::new());
    let fetch_gate = gate.clone();
    cache.register(QueryKey::Events, move || {
      let gate = fetch_gate.clone();
      async move {
        gate.notified().await;
        Ok(vec![0])
      }
    });
    cache.set(QueryKey::Events, vec![1]);

    // Refetch from an earlier mutation is still in flight
    let earlier = cache.invalidate(QueryKey::Events);

    let observer = cache.clone();
    let release = gate.clone();
    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    coordinator
      .run(2u32, push, |_| async move {
        release.notify_waiters();
        tokio::task::yield_now().await;
        assert_eq!(observer.get(QueryKey::Events), Some(vec![1, 2]));
        Ok(())
      })
      .await;

    assert_eq!(earlier.wait().await.unwrap(), RefetchOutcome::Superseded);
  }

  #[tokio::test]
  async fn test_refetch_failure_is_surfaced_to_initiator() {
    let cache: CacheStore<Vec<u32>> = CacheStore::new();
    cache.register(QueryKey::Events, || async { Err(rejected(Some("down"))) });

    let mut coordinator = MutationCoordinator::new(cache.clone(), QueryKey::Events);
    let mut settlement = coordinator.run(1u32, push, |_| async { Ok(()) }).await;

    assert!(settlement.is_success());
    assert!(matches!(
      settlement.synced().await,
      Err(CacheError::Fetch { key: QueryKey::Events, .. })
    ));
  }
}
