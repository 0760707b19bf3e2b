//! In-memory query cache with cancellable background refetches.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use super::keys::QueryKey;
use crate::api::ApiError;

/// Async function that loads the value for one key
type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

/// How a refetch ended, when it didn't fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchOutcome {
  /// The response was written to the cache
  Applied,
  /// A newer write or fetch superseded this one; the response was dropped
  Superseded,
  /// No fetcher is registered for the key, the entry was only marked stale
  NoFetcher,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  #[error("refetch of {key} failed: {source}")]
  Fetch {
    key: QueryKey,
    #[source]
    source: ApiError,
  },
  #[error("refetch task for {key} failed: {message}")]
  Task { key: QueryKey, message: String },
}

/// Handle on a background refetch started by `invalidate`.
///
/// Dropping it detaches the refetch; `wait` observes its outcome.
#[derive(Debug)]
pub struct Refetch {
  key: QueryKey,
  handle: Option<JoinHandle<Result<RefetchOutcome, CacheError>>>,
}

impl Refetch {
  pub async fn wait(self) -> Result<RefetchOutcome, CacheError> {
    let Some(handle) = self.handle else {
      return Ok(RefetchOutcome::NoFetcher);
    };

    match handle.await {
      Ok(result) => result,
      Err(e) if e.is_cancelled() => Ok(RefetchOutcome::Superseded),
      Err(e) => Err(CacheError::Task {
        key: self.key,
        message: e.to_string(),
      }),
    }
  }
}

struct Entry<V> {
  /// `None` means absent: never fetched, or restored to never-fetched
  value: Option<V>,
  stale: bool,
  /// Bumped whenever pending fetches are superseded
  generation: u64,
  in_flight: Option<AbortHandle>,
  last_error: Option<String>,
}

impl<V> Default for Entry<V> {
  fn default() -> Self {
    Self {
      value: None,
      stale: false,
      generation: 0,
      in_flight: None,
      last_error: None,
    }
  }
}

impl<V> Entry<V> {
  /// Abort the pending fetch (if any) and make any late response unusable
  fn supersede(&mut self, key: QueryKey) {
    self.generation += 1;
    if let Some(handle) = self.in_flight.take() {
      handle.abort();
      debug!(%key, generation = self.generation, "cancelled in-flight refetch");
    }
  }
}

struct Inner<V> {
  entries: Mutex<HashMap<QueryKey, Entry<V>>>,
  fetchers: RwLock<HashMap<QueryKey, Fetcher<V>>>,
}

/// Keyed store of fetched collections.
///
/// Cheap to clone; clones share the same entries. All operations are short
/// synchronous critical sections, the lock is never held across an await.
pub struct CacheStore<V> {
  inner: Arc<Inner<V>>,
}

impl<V> Clone for CacheStore<V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<V: Clone + Send + 'static> Default for CacheStore<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: Clone + Send + 'static> CacheStore<V> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        entries: Mutex::new(HashMap::new()),
        fetchers: RwLock::new(HashMap::new()),
      }),
    }
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<V>>> {
    self
      .inner
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Register the function used to refetch `key` after invalidation.
  pub fn register<F, Fut>(&self, key: QueryKey, fetcher: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
  {
    let fetcher: Fetcher<V> = Arc::new(move || fetcher().boxed());
    self
      .inner
      .fetchers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key, fetcher);
  }

  /// Last known value for `key`, or `None` if absent.
  pub fn get(&self, key: QueryKey) -> Option<V> {
    self.entries().get(&key).and_then(|e| e.value.clone())
  }

  /// Overwrite the value for `key` and mark it fresh.
  pub fn set(&self, key: QueryKey, value: V) {
    let mut entries = self.entries();
    let entry = entries.entry(key).or_default();
    entry.value = Some(value);
    entry.stale = false;
  }

  pub fn is_stale(&self, key: QueryKey) -> bool {
    self.entries().get(&key).map(|e| e.stale).unwrap_or(false)
  }

  pub fn is_fetching(&self, key: QueryKey) -> bool {
    self
      .entries()
      .get(&key)
      .map(|e| e.in_flight.is_some())
      .unwrap_or(false)
  }

  /// Message of the most recent failed refetch, cleared by the next success
  pub fn last_error(&self, key: QueryKey) -> Option<String> {
    self.entries().get(&key).and_then(|e| e.last_error.clone())
  }

  /// Abort any pending refetch for `key` so its response can't clobber a later write.
  pub fn cancel_in_flight(&self, key: QueryKey) {
    if let Some(entry) = self.entries().get_mut(&key) {
      entry.supersede(key);
    }
  }

  /// Mark `key` stale and refetch it in the background.
  ///
  /// Any refetch already in flight is superseded. Does not block; the returned
  /// handle reports the outcome to whoever wants it.
  pub fn invalidate(&self, key: QueryKey) -> Refetch {
    let fetcher = self
      .inner
      .fetchers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
      .cloned();

    let mut entries = self.entries();
    let entry = entries.entry(key).or_default();
    entry.stale = true;
    entry.supersede(key);

    let Some(fetcher) = fetcher else {
      debug!(%key, "invalidated key without a fetcher");
      return Refetch { key, handle: None };
    };

    let generation = entry.generation;
    let store = self.clone();
    let fetch = fetcher();
    let handle = tokio::spawn(async move {
      let result = fetch.await;
      store.complete(key, generation, result)
    });
    entry.in_flight = Some(handle.abort_handle());
    debug!(%key, generation, "refetch started");

    Refetch {
      key,
      handle: Some(handle),
    }
  }

  /// Refetch `key` if it is absent or stale and nothing is already loading it.
  ///
  /// A key whose last refetch failed is left alone until invalidated explicitly.
  pub fn ensure_fresh(&self, key: QueryKey) -> Option<Refetch> {
    let needs_fetch = {
      let entries = self.entries();
      match entries.get(&key) {
        None => true,
        Some(e) => {
          (e.value.is_none() || e.stale) && e.in_flight.is_none() && e.last_error.is_none()
        }
      }
    };

    needs_fetch.then(|| self.invalidate(key))
  }

  /// Cancel, snapshot and patch `key` as one step. Returns the snapshot.
  ///
  /// `patch` receives `None` when the key is absent.
  pub fn apply_optimistic<F>(&self, key: QueryKey, patch: F) -> Option<V>
  where
    F: FnOnce(Option<&V>) -> V,
  {
    let mut entries = self.entries();
    let entry = entries.entry(key).or_default();
    entry.supersede(key);

    let previous = entry.value.clone();
    entry.value = Some(patch(previous.as_ref()));
    entry.stale = false;
    previous
  }

  /// Put a snapshot back, whatever the current value is.
  ///
  /// A `None` snapshot restores the key to absent, not to an empty value.
  pub fn restore(&self, key: QueryKey, snapshot: Option<V>) {
    let mut entries = self.entries();
    let entry = entries.entry(key).or_default();
    entry.supersede(key);
    entry.stale = snapshot.is_none();
    entry.value = snapshot;
  }

  fn complete(
    &self,
    key: QueryKey,
    generation: u64,
    result: Result<V, ApiError>,
  ) -> Result<RefetchOutcome, CacheError> {
    let mut entries = self.entries();
    let entry = entries.entry(key).or_default();

    if entry.generation != generation {
      debug!(%key, generation, current = entry.generation, "discarding superseded response");
      return Ok(RefetchOutcome::Superseded);
    }
    entry.in_flight = None;

    match result {
      Ok(value) => {
        entry.value = Some(value);
        entry.stale = false;
        entry.last_error = None;
        debug!(%key, "refetch applied");
        Ok(RefetchOutcome::Applied)
      }
      Err(source) => {
        warn!(%key, error = %source, "refetch failed");
        entry.last_error = Some(source.to_string());
        Err(CacheError::Fetch { key, source })
      }
    }
  }
}
