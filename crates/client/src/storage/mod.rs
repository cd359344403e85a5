//! Durable key/value storage shared by every tab of the application.
//!
//! # Model
//!
//! A [`StorageArea`] is one origin's storage: a string key/value
//! [`StorageBackend`] plus a broadcast channel of [`StorageEvent`]s. Each
//! open tab (window, process, test fixture) holds a [`Tab`] handle on the
//! area. Writes through a tab go straight to the backend and then raise an
//! event tagged with the writing tab, so every *other* tab can re-read.
//!
//! Events carry only the key that changed, never the value. Receivers always
//! re-read the backend, which makes the backend the single source of truth
//! and the last writer the winner.
//!
//! # Backends
//!
//! - [`MemoryBackend`] - in-process map, optional byte quota
//! - [`FileBackend`] - one JSON document on disk, shareable between processes
//!
//! Changes made by other processes are not broadcast by anyone; use
//! [`StorageArea::spawn_poller`] to diff the backend periodically and raise
//! external events for them.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::sync::{ChangeFeed, Subscription};

/// Persisted keys. Names match the ones the web client has always used so
/// existing browser data stays readable.
pub mod keys {
    /// Login flag: `"true"` or absent.
    pub const LOGGED_IN: &str = "isLoggedIn";

    /// Role name of the logged-in user.
    pub const ROLE: &str = "userRole";

    /// JSON array of cart line items.
    pub const CART: &str = "cart";

    /// Bearer token returned by the backend login endpoint.
    pub const TOKEN: &str = "token";

    /// Order awaiting payment confirmation, set by checkout.
    pub const PENDING_ORDER: &str = "pendingOrder";
}

/// Number of undelivered events a tab may fall behind before its feed lags.
const EVENT_CAPACITY: usize = 64;

/// Errors raised by storage backends.
///
/// None of these are recovered locally: a store that cannot persist would
/// silently lose data, so callers surface them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the backend's quota.
    #[error("storage quota exceeded writing {key} (limit {limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },

    /// The backend is disabled or otherwise unusable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document is not a JSON object of strings.
    #[error("storage document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A string key/value store.
///
/// Implementations must be safe to share between tabs; every call sees the
/// latest committed state.
pub trait StorageBackend: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every key/value pair currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError>;
}

/// Identifies one tab within a storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Where a storage change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    /// A write through a tab of this area.
    Tab(TabId),
    /// A change detected outside any tab (another process, a test).
    External,
}

/// Cache-invalidation signal raised after storage changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The changed key; `None` means any key may have changed.
    pub key: Option<String>,
    pub origin: EventOrigin,
}

impl StorageEvent {
    /// An event invalidating every key.
    #[must_use]
    pub const fn everything(origin: EventOrigin) -> Self {
        Self { key: None, origin }
    }

    /// Whether a reader of `key` must reload after this event.
    #[must_use]
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|changed| changed == key)
    }
}

/// One origin's storage, shared by all of its tabs.
///
/// Cheaply cloneable; clones refer to the same area.
#[derive(Clone)]
pub struct StorageArea {
    inner: Arc<StorageAreaInner>,
}

struct StorageAreaInner {
    backend: Box<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    next_tab: AtomicU64,
    /// Backend contents as of the last write or poll, for change detection.
    last_seen: Mutex<BTreeMap<String, String>>,
}

impl StorageArea {
    /// Create an area over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let last_seen = backend.snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read initial storage snapshot");
            BTreeMap::new()
        });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(StorageAreaInner {
                backend: Box::new(backend),
                events,
                next_tab: AtomicU64::new(1),
                last_seen: Mutex::new(last_seen),
            }),
        }
    }

    /// Create an area backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Create an area backed by a JSON document at `path`.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    /// Open a new tab on this area.
    #[must_use]
    pub fn open_tab(&self) -> Tab {
        let id = TabId(self.inner.next_tab.fetch_add(1, Ordering::Relaxed));
        debug!(tab = %id, "Opened tab");
        Tab {
            id,
            area: self.clone(),
        }
    }

    /// Raise an event for a change made outside any tab.
    pub fn notify_external(&self, key: Option<String>) {
        self.publish(StorageEvent {
            key,
            origin: EventOrigin::External,
        });
    }

    /// Compare the backend with the last-known contents and raise an
    /// external event for every key that differs.
    ///
    /// Returns the number of changed keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn poll_backend(&self) -> Result<usize, StorageError> {
        let current = self.inner.backend.snapshot()?;

        let changed: Vec<String> = {
            let mut last_seen = self
                .inner
                .last_seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let mut changed: Vec<String> = current
                .iter()
                .filter(|(key, value)| last_seen.get(*key) != Some(*value))
                .map(|(key, _)| key.clone())
                .collect();
            changed.extend(
                last_seen
                    .keys()
                    .filter(|key| !current.contains_key(*key))
                    .cloned(),
            );

            *last_seen = current;
            changed
        };

        for key in &changed {
            debug!(key = %key, "External storage change detected");
            self.notify_external(Some(key.clone()));
        }
        Ok(changed.len())
    }

    /// Poll the backend for external changes every `interval`.
    ///
    /// Must be called within a Tokio runtime. Polling stops when the returned
    /// subscription is dropped or unsubscribed.
    #[must_use]
    pub fn spawn_poller(&self, interval: Duration) -> Subscription {
        let area = self.clone();
        Subscription::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = area.poll_backend() {
                    warn!(error = %e, "Storage poll failed");
                }
            }
        })
    }

    fn publish(&self, event: StorageEvent) {
        // No receivers simply means no other tab is listening.
        let _ = self.inner.events.send(event);
    }

    fn record(&self, key: &str, value: Option<&str>) {
        let mut last_seen = self
            .inner
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(value) => {
                last_seen.insert(key.to_owned(), value.to_owned());
            }
            None => {
                last_seen.remove(key);
            }
        }
    }
}

/// A tab's handle on a storage area.
///
/// Reads and writes are synchronous and go straight to the backend.
#[derive(Clone)]
pub struct Tab {
    id: TabId,
    area: StorageArea,
}

impl Tab {
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    #[must_use]
    pub const fn area(&self) -> &StorageArea {
        &self.area
    }

    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.area.inner.backend.read(key)
    }

    /// Write a value and notify other tabs.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted; no event is raised.
    #[instrument(skip(self, value), fields(tab = %self.id))]
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.area.inner.backend.write(key, value)?;
        self.area.record(key, Some(value));
        self.notify(key);
        Ok(())
    }

    /// Delete a value and notify other tabs.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified; no event is raised.
    #[instrument(skip(self), fields(tab = %self.id))]
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.area.inner.backend.remove(key)?;
        self.area.record(key, None);
        self.notify(key);
        Ok(())
    }

    /// A feed of changes made by anyone other than this tab.
    #[must_use]
    pub fn changes(&self) -> ChangeFeed {
        ChangeFeed::new(self.id, self.area.inner.events.subscribe())
    }

    /// Run `handler` for every change made by anyone other than this tab.
    ///
    /// Events are delivered one at a time, in order, on a single Tokio task.
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn on_external_change<F>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(&StorageEvent) + Send + 'static,
    {
        let mut feed = self.changes();
        Subscription::spawn(async move {
            while let Some(event) = feed.recv().await {
                handler(&event);
            }
        })
    }

    fn notify(&self, key: &str) {
        self.area.publish(StorageEvent {
            key: Some(key.to_owned()),
            origin: EventOrigin::Tab(self.id),
        });
    }
}

impl std::fmt::Debug for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tab").field("id", &self.id).finish_non_exhaustive()
    }
}
