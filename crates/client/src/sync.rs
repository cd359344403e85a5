//! Cross-tab change delivery.
//!
//! Storage events are invalidation signals: a receiver reacts by re-reading
//! storage, never by applying data from the event. That makes handling
//! idempotent, so duplicated or collapsed events are harmless.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::storage::{EventOrigin, StorageEvent, TabId};

/// A tab's view of storage events, excluding the tab's own writes.
///
/// If the tab falls too far behind, the missed events collapse into one
/// event invalidating every key.
pub struct ChangeFeed {
    tab: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl ChangeFeed {
    pub(crate) const fn new(tab: TabId, rx: broadcast::Receiver<StorageEvent>) -> Self {
        Self { tab, rx }
    }

    /// Wait for the next foreign event.
    ///
    /// Returns `None` once the storage area has been dropped.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.is_own(&event) => {}
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => return Some(self.lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next foreign event if one is already queued.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.is_own(&event) => {}
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => return Some(self.lagged(skipped)),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    fn is_own(&self, event: &StorageEvent) -> bool {
        event.origin == EventOrigin::Tab(self.tab)
    }

    fn lagged(&self, skipped: u64) -> StorageEvent {
        debug!(tab = %self.tab, skipped, "Change feed lagged, invalidating all keys");
        StorageEvent::everything(EventOrigin::External)
    }
}

/// Handle on a background listener.
///
/// Delivery stops on [`Subscription::unsubscribe`] or when the handle is
/// dropped.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(future)),
        }
    }

    /// Stop delivering events.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Whether the listener is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::storage::{StorageArea, keys};

    #[tokio::test]
    async fn test_recv_skips_own_events() {
        let area = StorageArea::in_memory();
        let tab = area.open_tab();
        let other = area.open_tab();
        let mut feed = tab.changes();

        tab.set_item(keys::ROLE, "admin").unwrap();
        other.set_item(keys::CART, "[]").unwrap();

        let event = feed.recv().await.unwrap();
        assert_eq!(event.key.as_deref(), Some(keys::CART));
        assert_eq!(feed.try_recv(), None);
    }

    #[tokio::test]
    async fn test_lag_collapses_into_full_invalidation() {
        let area = StorageArea::in_memory();
        let writer = area.open_tab();
        let mut feed = area.open_tab().changes();

        for i in 0..200 {
            writer.set_item(keys::CART, &i.to_string()).unwrap();
        }

        let event = feed.try_recv().unwrap();
        assert_eq!(event, StorageEvent::everything(EventOrigin::External));
    }

    #[tokio::test]
    async fn test_recv_ends_when_area_dropped() {
        let area = StorageArea::in_memory();
        let mut feed = area.open_tab().changes();
        drop(area);
        assert_eq!(feed.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let area = StorageArea::in_memory();
        let listener = area.open_tab();
        let writer = area.open_tab();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let subscription = listener.on_external_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(subscription.is_active());

        writer.set_item(keys::CART, "[]").unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while seen.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        subscription.unsubscribe();
        tokio::task::yield_now().await;
        writer.set_item(keys::CART, "[1]").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
