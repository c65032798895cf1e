//! Registry of renders currently in progress.
//!
//! The first caller for a key becomes its owner and renders; later callers
//! for the same key wait for the owner's outcome instead of rendering again.
//! Entries only live while their render does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rsend_models::CacheKey;
use tokio::sync::watch;

use crate::error::RenderError;

/// Outcome published by the owner of a render.
pub type RenderOutcome = Result<(), RenderError>;

type Registry = HashMap<CacheKey, watch::Receiver<Option<RenderOutcome>>>;

/// In-memory map of key to completion signal.
#[derive(Debug, Clone, Default)]
pub struct InFlightRenders {
    inner: Arc<Mutex<Registry>>,
}

/// Result of joining the registry for a key.
#[derive(Debug)]
pub enum Flight {
    /// Nobody is rendering this key; the caller must.
    Owner(FlightGuard),
    /// Another caller is rendering; wait on it.
    Waiter(FlightWaiter),
}

impl InFlightRenders {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // The map stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Become the owner of `key` or get a handle on the current owner.
    ///
    /// Check-and-insert happens under one lock, so exactly one concurrent
    /// caller becomes the owner.
    pub fn join(&self, key: &CacheKey) -> Flight {
        let mut map = self.lock();

        if let Some(rx) = map.get(key) {
            return Flight::Waiter(FlightWaiter { rx: rx.clone() });
        }

        let (tx, rx) = watch::channel(None);
        map.insert(key.clone(), rx);

        Flight::Owner(FlightGuard {
            key: key.clone(),
            tx,
            registry: self.inner.clone(),
        })
    }

    /// Number of renders in progress.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }
}

/// Ownership of one in-progress render.
///
/// Dropping the guard removes the entry. If no outcome was published (the
/// owner was cancelled) waiters see the flight as abandoned.
#[derive(Debug)]
pub struct FlightGuard {
    key: CacheKey,
    tx: watch::Sender<Option<RenderOutcome>>,
    registry: Arc<Mutex<Registry>>,
}

impl FlightGuard {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Publish the outcome to every waiter and release the key.
    pub fn complete(self, outcome: RenderOutcome) {
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(&self.key);
    }
}

/// Handle on someone else's render.
#[derive(Debug)]
pub struct FlightWaiter {
    rx: watch::Receiver<Option<RenderOutcome>>,
}

impl FlightWaiter {
    /// Wait for the owner to finish.
    ///
    /// `None` means the owner went away without an outcome; the caller should
    /// look at the cache again and possibly take over.
    pub async fn wait(mut self) -> Option<RenderOutcome> {
        loop {
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                // Sender gone; it may still have published just before.
                return self.rx.borrow().clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_string(s)
    }

    #[tokio::test]
    async fn test_first_caller_owns() {
        let registry = InFlightRenders::new();
        let owner = registry.join(&key("a.jpg"));
        assert!(matches!(owner, Flight::Owner(_)));
        assert!(matches!(registry.join(&key("a.jpg")), Flight::Waiter(_)));
        assert!(matches!(registry.join(&key("b.jpg")), Flight::Owner(_)));
    }

    #[tokio::test]
    async fn test_waiters_receive_outcome_and_entry_is_removed() {
        let registry = InFlightRenders::new();
        let Flight::Owner(guard) = registry.join(&key("a.jpg")) else {
            panic!("expected owner");
        };
        let Flight::Waiter(waiter) = registry.join(&key("a.jpg")) else {
            panic!("expected waiter");
        };

        let handle = tokio::spawn(waiter.wait());
        guard.complete(Err(RenderError::render_failed("boom")));

        assert_eq!(
            handle.await.unwrap(),
            Some(Err(RenderError::render_failed("boom")))
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_owner_releases_waiters() {
        let registry = InFlightRenders::new();
        let Flight::Owner(guard) = registry.join(&key("a.jpg")) else {
            panic!("expected owner");
        };
        let Flight::Waiter(waiter) = registry.join(&key("a.jpg")) else {
            panic!("expected waiter");
        };

        drop(guard);
        assert_eq!(waiter.wait().await, None);
        assert!(!registry.contains(&key("a.jpg")));
        assert!(matches!(registry.join(&key("a.jpg")), Flight::Owner(_)));
    }

    #[tokio::test]
    async fn test_late_waiter_sees_published_outcome() {
        let registry = InFlightRenders::new();
        let Flight::Owner(guard) = registry.join(&key("a.jpg")) else {
            panic!("expected owner");
        };
        let Flight::Waiter(waiter) = registry.join(&key("a.jpg")) else {
            panic!("expected waiter");
        };
        guard.complete(Ok(()));
        assert_eq!(waiter.wait().await, Some(Ok(())));
    }
}
