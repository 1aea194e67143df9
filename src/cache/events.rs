//! Change notifications for cache observers
//!
//! Every state change of an entry is broadcast; observers filter by key.

use crate::core::error::FetchError;
use tokio::sync::broadcast;

// =============================================================================
// EVENT TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent<K> {
    /// A fetch for the key started (cold or background)
    Fetching { key: K },
    /// A fetch succeeded, or a value was written directly
    Updated { key: K },
    /// A fetch attempt failed; `retries_remaining` more will follow
    Retrying { key: K, retries_remaining: u32 },
    /// Retries exhausted, the error is attached to the entry
    Failed { key: K, error: FetchError },
    /// Marked stale on request
    Invalidated { key: K },
    /// Dropped after idling past its eviction window, or removed
    Evicted { key: K },
    /// Every entry was dropped
    Cleared,
}

impl<K: PartialEq> CacheEvent<K> {
    /// Whether this event concerns `key`. `Cleared` concerns everyone.
    pub fn concerns(&self, key: &K) -> bool {
        match self {
            CacheEvent::Fetching { key: k }
            | CacheEvent::Updated { key: k }
            | CacheEvent::Retrying { key: k, .. }
            | CacheEvent::Failed { key: k, .. }
            | CacheEvent::Invalidated { key: k }
            | CacheEvent::Evicted { key: k } => k == key,
            CacheEvent::Cleared => true,
        }
    }
}

// =============================================================================
// EVENT BROADCASTER
// =============================================================================

#[derive(Clone)]
pub struct CacheEvents<K> {
    sender: broadcast::Sender<CacheEvent<K>>,
}

impl<K: Clone> CacheEvents<K> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of receivers that got the event
    pub fn broadcast(&self, event: CacheEvent<K>) -> usize {
        // send() returns Err if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<K>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn fetching(&self, key: &K) {
        self.broadcast(CacheEvent::Fetching { key: key.clone() });
    }

    pub fn updated(&self, key: &K) {
        self.broadcast(CacheEvent::Updated { key: key.clone() });
    }

    pub fn retrying(&self, key: &K, retries_remaining: u32) {
        self.broadcast(CacheEvent::Retrying {
            key: key.clone(),
            retries_remaining,
        });
    }

    pub fn failed(&self, key: &K, error: &FetchError) {
        self.broadcast(CacheEvent::Failed {
            key: key.clone(),
            error: error.clone(),
        });
    }

    pub fn invalidated(&self, key: &K) {
        self.broadcast(CacheEvent::Invalidated { key: key.clone() });
    }

    pub fn evicted(&self, key: &K) {
        self.broadcast(CacheEvent::Evicted { key: key.clone() });
    }

    pub fn cleared(&self) {
        self.broadcast(CacheEvent::Cleared);
    }
}

impl<K: Clone> Default for CacheEvents<K> {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let events = CacheEvents::new(16);
        let mut rx = events.subscribe();

        events.updated(&"summary");

        let event = rx.recv().await.unwrap();
        assert!(event.concerns(&"summary"));
        assert!(!event.concerns(&"wallet"));
    }

    #[test]
    fn test_no_subscribers() {
        let events: CacheEvents<&str> = CacheEvents::new(16);
        assert_eq!(events.broadcast(CacheEvent::Cleared), 0);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn test_cleared_concerns_every_key() {
        assert!(CacheEvent::<&str>::Cleared.concerns(&"anything"));
    }
}
