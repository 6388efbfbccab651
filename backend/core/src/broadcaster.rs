//! Live event fanout to connected dashboard viewers.
//!
//! Every viewer gets its own bounded channel. Delivery is best-effort: a
//! viewer whose channel is full simply misses the event, and the ingesting
//! caller never waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, trace};

use crate::event::Event;

/// Default per-listener channel capacity.
pub const DEFAULT_LISTENER_CAPACITY: usize = 32;

/// Identifier of a registered listener. Never reused within one broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    senders: HashMap<ListenerId, mpsc::Sender<Arc<Event>>>,
}

/// Registry of active viewer connections.
///
/// Cloning is cheap and shares the same registry. One broadcaster is built
/// per server instance and handed to handlers through application state.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LISTENER_CAPACITY)
    }

    /// Create a broadcaster whose listener channels hold `capacity` events.
    /// The minimum capacity is 1 (clamped).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    // Registry updates are single map operations, so a panic elsewhere
    // cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new listener and return its receiving end.
    pub fn add_listener(&self) -> Listener {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = {
            let mut registry = self.lock();
            let id = ListenerId(registry.next_id);
            registry.next_id += 1;
            registry.senders.insert(id, tx);
            id
        };
        debug!(listener_id = %id, "Listener registered");

        Listener {
            id,
            receiver: rx,
            broadcaster: self.clone(),
        }
    }

    /// Remove a listener. Unknown or already removed ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        let removed = self.lock().senders.remove(&id).is_some();
        if removed {
            debug!(listener_id = %id, "Listener removed");
        }
    }

    /// Offer `event` to every registered listener without waiting.
    ///
    /// The registry lock is held only while the current senders are copied
    /// out. Returns the number of listeners that accepted the event.
    pub fn send(&self, event: Arc<Event>) -> usize {
        let targets: Vec<(ListenerId, mpsc::Sender<Arc<Event>>)> = self
            .lock()
            .senders
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in &targets {
            match tx.try_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(listener_id = %id, "Listener busy, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(listener_id = %id, "Listener closed, event dropped");
                }
            }
        }

        debug!(listeners = targets.len(), delivered, "Event broadcast");
        delivered
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Ids of the currently registered listeners, in ascending order.
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        let mut ids: Vec<ListenerId> = self.lock().senders.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of one viewer's delivery channel.
///
/// Dropping the listener removes it from the broadcaster's registry.
pub struct Listener {
    id: ListenerId,
    receiver: mpsc::Receiver<Arc<Event>>,
    broadcaster: Broadcaster,
}

impl Listener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next event. Returns `None` once the listener has been
    /// removed from the registry and its buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.receiver.recv().await
    }

    /// Take a buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<Arc<Event>, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.broadcaster.remove_listener(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::collections::HashSet;
    use std::time::Duration;

    fn event(origin: &str) -> Arc<Event> {
        Arc::new(Event::new(origin, EventType::Event, "body", "owner"))
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let broadcaster = Broadcaster::new();
        let a = broadcaster.add_listener();
        let b = broadcaster.add_listener();
        assert_eq!(a.id().as_u64(), 0);
        assert_eq!(b.id().as_u64(), 1);

        drop(a);
        let c = broadcaster.add_listener();
        assert_eq!(c.id().as_u64(), 2);
        assert_eq!(broadcaster.listener_ids(), vec![b.id(), c.id()]);
    }

    #[test]
    fn test_remove_listener_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let listener = broadcaster.add_listener();
        let id = listener.id();

        broadcaster.remove_listener(id);
        broadcaster.remove_listener(id);
        broadcaster.remove_listener(ListenerId(99));
        assert_eq!(broadcaster.listener_count(), 0);

        // Dropping after explicit removal is also a no-op.
        drop(listener);
        assert_eq!(broadcaster.listener_count(), 0);
    }

    #[test]
    fn test_fanout_delivers_once_to_each_listener() {
        let broadcaster = Broadcaster::new();
        let mut listeners: Vec<Listener> = (0..5).map(|_| broadcaster.add_listener()).collect();

        let delivered = broadcaster.send(event("cron"));
        assert_eq!(delivered, 5);

        for listener in &mut listeners {
            let received = listener.try_recv().unwrap();
            assert_eq!(received.origin, "cron");
            assert!(matches!(listener.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[test]
    fn test_blocked_listener_drops_without_affecting_others() {
        let broadcaster = Broadcaster::with_capacity(1);
        let mut stalled = broadcaster.add_listener();
        let mut healthy = broadcaster.add_listener();

        assert_eq!(broadcaster.send(event("first")), 2);
        assert_eq!(healthy.try_recv().unwrap().origin, "first");

        // `stalled` never consumed, so its single slot is still taken.
        assert_eq!(broadcaster.send(event("second")), 1);
        assert_eq!(healthy.try_recv().unwrap().origin, "second");

        assert_eq!(stalled.try_recv().unwrap().origin, "first");
        assert!(matches!(stalled.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(broadcaster.listener_count(), 2);
    }

    #[test]
    fn test_send_without_listeners() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.send(event("nobody")), 0);
    }

    #[test]
    fn test_removed_listener_sees_end_of_stream() {
        let broadcaster = Broadcaster::new();
        let mut listener = broadcaster.add_listener();
        broadcaster.send(event("last"));
        broadcaster.remove_listener(listener.id());

        assert_eq!(listener.try_recv().unwrap().origin, "last");
        assert!(matches!(listener.try_recv(), Err(TryRecvError::Disconnected)));
        assert_eq!(broadcaster.send(event("after")), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_keeps_registry_exact() {
        let broadcaster = Broadcaster::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let broadcaster = broadcaster.clone();
            handles.push(tokio::spawn(async move {
                let listener = broadcaster.add_listener();
                broadcaster.send(event("churn"));
                let id = listener.id();
                if i % 2 == 0 {
                    drop(listener);
                    return None;
                }
                Some((id, listener))
            }));
        }

        let mut kept = Vec::new();
        for handle in handles {
            if let Some(pair) = handle.await.unwrap() {
                kept.push(pair);
            }
        }

        let expected: HashSet<ListenerId> = kept.iter().map(|(id, _)| *id).collect();
        let actual: HashSet<ListenerId> = broadcaster.listener_ids().into_iter().collect();
        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 16);

        // All 32 ids were distinct.
        let next = broadcaster.add_listener();
        assert_eq!(next.id().as_u64(), 32);
    }

    #[tokio::test]
    async fn test_send_returns_promptly_with_stalled_listener() {
        let broadcaster = Broadcaster::with_capacity(1);
        let _stalled = broadcaster.add_listener();
        broadcaster.send(event("fill"));

        let result = tokio::time::timeout(Duration::from_millis(100), async {
            broadcaster.send(event("overflow"))
        })
        .await;
        assert_eq!(result.unwrap(), 0);
    }
}
