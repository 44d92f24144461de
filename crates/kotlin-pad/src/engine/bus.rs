//! Named output channels with idempotent subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::debug;

type Listeners = HashMap<u64, mpsc::UnboundedSender<String>>;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    channels: HashMap<String, Listeners>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out of string chunks to every live listener of a channel.
///
/// Each listener has its own unbounded queue, so a slow consumer never
/// loses chunks and emission order is preserved per listener.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. It receives every chunk emitted after this returns.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .channels
                .entry(channel.to_string())
                .or_default()
                .insert(id, tx);
            id
        };
        debug!(channel, id, "listener attached");

        Subscription {
            channel: channel.to_string(),
            id,
            rx,
            registry: Some(Arc::downgrade(&self.registry)),
        }
    }

    /// Deliver a chunk to all listeners; returns how many received it
    pub fn emit(&self, channel: &str, chunk: impl Into<String>) -> usize {
        let chunk = chunk.into();
        let mut registry = lock(&self.registry);
        let Some(listeners) = registry.channels.get_mut(channel) else {
            return 0;
        };
        listeners.retain(|_, tx| tx.send(chunk.clone()).is_ok());
        listeners.len()
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        lock(&self.registry)
            .channels
            .get(channel)
            .map_or(0, |listeners| listeners.len())
    }
}

/// A live listener on one channel. Released by [`Subscription::unsubscribe`]
/// or on drop, whichever comes first; releasing twice is a no-op.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<String>,
    registry: Option<Weak<Mutex<Registry>>>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }

    /// Wait for the next chunk. Chunks already queued are still returned
    /// after unsubscribing; `None` once the queue is drained and closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take a queued chunk without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(&mut self) {
        let Some(registry) = self.registry.take() else {
            return;
        };
        if let Some(registry) = registry.upgrade() {
            let mut registry = lock(&registry);
            if let Some(listeners) = registry.channels.get_mut(&self.channel) {
                listeners.remove(&self.id);
                if listeners.is_empty() {
                    registry.channels.remove(&self.channel);
                }
            }
        }
        self.rx.close();
        debug!(channel = %self.channel, id = self.id, "listener released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_then_unsubscribe_leaves_no_listener() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("out");
        assert_eq!(bus.listener_count("out"), 1);

        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(bus.listener_count("out"), 0);

        // Second release is harmless
        sub.unsubscribe();
        assert_eq!(bus.listener_count("out"), 0);
        assert_eq!(bus.emit("out", "late"), 0);
    }

    #[test]
    fn test_drop_releases_listener() {
        let bus = EventBus::new();
        {
            let _sub = bus.subscribe("out");
            assert_eq!(bus.listener_count("out"), 1);
        }
        assert_eq!(bus.listener_count("out"), 0);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("out");
        drop(bus);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_chunks_arrive_in_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("out");
        bus.emit("out", "A");
        bus.emit("out", "B");
        bus.emit("other", "X");
        assert_eq!(sub.try_recv().as_deref(), Some("A"));
        assert_eq!(sub.try_recv().as_deref(), Some("B"));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_emit_before_subscribe_is_not_seen() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("out", "early"), 0);
        let mut sub = bus.subscribe("out");
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_fan_out_to_all_listeners() {
        let bus = EventBus::new();
        let mut a = bus.subscribe("out");
        let mut b = bus.subscribe("out");
        assert_eq!(bus.emit("out", "hi"), 2);
        assert_eq!(a.try_recv().as_deref(), Some("hi"));
        assert_eq!(b.try_recv().as_deref(), Some("hi"));
    }

    #[test]
    fn test_queued_chunks_survive_unsubscribe() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("out");
        bus.emit("out", "kept");
        sub.unsubscribe();
        assert_eq!(sub.try_recv().as_deref(), Some("kept"));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_recv_waits_for_chunk() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("out");
        let emitter = bus.clone();
        tokio::spawn(async move {
            emitter.emit("out", "later");
        });
        assert_eq!(sub.recv().await.as_deref(), Some("later"));
    }
}
