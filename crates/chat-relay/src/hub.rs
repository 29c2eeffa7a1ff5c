//! Broadcast hub shared by all relay connections.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chat_core::ChatMessage;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Default per-client buffer before a slow client starts lagging.
pub const DEFAULT_CAPACITY: usize = 1024;

struct Inner {
    sender: broadcast::Sender<ChatMessage>,
    clients: AtomicUsize,
}

/// Fan-out of chat messages to every registered client.
///
/// Cheap to clone; clones share the same clients.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Hub {
    /// Create a hub buffering up to `capacity` messages per client.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                sender,
                clients: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a client.
    ///
    /// The stream yields every message broadcast after this call. The client
    /// stays counted until the returned [`Registration`] is dropped.
    #[must_use]
    pub fn register(&self) -> (Registration, BroadcastStream<ChatMessage>) {
        let receiver = self.inner.sender.subscribe();
        self.inner.clients.fetch_add(1, Ordering::SeqCst);
        let registration = Registration {
            id: Uuid::new_v4(),
            hub: self.clone(),
        };
        (registration, BroadcastStream::new(receiver))
    }

    /// Send `msg` to every registered client. Returns how many were reached.
    pub fn broadcast(&self, msg: ChatMessage) -> usize {
        self.inner.sender.send(msg).unwrap_or(0)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.clients.load(Ordering::SeqCst)
    }
}

/// A client's membership in a [`Hub`].
pub struct Registration {
    id: Uuid,
    hub: Hub,
}

impl Registration {
    /// Client identifier, for logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.hub.inner.clients.fetch_sub(1, Ordering::SeqCst);
    }
}
