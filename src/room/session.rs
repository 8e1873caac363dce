use crate::protocol::ServerMessage;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identity of one connected client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a message could not be queued for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Receiving side is gone (socket task ended)
    Closed,
    /// Outbound queue is at capacity
    Full,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "session outbound queue closed"),
            DeliveryError::Full => write!(f, "session outbound queue full"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// A session that has connected but not yet joined the room.
///
/// Holds the only sender of the session's outbound queue. Joining moves the
/// handle into the registry, so once the registry drops it (leave or
/// eviction) the receiving task observes a closed queue, and the same handle
/// can never join again.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<ServerMessage>,
}

impl SessionHandle {
    /// Create a handle with a bounded outbound queue of `buffer` messages
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: SessionId::new(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue a message without waiting
    pub(crate) fn try_deliver(&self, message: ServerMessage) -> Result<(), DeliveryError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
