use crate::protocol::ServerMessage;
use crate::room::session::{DeliveryError, SessionHandle, SessionId};
use dashmap::DashMap;
use tracing::warn;

/// Result of a fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the message was queued for
    pub delivered: usize,
    /// Sessions removed because their queue was closed or full
    pub evicted: Vec<SessionId>,
}

/// Membership set of one room.
///
/// Delivery never blocks: each member is sent to with `try_send`, and a
/// member whose queue is closed or full is evicted rather than waited on.
pub struct RoomRegistry {
    members: DashMap<SessionId, SessionHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
        }
    }

    /// Add a session to the room. Re-joining the same id replaces the entry.
    pub fn join(&self, session: SessionHandle) -> SessionId {
        let id = session.id();
        self.members.insert(id, session);
        id
    }

    /// Remove a session. Returns false if it was not a member.
    pub fn leave(&self, id: &SessionId) -> bool {
        self.members.remove(id).is_some()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Queue a private message for one member, evicting it on failure
    pub fn send_to(&self, id: &SessionId, message: ServerMessage) -> Result<(), DeliveryError> {
        let result = match self.members.get(id) {
            Some(session) => session.try_deliver(message),
            None => Err(DeliveryError::Closed),
        };

        if let Err(e) = result {
            // Guard from `get` is dropped above; removing while holding it would deadlock
            if self.leave(id) {
                warn!(session_id = %id, error = %e, "Evicted session on private send");
            }
        }
        result
    }

    /// Queue `message` for every current member
    pub fn broadcast(&self, message: &ServerMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for entry in self.members.iter() {
            match entry.value().try_deliver(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(session_id = %entry.key(), error = %e, "Dropping session from room");
                    report.evicted.push(*entry.key());
                }
            }
        }

        for id in &report.evicted {
            self.members.remove(id);
        }

        report
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
