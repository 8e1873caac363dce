use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for the room
#[derive(Debug, Default)]
pub struct RoomMetrics {
    sessions_joined: AtomicU64,
    sessions_left: AtomicU64,
    sessions_evicted: AtomicU64,
    moves_applied: AtomicU64,
    messages_dropped: AtomicU64,
}

impl RoomMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_join(&self) {
        self.sessions_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_leave(&self) {
        self.sessions_left.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.sessions_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_move(&self) {
        self.moves_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Inbound message discarded (protocol error or rejected command)
    pub fn record_drop(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_joined: self.sessions_joined.load(Ordering::Relaxed),
            sessions_left: self.sessions_left.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
            moves_applied: self.moves_applied.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sessions_joined: u64,
    pub sessions_left: u64,
    pub sessions_evicted: u64,
    pub moves_applied: u64,
    pub messages_dropped: u64,
}
