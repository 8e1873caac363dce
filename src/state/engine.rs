use crate::config::{OutOfRangePolicy, RoomConfig};
use crate::protocol::{parse_command, Command, MoveCommand, ProtocolError, ServerMessage};
use crate::room::{RoomMetrics, RoomRegistry, SessionHandle, SessionId};
use crate::state::unit::{Position, UnitTable};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Errors from handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Protocol(ProtocolError),
    UnitIdOutOfRange { unit_id: u64, max: u64 },
    /// Session already left or was evicted
    NotJoined,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Protocol(e) => write!(f, "{}", e),
            CommandError::UnitIdOutOfRange { unit_id, max } => {
                write!(f, "unit_id {} exceeds maximum {}", unit_id, max)
            }
            CommandError::NotJoined => write!(f, "session is not joined to the room"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ProtocolError> for CommandError {
    fn from(e: ProtocolError) -> Self {
        CommandError::Protocol(e)
    }
}

/// What an accepted message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Move applied and fanned out to `delivered` sessions
    Broadcast { unit_id: u64, delivered: usize },
    /// Well-formed message with a tag the room does not handle
    Ignored(String),
}

struct RoomTable {
    units: UnitTable,
    last_move_at: Option<DateTime<Utc>>,
}

/// Authoritative room state.
///
/// The unit table sits behind one mutex. Joins that need a consistent
/// snapshot and moves that need ordered fan-out both run under it; fan-out
/// itself only does non-blocking queue sends, so holding the lock across it
/// keeps every session's queue in commit order.
pub struct SyncCore {
    config: RoomConfig,
    table: Mutex<RoomTable>,
    registry: RoomRegistry,
    metrics: RoomMetrics,
}

impl SyncCore {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            table: Mutex::new(RoomTable {
                units: UnitTable::new(),
                last_move_at: None,
            }),
            registry: RoomRegistry::new(),
            metrics: RoomMetrics::new(),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &RoomMetrics {
        &self.metrics
    }

    fn lock_table(&self) -> MutexGuard<'_, RoomTable> {
        // A panic mid-update leaves at worst one overwritten entry; keep serving
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the room and queue the `init` snapshot for the new session
    pub fn on_connect(&self, session: SessionHandle) -> SessionId {
        let table = self.lock_table();

        let id = self.registry.join(session);
        let init = ServerMessage::Init {
            units: table.units.snapshot(),
        };
        let units = table.units.len();

        match self.registry.send_to(&id, init) {
            Ok(()) => {
                self.metrics.record_join();
                info!(session_id = %id, room = %self.config.name, units, "Session joined room");
            }
            Err(e) => {
                self.metrics.record_evictions(1);
                warn!(session_id = %id, error = %e, "Failed to deliver init snapshot");
            }
        }

        id
    }

    /// Leave the room. Safe to call more than once.
    pub fn on_disconnect(&self, id: SessionId) {
        if self.registry.leave(&id) {
            self.metrics.record_leave();
            info!(session_id = %id, room = %self.config.name, "Session left room");
        }
    }

    /// Handle one raw text frame from `id`
    pub fn on_message(&self, id: SessionId, raw: &str) -> Result<Dispatch, CommandError> {
        let result = parse_command(raw)
            .map_err(CommandError::from)
            .and_then(|command| self.dispatch(id, command));

        if let Err(ref e) = result {
            self.metrics.record_drop();
            debug!(session_id = %id, error = %e, "Dropped client message");
        }
        result
    }

    fn dispatch(&self, id: SessionId, command: Command) -> Result<Dispatch, CommandError> {
        match command {
            Command::Move(cmd) => self.apply_move(id, cmd),
            Command::Unrecognized(tag) => {
                debug!(session_id = %id, tag = %tag, "Ignoring unrecognized message type");
                Ok(Dispatch::Ignored(tag))
            }
        }
    }

    /// Commit a move and broadcast it to every joined session
    pub fn apply_move(&self, id: SessionId, cmd: MoveCommand) -> Result<Dispatch, CommandError> {
        let index = self.check_unit_id(cmd.unit_id)?;

        let mut table = self.lock_table();

        if !self.registry.contains(&id) {
            return Err(CommandError::NotJoined);
        }

        table.units.set(index, cmd.position());
        table.last_move_at = Some(Utc::now());
        self.metrics.record_move();

        let report = self.registry.broadcast(&ServerMessage::from(cmd));
        drop(table);

        if !report.evicted.is_empty() {
            self.metrics.record_evictions(report.evicted.len());
        }

        Ok(Dispatch::Broadcast {
            unit_id: cmd.unit_id,
            delivered: report.delivered,
        })
    }

    fn check_unit_id(&self, unit_id: u64) -> Result<usize, CommandError> {
        let out_of_range = CommandError::UnitIdOutOfRange {
            unit_id,
            max: self.config.max_unit_id,
        };
        if unit_id > self.config.max_unit_id {
            return Err(out_of_range);
        }
        // The table holds index + 1 entries, so usize::MAX itself is unaddressable
        match usize::try_from(unit_id) {
            Ok(index) if index < usize::MAX => Ok(index),
            _ => Err(out_of_range),
        }
    }

    /// Whether `err` should end the session that caused it
    pub fn should_disconnect(&self, err: &CommandError) -> bool {
        match err {
            CommandError::Protocol(_) => false,
            CommandError::UnitIdOutOfRange { .. } => {
                self.config.out_of_range == OutOfRangePolicy::Disconnect
            }
            CommandError::NotJoined => true,
        }
    }

    /// Ordered copy of the unit table
    pub fn snapshot(&self) -> Vec<Position> {
        self.lock_table().units.snapshot()
    }

    pub fn unit_count(&self) -> usize {
        self.lock_table().units.len()
    }

    pub fn last_move_at(&self) -> Option<DateTime<Utc>> {
        self.lock_table().last_move_at
    }
}

impl Default for SyncCore {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
