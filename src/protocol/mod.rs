// Wire protocol for room sessions
//
// Every frame is a JSON object tagged by its "type" field. Inbound frames are
// parsed in two steps: first the tag is read from the raw object, then the
// payload for a known tag is decoded into its typed command. Unknown tags are
// not errors; they surface as `Command::Unrecognized` so callers can ignore
// them without logging noise.

use crate::state::Position;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;


/// Tag of the only inbound command the room understands
pub const MOVE_UNIT: &str = "move_unit";

/// Client → Server: move a unit to a new position
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MoveCommand {
    pub unit_id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MoveCommand {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Parsed client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move(MoveCommand),
    /// Well-formed frame with a tag this server does not handle
    Unrecognized(String),
}

/// Server → Client message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full table snapshot, sent once right after join
    Init { units: Vec<Position> },
    /// Accepted move, sent to every joined session
    MoveUnit { unit_id: u64, x: f64, y: f64, z: f64 },
}

impl From<MoveCommand> for ServerMessage {
    fn from(cmd: MoveCommand) -> Self {
        ServerMessage::MoveUnit {
            unit_id: cmd.unit_id,
            x: cmd.x,
            y: cmd.y,
            z: cmd.z,
        }
    }
}

/// Reasons an inbound frame was discarded
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    InvalidJson(String),
    NotAnObject,
    MissingType,
    MalformedCommand { tag: String, reason: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidJson(e) => write!(f, "payload is not valid JSON: {}", e),
            ProtocolError::NotAnObject => write!(f, "payload must be a JSON object"),
            ProtocolError::MissingType => write!(f, "payload has no string 'type' field"),
            ProtocolError::MalformedCommand { tag, reason } => {
                write!(f, "malformed '{}' command: {}", tag, reason)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Parse a raw text frame into a command.
pub fn parse_command(raw: &str) -> Result<Command, ProtocolError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let tag = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            _ => return Err(ProtocolError::MissingType),
        },
        _ => return Err(ProtocolError::NotAnObject),
    };

    if tag != MOVE_UNIT {
        return Ok(Command::Unrecognized(tag));
    }

    serde_json::from_value::<MoveCommand>(value)
        .map(Command::Move)
        .map_err(|e| ProtocolError::MalformedCommand {
            tag,
            reason: e.to_string(),
        })
}
