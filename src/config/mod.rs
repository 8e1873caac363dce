pub mod env;
pub use env::apply_env_overrides;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Complete unitsync configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitsyncConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// What to do with a session that moves a unit past `max_unit_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Close the offending session
    Disconnect,
    /// Discard the command and keep the session
    Drop,
}

/// Room configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    #[serde(default = "default_room_name")]
    pub name: String,
    /// Highest accepted unit id. The table grows densely up to the id it is
    /// given, so this bounds its memory.
    #[serde(default = "default_max_unit_id")]
    pub max_unit_id: u64,
    #[serde(default = "default_out_of_range")]
    pub out_of_range: OutOfRangePolicy,
}

fn default_room_name() -> String {
    "game_room".to_string()
}

fn default_max_unit_id() -> u64 {
    65_535
}

fn default_out_of_range() -> OutOfRangePolicy {
    OutOfRangePolicy::Disconnect
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: default_room_name(),
            max_unit_id: default_max_unit_id(),
            out_of_range: default_out_of_range(),
        }
    }
}

/// Per-session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Capacity of each session's outbound queue (messages)
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

fn default_outbound_buffer() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<UnitsyncConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: UnitsyncConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load from `UNITSYNC_CONFIG` if set, otherwise defaults; then apply env overrides
pub fn load_from_env() -> Result<UnitsyncConfig> {
    let mut config = match std::env::var("UNITSYNC_CONFIG") {
        Ok(path) => load_config(path)?,
        Err(_) => UnitsyncConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}
