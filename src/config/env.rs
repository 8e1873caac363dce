use super::UnitsyncConfig;
use tracing::warn;

/// Apply `UNITSYNC_*` overrides on top of file/default values.
///
/// `lookup` resolves a variable name; values that fail to parse are ignored
/// with a warning and the existing setting is kept.
pub fn apply_env_overrides<F>(config: &mut UnitsyncConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("UNITSYNC_BIND_ADDR") {
        config.server.bind_addr = v;
    }
    if let Some(v) = lookup("UNITSYNC_MAX_UNIT_ID") {
        match v.parse::<u64>() {
            Ok(n) => config.room.max_unit_id = n,
            Err(_) => warn!(value = %v, "Ignoring invalid UNITSYNC_MAX_UNIT_ID"),
        }
    }
    if let Some(v) = lookup("UNITSYNC_OUTBOUND_BUFFER") {
        match v.parse::<usize>() {
            Ok(n) if n > 0 => config.session.outbound_buffer = n,
            _ => warn!(value = %v, "Ignoring invalid UNITSYNC_OUTBOUND_BUFFER"),
        }
    }
}
