// Unit position table and synchronization core

mod engine;
mod unit;

pub use engine::{CommandError, Dispatch, SyncCore};
pub use unit::{Position, UnitTable};

#[cfg(test)]
mod tests;
