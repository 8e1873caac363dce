use serde::{Deserialize, Serialize};

/// Position of a single unit in world space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Dense, ordered table of unit positions indexed by unit id.
///
/// Every id from 0 up to the highest one ever written has an entry. Writing
/// past the end fills the gap with default (origin) positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitTable {
    units: Vec<Position>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Overwrite the position of `index`, growing the table as needed
    pub fn set(&mut self, index: usize, position: Position) {
        if index >= self.units.len() {
            self.units.resize(index + 1, Position::default());
        }
        self.units[index] = position;
    }

    pub fn get(&self, index: usize) -> Option<Position> {
        self.units.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Ordered copy of every entry
    pub fn snapshot(&self) -> Vec<Position> {
        self.units.clone()
    }
}
