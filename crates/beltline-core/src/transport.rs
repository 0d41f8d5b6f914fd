//! Conveyor belt segments.
//!
//! A segment carries at most [`BELT_CAPACITY`] items. Positions advance by
//! `speed * dt` per tick; hand-offs at the exit edge are resolved by the
//! engine because they need the neighbouring tile.

use crate::fixed::Fixed64;
use crate::item::Item;

/// Maximum number of items a single belt segment holds at once.
pub const BELT_CAPACITY: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConveyorBelt {
    /// In-transit items. Index 0 entered first.
    pub items: Vec<Item>,
    /// Tiles per second.
    pub speed: Fixed64,
}

impl ConveyorBelt {
    pub fn new(speed: Fixed64) -> Self {
        Self {
            items: Vec::with_capacity(BELT_CAPACITY),
            speed,
        }
    }

    pub fn has_room(&self) -> bool {
        self.items.len() < BELT_CAPACITY
    }

    /// Append an item at whatever position the caller set. Refused items are
    /// handed back.
    pub fn accept(&mut self, item: Item) -> Result<(), Item> {
        if !self.has_room() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Distance an item moves in `dt` seconds.
    pub fn step(&self, dt: Fixed64) -> Fixed64 {
        self.speed.saturating_mul(dt)
    }
}
