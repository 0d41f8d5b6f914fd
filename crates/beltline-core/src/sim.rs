//! Simulation clock state, tick results, and the state hash.

use crate::command::{CommandError, CommandOutcome};
use crate::fixed::{Fixed64, Ticks};
use crate::goal::GoalStatus;
use crate::item::{Inventory, InventoryPolicy};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation clock tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Number of completed `Engine::tick` calls.
    pub tick: Ticks,

    /// Sum of every delta supplied so far, in seconds. Negative deltas
    /// count as zero.
    pub elapsed: Fixed64,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            elapsed: Fixed64::ZERO,
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// Result of an `Engine::tick()` call.
#[derive(Debug, Default)]
pub struct TickResult {
    /// The tick number that just completed (1-based).
    pub tick: Ticks,

    /// Results of commands applied in the pre-tick phase, in submission order.
    pub command_results: Vec<Result<CommandOutcome, CommandError>>,

    /// Set when the goal changed status during this tick.
    pub goal_transition: Option<GoalStatus>,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Feed an inventory's policy, capacity, and contents in storage order.
    pub fn write_inventory(&mut self, inv: &Inventory) {
        self.write_u32(match inv.policy() {
            InventoryPolicy::Ordered => 0,
            InventoryPolicy::Counted => 1,
        });
        self.write_u32(inv.capacity());
        for item_type in inv.item_types() {
            self.write_u32(item_type.0);
        }
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
