//! Read-only query API for inspecting simulation state.
//!
//! Provides snapshot types that aggregate engine state into convenient views
//! for rendering and UI panels. All types are owned copies -- no references
//! into internal engine storage.

use crate::building::{Building, BuildingKind, BuildingState, BuildingStatus};
use crate::fixed::Fixed64;
use crate::goal::{GoalStatus, Rate};
use crate::grid::{Deposit, Direction, GridPosition, Terrain};
use crate::id::{BuildingId, ItemTypeId, RecipeId};
use crate::item::{Inventory, InventoryPolicy, Item, ItemStack};
use crate::junction::Port;

// ---------------------------------------------------------------------------
// Tile info
// ---------------------------------------------------------------------------

/// Everything a host needs to draw or describe one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    pub position: GridPosition,
    pub terrain: Terrain,
    pub deposit: Option<Deposit>,
    pub building: Option<BuildingSnapshot>,
}

// ---------------------------------------------------------------------------
// Building snapshot
// ---------------------------------------------------------------------------

/// What a buffer is used for within its building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    Input,
    Output,
    /// Splitter output toward the left port ("A").
    LeftOutput,
    /// Splitter output toward the right port ("B").
    RightOutput,
    /// A storage chest's single buffer.
    Storage,
}

/// A copy of one inventory's bounds and per-type contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub role: BufferRole,
    pub policy: InventoryPolicy,
    pub capacity: u32,
    /// Per-type totals, sorted by item type id.
    pub contents: Vec<ItemStack>,
}

impl BufferSnapshot {
    fn of(role: BufferRole, inventory: &Inventory) -> Self {
        Self {
            role,
            policy: inventory.policy(),
            capacity: inventory.capacity(),
            contents: inventory.stacks(),
        }
    }
}

/// An aggregated, read-only view of a single placed building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingSnapshot {
    pub id: BuildingId,
    pub kind: BuildingKind,
    pub position: GridPosition,
    pub facing: Direction,
    pub status: BuildingStatus,
    /// Fraction of the current timer cycle, for kinds that have a timer.
    pub progress: Option<Fixed64>,
    pub recipe: Option<RecipeId>,
    pub buffers: Vec<BufferSnapshot>,
    /// Items riding a conveyor belt, oldest first. Empty for other kinds.
    pub belt_items: Vec<Item>,
    /// Shipping terminals only.
    pub shipped: Option<u64>,
    /// Shipping terminals only.
    pub accepts: Option<ItemTypeId>,
}

impl BuildingSnapshot {
    pub(crate) fn capture(id: BuildingId, building: &Building) -> Self {
        let (buffers, belt_items, shipped, accepts) = match &building.state {
            BuildingState::Miner(m) => (
                vec![BufferSnapshot::of(BufferRole::Output, &m.output)],
                Vec::new(),
                None,
                None,
            ),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => (
                vec![
                    BufferSnapshot::of(BufferRole::Input, &c.input),
                    BufferSnapshot::of(BufferRole::Output, &c.output),
                ],
                Vec::new(),
                None,
                None,
            ),
            BuildingState::ConveyorBelt(b) => (Vec::new(), b.items.clone(), None, None),
            BuildingState::Splitter(s) => (
                vec![
                    BufferSnapshot::of(BufferRole::Input, &s.input),
                    BufferSnapshot::of(BufferRole::LeftOutput, s.output(Port::Left)),
                    BufferSnapshot::of(BufferRole::RightOutput, s.output(Port::Right)),
                ],
                Vec::new(),
                None,
                None,
            ),
            BuildingState::StorageChest(c) => (
                vec![BufferSnapshot::of(BufferRole::Storage, &c.buffer)],
                Vec::new(),
                None,
                None,
            ),
            BuildingState::ShippingTerminal(t) => (
                vec![BufferSnapshot::of(BufferRole::Input, &t.input)],
                Vec::new(),
                Some(t.shipped),
                Some(t.accepts),
            ),
        };
        Self {
            id,
            kind: building.kind(),
            position: building.position,
            facing: building.facing,
            status: building.status(),
            progress: building.progress(),
            recipe: building.recipe(),
            buffers,
            belt_items,
            shipped,
            accepts,
        }
    }

    /// The first buffer with the given role.
    pub fn buffer(&self, role: BufferRole) -> Option<&BufferSnapshot> {
        self.buffers.iter().find(|b| b.role == role)
    }
}

// ---------------------------------------------------------------------------
// Goal progress
// ---------------------------------------------------------------------------

/// Production figures for one tracked item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedRate {
    pub item_type: ItemTypeId,
    pub produced: u64,
    /// `None` until two units have been produced.
    pub rate: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalProgress {
    pub item: ItemTypeId,
    pub target: u32,
    pub produced: u32,
    pub shipped: u64,
    pub status: GoalStatus,
    /// Seconds until the time limit, if there is one.
    pub remaining_time: Option<Fixed64>,
    pub rates: Vec<TrackedRate>,
    /// Goal units per second of elapsed simulation time.
    pub average_rate: Option<Fixed64>,
}
