//! Building variants and per-kind dispatch.
//!
//! A [`Building`] is a position and facing shared by every kind, plus a
//! [`BuildingState`] holding the kind-specific timers and inventories.
//! Dispatch is an enum match; there are no trait objects.

use crate::config::WorldRules;
use crate::fixed::{Fixed64, STALL_POSITION, fraction};
use crate::grid::{Deposit, Direction, GridPosition};
use crate::id::{ItemTypeId, RecipeId};
use crate::item::Inventory;
use crate::junction::{Port, Splitter};
use crate::processor::{
    CraftState, Crafter, Miner, ProcessorState, ShippingTerminal, StallReason, UpdateResult,
};
use crate::registry::Registry;
use crate::sim::StateHash;
use crate::transport::ConveyorBelt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Miner,
    Furnace,
    Assembler,
    ConveyorBelt,
    Splitter,
    StorageChest,
    ShippingTerminal,
}

impl BuildingKind {
    pub fn all() -> [BuildingKind; 7] {
        [
            BuildingKind::Miner,
            BuildingKind::Furnace,
            BuildingKind::Assembler,
            BuildingKind::ConveyorBelt,
            BuildingKind::Splitter,
            BuildingKind::StorageChest,
            BuildingKind::ShippingTerminal,
        ]
    }

    /// Whether this kind runs recipes.
    pub fn is_crafter(self) -> bool {
        matches!(self, BuildingKind::Furnace | BuildingKind::Assembler)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuildingKind::Miner => "miner",
            BuildingKind::Furnace => "furnace",
            BuildingKind::Assembler => "assembler",
            BuildingKind::ConveyorBelt => "conveyor_belt",
            BuildingKind::Splitter => "splitter",
            BuildingKind::StorageChest => "storage_chest",
            BuildingKind::ShippingTerminal => "shipping_terminal",
        }
    }

    fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Storage chest
// ---------------------------------------------------------------------------

/// Passive storage: a Router destination, an emission source, and a manual
/// collection source. Has no timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChest {
    pub buffer: Inventory,
}

impl StorageChest {
    pub fn new(capacity: u32) -> Self {
        Self {
            buffer: Inventory::ordered(capacity),
        }
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingState {
    Miner(Miner),
    Furnace(Crafter),
    Assembler(Crafter),
    ConveyorBelt(ConveyorBelt),
    Splitter(Splitter),
    StorageChest(StorageChest),
    ShippingTerminal(ShippingTerminal),
}

/// Which buffer of a building emits toward a neighbouring belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPort {
    Primary,
    Split(Port),
}

const PRIMARY_PORT: &[OutputPort] = &[OutputPort::Primary];
const SPLIT_PORTS: &[OutputPort] = &[OutputPort::Split(Port::Left), OutputPort::Split(Port::Right)];

/// Coarse, host-facing status of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingStatus {
    Idle,
    Working,
    NoRecipe,
    WaitingForInputs,
    OutputFull,
    Depleted,
    WrongItem,
    Stalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    pub position: GridPosition,
    pub facing: Direction,
    pub state: BuildingState,
}

impl Building {
    /// A freshly placed building with empty buffers sized by `rules`.
    pub fn new(kind: BuildingKind, position: GridPosition, facing: Direction, rules: &WorldRules) -> Self {
        let caps = &rules.capacities;
        let state = match kind {
            BuildingKind::Miner => {
                BuildingState::Miner(Miner::new(rules.mining_interval, caps.miner_output))
            }
            BuildingKind::Furnace => {
                BuildingState::Furnace(Crafter::new(caps.crafter_input, caps.crafter_output))
            }
            BuildingKind::Assembler => {
                BuildingState::Assembler(Crafter::new(caps.crafter_input, caps.crafter_output))
            }
            BuildingKind::ConveyorBelt => {
                BuildingState::ConveyorBelt(ConveyorBelt::new(rules.belt_speed))
            }
            BuildingKind::Splitter => BuildingState::Splitter(Splitter::new(
                rules.splitter_interval,
                caps.splitter_input,
                caps.splitter_output,
            )),
            BuildingKind::StorageChest => {
                BuildingState::StorageChest(StorageChest::new(caps.chest))
            }
            BuildingKind::ShippingTerminal => BuildingState::ShippingTerminal(
                ShippingTerminal::new(rules.terminal_item, rules.terminal_interval, caps.terminal),
            ),
        };
        Self {
            position,
            facing,
            state,
        }
    }

    pub fn kind(&self) -> BuildingKind {
        match &self.state {
            BuildingState::Miner(_) => BuildingKind::Miner,
            BuildingState::Furnace(_) => BuildingKind::Furnace,
            BuildingState::Assembler(_) => BuildingKind::Assembler,
            BuildingState::ConveyorBelt(_) => BuildingKind::ConveyorBelt,
            BuildingState::Splitter(_) => BuildingKind::Splitter,
            BuildingState::StorageChest(_) => BuildingKind::StorageChest,
            BuildingState::ShippingTerminal(_) => BuildingKind::ShippingTerminal,
        }
    }

    /// Turn 90 degrees clockwise.
    pub fn rotate(&mut self) -> Direction {
        self.facing = self.facing.rotate_cw();
        self.facing
    }

    pub fn crafter(&self) -> Option<&Crafter> {
        match &self.state {
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => Some(c),
            _ => None,
        }
    }

    pub fn crafter_mut(&mut self) -> Option<&mut Crafter> {
        match &mut self.state {
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => Some(c),
            _ => None,
        }
    }

    pub fn belt(&self) -> Option<&ConveyorBelt> {
        match &self.state {
            BuildingState::ConveyorBelt(b) => Some(b),
            _ => None,
        }
    }

    pub fn belt_mut(&mut self) -> Option<&mut ConveyorBelt> {
        match &mut self.state {
            BuildingState::ConveyorBelt(b) => Some(b),
            _ => None,
        }
    }

    /// Phase-1 update. Belts do nothing here; they move in phase 2.
    pub fn update(&mut self, dt: Fixed64, deposit: Option<&mut Deposit>, registry: &Registry) -> UpdateResult {
        match &mut self.state {
            BuildingState::Miner(m) => m.update(dt, deposit),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => c.update(dt, registry),
            BuildingState::Splitter(s) => {
                s.update(dt);
                UpdateResult::default()
            }
            BuildingState::ShippingTerminal(t) => t.update(dt),
            BuildingState::ConveyorBelt(_) | BuildingState::StorageChest(_) => {
                UpdateResult::default()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    /// Buffers that push their head item toward an adjacent belt in phase 1.
    pub fn emission_ports(&self) -> &'static [OutputPort] {
        match &self.state {
            BuildingState::Miner(_)
            | BuildingState::Furnace(_)
            | BuildingState::Assembler(_)
            | BuildingState::StorageChest(_) => PRIMARY_PORT,
            BuildingState::Splitter(_) => SPLIT_PORTS,
            BuildingState::ConveyorBelt(_) | BuildingState::ShippingTerminal(_) => &[],
        }
    }

    pub fn emission_direction(&self, port: OutputPort) -> Direction {
        match port {
            OutputPort::Primary => self.facing,
            OutputPort::Split(p) => p.direction(self.facing),
        }
    }

    pub fn emission_buffer_mut(&mut self, port: OutputPort) -> Option<&mut Inventory> {
        match (&mut self.state, port) {
            (BuildingState::Miner(m), OutputPort::Primary) => Some(&mut m.output),
            (BuildingState::Furnace(c) | BuildingState::Assembler(c), OutputPort::Primary) => {
                Some(&mut c.output)
            }
            (BuildingState::StorageChest(c), OutputPort::Primary) => Some(&mut c.buffer),
            (BuildingState::Splitter(s), OutputPort::Split(p)) => Some(s.output_mut(p)),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Collection and removal
    // -----------------------------------------------------------------------

    /// Move the contents of the collectable buffers into `dest`.
    ///
    /// Producers give up their outputs; kinds without an output give up their
    /// only buffer; belts give up their in-transit items. Whatever `dest`
    /// refuses stays put.
    pub fn collect_into(&mut self, dest: &mut Inventory) -> BTreeMap<ItemTypeId, u32> {
        match &mut self.state {
            BuildingState::Miner(m) => m.output.transfer_into(dest),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => c.output.transfer_into(dest),
            BuildingState::Splitter(s) => {
                let mut moved = BTreeMap::new();
                for output in &mut s.outputs {
                    for (item_type, n) in output.transfer_into(dest) {
                        *moved.entry(item_type).or_insert(0) += n;
                    }
                }
                moved
            }
            BuildingState::StorageChest(c) => c.buffer.transfer_into(dest),
            BuildingState::ShippingTerminal(t) => t.input.transfer_into(dest),
            BuildingState::ConveyorBelt(b) => {
                let mut moved = BTreeMap::new();
                let mut kept = Vec::with_capacity(b.items.len());
                for item in b.items.drain(..) {
                    match dest.try_insert(item) {
                        Ok(()) => *moved.entry(item.item_type).or_insert(0) += 1,
                        Err(item) => kept.push(item),
                    }
                }
                b.items = kept;
                moved
            }
        }
    }

    /// Total number of items held in any buffer.
    pub fn stored_items(&self) -> u32 {
        self.inventories().iter().map(|inv| inv.total()).sum::<u32>()
            + self.belt().map_or(0, |b| b.items.len() as u32)
    }

    /// All inventories of this building, inputs first.
    pub fn inventories(&self) -> Vec<&Inventory> {
        match &self.state {
            BuildingState::Miner(m) => vec![&m.output],
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => vec![&c.input, &c.output],
            BuildingState::Splitter(s) => vec![&s.input, &s.outputs[0], &s.outputs[1]],
            BuildingState::StorageChest(c) => vec![&c.buffer],
            BuildingState::ShippingTerminal(t) => vec![&t.input],
            BuildingState::ConveyorBelt(_) => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn recipe(&self) -> Option<RecipeId> {
        self.crafter().and_then(|c| c.recipe)
    }

    /// Fraction of the current timer cycle in [0, 1], where the kind has one.
    pub fn progress(&self) -> Option<Fixed64> {
        match &self.state {
            BuildingState::Miner(m) => Some(fraction(m.progress, m.interval)),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => {
                Some(fraction(c.progress, c.duration))
            }
            BuildingState::Splitter(s) => Some(fraction(s.timer, s.interval)),
            BuildingState::ShippingTerminal(t) => Some(fraction(t.timer, t.interval)),
            BuildingState::ConveyorBelt(_) | BuildingState::StorageChest(_) => None,
        }
    }

    pub fn status(&self) -> BuildingStatus {
        match &self.state {
            BuildingState::Miner(m) => processor_status(m.state),
            BuildingState::ShippingTerminal(t) => processor_status(t.state),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => match c.state {
                CraftState::NoRecipe => BuildingStatus::NoRecipe,
                CraftState::Blocked => BuildingStatus::OutputFull,
                CraftState::Waiting => BuildingStatus::WaitingForInputs,
                CraftState::Progressing | CraftState::Completing => BuildingStatus::Working,
            },
            BuildingState::ConveyorBelt(b) => {
                if b.items.is_empty() {
                    BuildingStatus::Idle
                } else if b.items.iter().any(|i| i.position >= STALL_POSITION) {
                    BuildingStatus::Stalled
                } else {
                    BuildingStatus::Working
                }
            }
            BuildingState::Splitter(s) => {
                if s.input.is_empty() {
                    BuildingStatus::Idle
                } else if s.next_port().is_none() {
                    BuildingStatus::OutputFull
                } else {
                    BuildingStatus::Working
                }
            }
            BuildingState::StorageChest(c) => {
                if c.buffer.is_empty() {
                    BuildingStatus::Idle
                } else {
                    BuildingStatus::Working
                }
            }
        }
    }

    /// Feed every piece of simulation-relevant state into `hash`.
    pub(crate) fn write_hash(&self, hash: &mut StateHash) {
        hash.write_u32(self.kind().index());
        hash.write_u32(self.facing.index());
        match &self.state {
            BuildingState::Miner(m) => hash.write_fixed64(m.progress),
            BuildingState::Furnace(c) | BuildingState::Assembler(c) => {
                hash.write_u32(c.recipe.map_or(u32::MAX, |r| r.0));
                hash.write_fixed64(c.progress);
            }
            BuildingState::ConveyorBelt(b) => {
                for item in &b.items {
                    hash.write_u32(item.item_type.0);
                    hash.write_fixed64(item.position);
                }
            }
            BuildingState::Splitter(s) => {
                hash.write_fixed64(s.timer);
                hash.write_u32(s.last_used.map_or(u32::MAX, |p| p.index() as u32));
            }
            BuildingState::StorageChest(_) => {}
            BuildingState::ShippingTerminal(t) => {
                hash.write_u32(t.accepts.0);
                hash.write_fixed64(t.timer);
                hash.write_u64(t.shipped);
            }
        }
        for inv in self.inventories() {
            hash.write_inventory(inv);
        }
    }
}

fn processor_status(state: ProcessorState) -> BuildingStatus {
    match state {
        ProcessorState::Idle => BuildingStatus::Idle,
        ProcessorState::Working => BuildingStatus::Working,
        ProcessorState::Stalled { reason } => match reason {
            StallReason::OutputFull => BuildingStatus::OutputFull,
            StallReason::Depleted => BuildingStatus::Depleted,
            StallReason::WrongItem => BuildingStatus::WrongItem,
        },
    }
}
