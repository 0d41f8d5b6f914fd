//! Operator commands and the queue that defers them to tick boundaries.
//!
//! Commands can be applied immediately through the matching `Engine` method,
//! or queued with `Engine::submit` and applied in the pre-tick phase of the
//! next tick so scripted runs stay deterministic.

use crate::building::BuildingKind;
use crate::grid::{Direction, GridPosition};
use crate::id::{BuildingId, ItemTypeId};
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single operator command. Item and recipe names are resolved against the
/// registry when the command is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    PlaceBuilding {
        x: i32,
        y: i32,
        kind: BuildingKind,
        facing: Direction,
    },
    RemoveBuilding {
        x: i32,
        y: i32,
    },
    RotateBuilding {
        x: i32,
        y: i32,
    },
    SetBuildingRecipe {
        x: i32,
        y: i32,
        recipe: String,
    },
    SetTerminalItem {
        x: i32,
        y: i32,
        item: String,
    },
    CollectFromBuilding {
        x: i32,
        y: i32,
    },
    MineResource {
        x: i32,
        y: i32,
    },
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Placed {
        id: BuildingId,
    },
    /// `None` when the tile was already empty.
    Removed {
        kind: Option<BuildingKind>,
    },
    Rotated {
        facing: Direction,
    },
    RecipeSet,
    TerminalItemSet,
    /// Per-type amounts moved into the operator inventory. May be empty.
    Collected {
        items: Vec<ItemStack>,
    },
    Mined {
        item_type: ItemTypeId,
    },
}

/// Why a command was rejected. A rejected command never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{0} is outside the map")]
    OutOfBounds(GridPosition),
    #[error("{0} already has a building")]
    Occupied(GridPosition),
    #[error("cannot build on water at {0}")]
    Water(GridPosition),
    #[error("miners must be placed on a resource deposit ({0} has none)")]
    RequiresDeposit(GridPosition),
    #[error("only miners may be placed on the deposit at {0}")]
    BlockedByDeposit(GridPosition),
    #[error("not enough {item} to build a {kind} (need {needed}, have {available})")]
    InsufficientCost {
        kind: BuildingKind,
        item: String,
        needed: u32,
        available: u32,
    },
    #[error("no building at {0}")]
    NoBuilding(GridPosition),
    #[error("the {0} at this tile does not craft")]
    NotCraftable(BuildingKind),
    #[error("{kind} has no recipe named {recipe:?}")]
    UnknownRecipe { kind: BuildingKind, recipe: String },
    #[error("the building at {0} is not a shipping terminal")]
    NotATerminal(GridPosition),
    #[error("unknown item {0:?}")]
    UnknownItem(String),
    #[error("no resource deposit at {0}")]
    NoDeposit(GridPosition),
    #[error("the deposit at {0} is exhausted")]
    DepositExhausted(GridPosition),
    #[error("operator inventory has no room for {0}")]
    OperatorInventoryFull(String),
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// A queue of commands waiting to be executed at the next tick boundary.
///
/// Supports optional history tracking for replay and debugging.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// History of executed commands: (tick, command).
    history: Vec<(u64, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    /// Create a new empty command queue with no history tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new command queue that retains up to `max_history` entries.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Drain all pending commands, moving them to history with the given tick.
    /// Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the command history (tick, command) pairs.
    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }
}
