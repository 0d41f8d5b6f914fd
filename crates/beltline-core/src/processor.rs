//! Timer-driven buildings: miners, crafters (furnace/assembler), and
//! shipping terminals.
//!
//! Each processor owns its inventories and mutates them in `update`. The
//! returned [`UpdateResult`] reports what happened so the engine can apply
//! goal and logging side effects.

use crate::fixed::Fixed64;
use crate::grid::Deposit;
use crate::id::{ItemTypeId, RecipeId};
use crate::item::Inventory;
use crate::registry::{RecipeDef, Registry};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Processor state
// ---------------------------------------------------------------------------

/// Why a processor cannot make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallReason {
    OutputFull,
    Depleted,
    /// The head of the queue is not the item this building accepts.
    WrongItem,
}

/// Runtime state of a miner or terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorState {
    #[default]
    Idle,
    Working,
    Stalled {
        reason: StallReason,
    },
}

/// Crafting state machine of a furnace or assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CraftState {
    #[default]
    NoRecipe,
    /// Output headroom is smaller than one completion's output.
    Blocked,
    /// Ingredients (or fuel) are missing. Progress is retained.
    Waiting,
    Progressing,
    /// A cycle completed during the last update.
    Completing,
}

/// What a single processor update did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Items consumed from the input inventory.
    pub consumed: Vec<(ItemTypeId, u32)>,
    /// Items crafted into the output inventory.
    pub produced: Vec<(ItemTypeId, u32)>,
    /// Item pulled from the deposit by a miner.
    pub extracted: Option<ItemTypeId>,
    /// Item removed from the world by a shipping terminal.
    pub shipped: Option<ItemTypeId>,
}

impl UpdateResult {
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
            && self.produced.is_empty()
            && self.extracted.is_none()
            && self.shipped.is_none()
    }
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Extracts one unit from the deposit under it every `interval` seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miner {
    pub progress: Fixed64,
    pub interval: Fixed64,
    pub output: Inventory,
    pub state: ProcessorState,
}

impl Miner {
    pub fn new(interval: Fixed64, output_capacity: u32) -> Self {
        Self {
            progress: Fixed64::ZERO,
            interval,
            output: Inventory::ordered(output_capacity),
            state: ProcessorState::Idle,
        }
    }

    pub fn update(&mut self, dt: Fixed64, deposit: Option<&mut Deposit>) -> UpdateResult {
        let mut result = UpdateResult::default();
        let Some(deposit) = deposit.filter(|d| d.can_yield()) else {
            self.state = ProcessorState::Stalled {
                reason: StallReason::Depleted,
            };
            return result;
        };
        if self.output.headroom() == 0 {
            self.state = ProcessorState::Stalled {
                reason: StallReason::OutputFull,
            };
            return result;
        }

        self.state = ProcessorState::Working;
        self.progress = self.progress.saturating_add(dt);
        if self.progress >= self.interval {
            self.progress = Fixed64::ZERO;
            if let Some(item_type) = deposit.extract() {
                let overflow = self.output.add(item_type, 1);
                debug_assert_eq!(overflow, 0, "miner output headroom was checked");
                result.extracted = Some(item_type);
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Crafter
// ---------------------------------------------------------------------------

/// A furnace or assembler: consumes recipe inputs (and fuel) from a counted
/// input buffer and appends outputs to an ordered output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crafter {
    pub recipe: Option<RecipeId>,
    /// Seconds per cycle, copied from the recipe on assignment.
    pub duration: Fixed64,
    pub progress: Fixed64,
    pub input: Inventory,
    pub output: Inventory,
    pub state: CraftState,
}

impl Crafter {
    pub fn new(input_capacity: u32, output_capacity: u32) -> Self {
        Self {
            recipe: None,
            duration: Fixed64::ZERO,
            progress: Fixed64::ZERO,
            input: Inventory::counted(input_capacity),
            output: Inventory::ordered(output_capacity),
            state: CraftState::NoRecipe,
        }
    }

    /// Assign a recipe. Progress toward the previous recipe is discarded.
    pub fn set_recipe(&mut self, id: RecipeId, def: &RecipeDef) {
        self.recipe = Some(id);
        self.duration = def.duration;
        self.progress = Fixed64::ZERO;
        self.state = CraftState::Waiting;
    }

    pub fn update(&mut self, dt: Fixed64, registry: &Registry) -> UpdateResult {
        let mut result = UpdateResult::default();
        let Some(def) = self.recipe.and_then(|id| registry.get_recipe(id)) else {
            self.state = CraftState::NoRecipe;
            return result;
        };
        if self.output.headroom() < def.total_output() {
            self.state = CraftState::Blocked;
            return result;
        }
        let requirements = def.requirements();
        if !self.input.contains_all(&requirements) {
            self.state = CraftState::Waiting;
            return result;
        }

        self.progress = self.progress.saturating_add(dt);
        if self.progress < self.duration {
            self.state = CraftState::Progressing;
            return result;
        }

        // Completion: consume everything, then produce everything.
        for (&item_type, &amount) in &requirements {
            let removed = self.input.remove(item_type, amount);
            debug_assert_eq!(removed, amount, "requirements were checked");
            result.consumed.push((item_type, removed));
        }
        for entry in &def.outputs {
            let overflow = self.output.add(entry.item, entry.quantity);
            debug_assert_eq!(overflow, 0, "output headroom was checked");
            result.produced.push((entry.item, entry.quantity - overflow));
        }
        self.progress = Fixed64::ZERO;
        self.state = CraftState::Completing;
        result
    }
}

// ---------------------------------------------------------------------------
// Shipping terminal
// ---------------------------------------------------------------------------

/// Removes one accepted item from the head of its queue every `interval`
/// seconds. A head item of another type blocks the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingTerminal {
    pub accepts: ItemTypeId,
    pub input: Inventory,
    pub timer: Fixed64,
    pub interval: Fixed64,
    pub shipped: u64,
    pub state: ProcessorState,
}

impl ShippingTerminal {
    pub fn new(accepts: ItemTypeId, interval: Fixed64, capacity: u32) -> Self {
        Self {
            accepts,
            input: Inventory::ordered(capacity),
            timer: Fixed64::ZERO,
            interval,
            shipped: 0,
            state: ProcessorState::Idle,
        }
    }

    pub fn update(&mut self, dt: Fixed64) -> UpdateResult {
        let mut result = UpdateResult::default();
        self.timer = self.timer.saturating_add(dt);
        if self.timer >= self.interval {
            self.timer = Fixed64::ZERO;
            if self.input.front().is_some_and(|i| i.item_type == self.accepts) {
                if let Some(item) = self.input.pop_front() {
                    self.shipped += 1;
                    result.shipped = Some(item.item_type);
                }
            }
        }
        self.state = match self.input.front() {
            None => ProcessorState::Idle,
            Some(head) if head.item_type != self.accepts => ProcessorState::Stalled {
                reason: StallReason::WrongItem,
            },
            Some(_) => ProcessorState::Working,
        };
        result
    }
}
