//! Invariant checking and determinism validation.
//!
//! [`check_invariants`] inspects a live engine for capacity, belt, and
//! grid/arena consistency violations. [`validate_determinism`] runs the same
//! script against two independently built engines and compares their state
//! hashes after every tick.

use crate::command::Command;
use crate::config::{ConfigError, WorldConfig};
use crate::engine::Engine;
use crate::fixed::{Fixed64, Ticks};
use crate::grid::GridPosition;
use crate::id::{BuildingId, ItemTypeId};
use crate::item::{Inventory, InventoryPolicy};
use crate::transport::BELT_CAPACITY;
use std::fmt;

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// A broken structural invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An ordered inventory longer than its capacity.
    OverCapacity {
        position: GridPosition,
        held: u32,
        capacity: u32,
    },
    /// A counted inventory holding more of one type than its capacity.
    TypeOverCapacity {
        position: GridPosition,
        item_type: ItemTypeId,
        held: u32,
        capacity: u32,
    },
    BeltOverfull {
        position: GridPosition,
        items: usize,
    },
    /// A belt item outside [0, 1).
    ItemOutOfRange {
        position: GridPosition,
        at: Fixed64,
    },
    OperatorOverCapacity {
        item_type: ItemTypeId,
        held: u32,
        capacity: u32,
    },
    /// A tile points at a building that is missing or records another tile.
    TileMismatch { position: GridPosition },
    /// A building no tile points at.
    Orphan { id: BuildingId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::OverCapacity {
                position,
                held,
                capacity,
            } => write!(f, "inventory at {position} holds {held} > {capacity}"),
            InvariantViolation::TypeOverCapacity {
                position,
                item_type,
                held,
                capacity,
            } => write!(
                f,
                "inventory at {position} holds {held} of item {} > {capacity}",
                item_type.0
            ),
            InvariantViolation::BeltOverfull { position, items } => {
                write!(f, "belt at {position} carries {items} items")
            }
            InvariantViolation::ItemOutOfRange { position, at } => {
                write!(f, "belt item at {position} sits at {at}")
            }
            InvariantViolation::OperatorOverCapacity {
                item_type,
                held,
                capacity,
            } => write!(
                f,
                "operator holds {held} of item {} > {capacity}",
                item_type.0
            ),
            InvariantViolation::TileMismatch { position } => {
                write!(f, "tile {position} does not match its building")
            }
            InvariantViolation::Orphan { id } => write!(f, "building {id:?} has no tile"),
        }
    }
}

fn check_inventory(position: GridPosition, inv: &Inventory, out: &mut Vec<InvariantViolation>) {
    match inv.policy() {
        InventoryPolicy::Ordered => {
            if inv.total() > inv.capacity() {
                out.push(InvariantViolation::OverCapacity {
                    position,
                    held: inv.total(),
                    capacity: inv.capacity(),
                });
            }
        }
        InventoryPolicy::Counted => {
            for stack in inv.stacks() {
                if stack.quantity > inv.capacity() {
                    out.push(InvariantViolation::TypeOverCapacity {
                        position,
                        item_type: stack.item_type,
                        held: stack.quantity,
                        capacity: inv.capacity(),
                    });
                }
            }
        }
    }
}

/// Every invariant violation in the engine's current state. Empty when the
/// state is consistent.
pub fn check_invariants(engine: &Engine) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    let mut referenced = 0usize;
    for (position, id) in engine.grid().occupied() {
        referenced += 1;
        let Some(building) = engine.building(id) else {
            out.push(InvariantViolation::TileMismatch { position });
            continue;
        };
        if building.position != position {
            out.push(InvariantViolation::TileMismatch { position });
        }
        for inv in building.inventories() {
            check_inventory(position, inv, &mut out);
        }
        if let Some(belt) = building.belt() {
            if belt.items.len() > BELT_CAPACITY {
                out.push(InvariantViolation::BeltOverfull {
                    position,
                    items: belt.items.len(),
                });
            }
            for item in &belt.items {
                if item.position < Fixed64::ZERO || item.position >= Fixed64::ONE {
                    out.push(InvariantViolation::ItemOutOfRange {
                        position,
                        at: item.position,
                    });
                }
            }
        }
    }

    if referenced != engine.building_count() {
        for (id, building) in engine.buildings() {
            if engine.grid().building_at(building.position) != Some(id) {
                out.push(InvariantViolation::Orphan { id });
            }
        }
    }

    check_operator(engine, &mut out);
    out
}

fn check_operator(engine: &Engine, out: &mut Vec<InvariantViolation>) {
    let inv = engine.operator_inventory();
    for stack in inv.stacks() {
        if stack.quantity > inv.capacity() {
            out.push(InvariantViolation::OperatorOverCapacity {
                item_type: stack.item_type,
                held: stack.quantity,
                capacity: inv.capacity(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

/// One step of a scripted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Queue a command for the next tick.
    Submit(Command),
    /// Apply a command immediately.
    Apply(Command),
    /// Advance by this many seconds.
    Tick(Fixed64),
}

/// Result of a determinism validation run.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// First tick at which the hashes diverged.
    pub divergence_tick: Option<Ticks>,
    /// (tick, hash_a, hash_b) after every tick step.
    pub hash_log: Vec<(Ticks, u64, u64)>,
}

/// Play a script against an engine. Command rejections are part of the
/// script's behaviour and are not errors.
pub fn run_script(engine: &mut Engine, script: &[ScriptStep]) {
    for step in script {
        match step {
            ScriptStep::Submit(command) => engine.submit(command.clone()),
            ScriptStep::Apply(command) => {
                let _ = engine.apply(command);
            }
            ScriptStep::Tick(dt) => {
                engine.tick(*dt);
            }
        }
    }
}

/// Build two engines from `config`, play `script` on both, and compare
/// their state hashes after every tick.
pub fn validate_determinism(
    config: &WorldConfig,
    script: &[ScriptStep],
) -> Result<DeterminismResult, ConfigError> {
    let mut engine_a = Engine::new(config)?;
    let mut engine_b = Engine::new(config)?;

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;

    for step in script {
        let step = std::slice::from_ref(step);
        run_script(&mut engine_a, step);
        run_script(&mut engine_b, step);
        if !matches!(step[0], ScriptStep::Tick(_)) {
            continue;
        }

        let hash_a = engine_a.state_hash();
        let hash_b = engine_b.state_hash();
        let tick = engine_a.tick_count();
        hash_log.push((tick, hash_a, hash_b));

        if hash_a != hash_b && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{BuildingKind, BuildingState};
    use crate::grid::Direction;
    use crate::item::Item;
    use crate::test_utils::*;

    fn factory_script() -> Vec<ScriptStep> {
        let place = |x, y, kind, facing| {
            ScriptStep::Apply(Command::PlaceBuilding { x, y, kind, facing })
        };
        let mut script = vec![
            place(0, 0, BuildingKind::Miner, Direction::East),
            place(1, 0, BuildingKind::ConveyorBelt, Direction::East),
            place(2, 0, BuildingKind::ConveyorBelt, Direction::South),
            place(2, 1, BuildingKind::Splitter, Direction::South),
            place(3, 1, BuildingKind::StorageChest, Direction::South),
            ScriptStep::Submit(Command::RotateBuilding { x: 3, y: 1 }),
        ];
        script.extend((0..40).map(|_| ScriptStep::Tick(secs(0.25))));
        script
    }

    // -----------------------------------------------------------------------
    // Test 1: A fresh world is consistent
    // -----------------------------------------------------------------------
    #[test]
    fn fresh_world_has_no_violations() {
        let engine = sandbox();
        assert!(check_invariants(&engine).is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 2: A running factory stays consistent
    // -----------------------------------------------------------------------
    #[test]
    fn running_factory_has_no_violations() {
        let mut engine = sandbox();
        run_script(&mut engine, &factory_script());
        assert!(check_invariants(&engine).is_empty());
        assert!(engine.building_at(3, 1).is_some());
    }

    // -----------------------------------------------------------------------
    // Test 3: Overfull belts are reported
    // -----------------------------------------------------------------------
    #[test]
    fn overfull_belt_detected() {
        let mut engine = sandbox();
        let id = place(&mut engine, 4, 4, BuildingKind::ConveyorBelt, Direction::East);
        let ore = item(&engine, "iron_ore");
        if let Some(BuildingState::ConveyorBelt(belt)) =
            engine.building_mut(id).map(|b| &mut b.state)
        {
            belt.items = vec![Item::new(ore); 3];
        }
        let violations = check_invariants(&engine);
        assert_eq!(
            violations,
            vec![InvariantViolation::BeltOverfull {
                position: GridPosition::new(4, 4),
                items: 3,
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Test 4: Items past the exit edge are reported
    // -----------------------------------------------------------------------
    #[test]
    fn item_out_of_range_detected() {
        let mut engine = sandbox();
        let id = place(&mut engine, 4, 4, BuildingKind::ConveyorBelt, Direction::East);
        let ore = item(&engine, "iron_ore");
        if let Some(BuildingState::ConveyorBelt(belt)) =
            engine.building_mut(id).map(|b| &mut b.state)
        {
            belt.items.push(Item {
                position: Fixed64::ONE,
                ..Item::new(ore)
            });
        }
        let violations = check_invariants(&engine);
        assert!(matches!(
            violations.as_slice(),
            [InvariantViolation::ItemOutOfRange { .. }]
        ));
    }

    // -----------------------------------------------------------------------
    // Test 5: Identical scripts are deterministic
    // -----------------------------------------------------------------------
    #[test]
    fn identical_scripts_are_deterministic() {
        let result = validate_determinism(&sandbox_config(), &factory_script()).unwrap();
        assert!(result.is_deterministic);
        assert_eq!(result.divergence_tick, None);
        assert_eq!(result.hash_log.len(), 40);
        assert_eq!(result.hash_log.last().map(|e| e.0), Some(40));
    }

    // -----------------------------------------------------------------------
    // Test 6: Different scripts produce different hashes
    // -----------------------------------------------------------------------
    #[test]
    fn different_deltas_change_the_hash() {
        let mut a = sandbox();
        let mut b = sandbox();
        run_script(&mut a, &factory_script());
        let mut script = factory_script();
        script.push(ScriptStep::Tick(secs(0.25)));
        run_script(&mut b, &script);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    // -----------------------------------------------------------------------
    // Test 7: Bad config surfaces as an error
    // -----------------------------------------------------------------------
    #[test]
    fn invalid_config_is_an_error() {
        let mut config = sandbox_config();
        config.grid.width = 0;
        assert!(validate_determinism(&config, &[]).is_err());
    }
}
