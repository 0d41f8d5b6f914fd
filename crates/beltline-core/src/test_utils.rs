//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::building::{BuildingKind, BuildingState};
use crate::config::{CostConfig, DepositConfig, GridConfig, TileRef, WorldConfig};
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::grid::Direction;
use crate::id::{BuildingId, ItemTypeId};
use crate::item::Inventory;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn secs(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Worlds
// ===========================================================================

/// A 10x8 world with free buildings, an empty operator inventory, and no
/// time limit.
///
/// Deposits: iron_ore (0,0), coal (0,2), copper_ore (0,4), quartz_ore (0,6).
/// Water: (9,7).
pub fn sandbox_config() -> WorldConfig {
    let deposit = |x, y, item: &str| DepositConfig {
        x,
        y,
        item: item.to_string(),
    };
    let mut config = WorldConfig {
        grid: GridConfig {
            width: 10,
            height: 8,
            deposits: vec![
                deposit(0, 0, "iron_ore"),
                deposit(0, 2, "coal"),
                deposit(0, 4, "copper_ore"),
                deposit(0, 6, "quartz_ore"),
            ],
            water: vec![TileRef { x: 9, y: 7 }],
        },
        costs: CostConfig::free(),
        ..WorldConfig::default()
    };
    config.operator.starting.clear();
    config.goal.time_limit = None;
    config
}

pub fn sandbox() -> Engine {
    engine_with(&sandbox_config())
}

pub fn engine_with(config: &WorldConfig) -> Engine {
    Engine::new(config).expect("test world config should be valid")
}

// ===========================================================================
// Commands and ticking
// ===========================================================================

/// Place a building, panicking on rejection.
pub fn place(engine: &mut Engine, x: i32, y: i32, kind: BuildingKind, facing: Direction) -> BuildingId {
    engine
        .place_building(x, y, kind, facing)
        .unwrap_or_else(|e| panic!("placing {kind} at ({x}, {y}) failed: {e}"))
}

/// Assign a recipe, panicking on rejection.
pub fn set_recipe(engine: &mut Engine, x: i32, y: i32, recipe: &str) {
    engine
        .set_building_recipe(x, y, recipe)
        .unwrap_or_else(|e| panic!("assigning {recipe} at ({x}, {y}) failed: {e}"));
}

/// Run `ticks` ticks of `dt` seconds each.
pub fn run(engine: &mut Engine, dt: f64, ticks: u32) {
    let dt = secs(dt);
    for _ in 0..ticks {
        engine.tick(dt);
    }
}

pub fn item(engine: &Engine, name: &str) -> ItemTypeId {
    engine
        .registry()
        .item_id(name)
        .unwrap_or_else(|| panic!("unknown item {name}"))
}

// ===========================================================================
// Direct state access
// ===========================================================================

/// The input buffer of a crafter, splitter, or terminal, or a chest's buffer.
pub fn input_mut(engine: &mut Engine, id: BuildingId) -> &mut Inventory {
    let building = engine.building_mut(id).expect("building exists");
    match &mut building.state {
        BuildingState::Furnace(c) | BuildingState::Assembler(c) => &mut c.input,
        BuildingState::Splitter(s) => &mut s.input,
        BuildingState::ShippingTerminal(t) => &mut t.input,
        BuildingState::StorageChest(c) => &mut c.buffer,
        other => panic!("{other:?} has no input buffer"),
    }
}

/// Stock a building's input with `quantity` units of `name`.
pub fn give(engine: &mut Engine, id: BuildingId, name: &str, quantity: u32) {
    let item_type = item(engine, name);
    let overflow = input_mut(engine, id).add(item_type, quantity);
    assert_eq!(overflow, 0, "input buffer overflowed");
}
