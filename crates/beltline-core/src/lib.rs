//! Beltline Core -- the simulation core of a grid-based factory sandbox.
//!
//! Resources are mined from deposits, smelted and assembled through
//! multi-stage recipes, carried across conveyor belts and splitters, and
//! counted toward a production goal. Everything runs on deterministic
//! fixed-point time: identical commands and deltas give identical state.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::tick`] advances the simulation by an
//! externally supplied delta through the following phases:
//!
//! 1. **Pre-tick** -- Apply commands queued with [`engine::Engine::submit`].
//! 2. **Production** -- In row-major tile order, every building updates its
//!    timers and inventories, then offers one item from each output buffer
//!    to the conveyor belt it faces.
//! 3. **Transport** -- In row-major tile order, belts advance their items and
//!    hand those at the exit edge to the next belt or, via the
//!    [`router`], to the building in front. Refused items stall at 0.99.
//! 4. **Goal** -- The goal tracker checks the target and the time limit.
//! 5. **Bookkeeping** -- Increment the tick counter and compute the state
//!    hash.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Simulation context, command API, and queries.
//! - [`config::WorldConfig`] -- Serde world description (TOML, JSON, RON).
//! - [`building::Building`] -- Position, facing, and per-kind state.
//! - [`item::Inventory`] -- Capacity-bound container, ordered or counted.
//! - [`registry::Registry`] -- Frozen item types and recipes.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod building;
pub mod command;
pub mod config;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod goal;
pub mod grid;
pub mod id;
pub mod item;
pub mod junction;
pub mod processor;
pub mod query;
pub mod registry;
pub mod router;
pub mod sim;
pub mod transport;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
