//! The simulation engine: owns the grid and every placed building, applies
//! operator commands, and runs the per-tick pipeline.
//!
//! # Tick pipeline
//!
//! Each [`Engine::tick`] runs, in order:
//! 1. **Pre-tick** -- apply commands queued with [`Engine::submit`].
//! 2. **Production** -- every building, in row-major tile order, runs its
//!    update and then offers the head of each output buffer to an adjacent
//!    conveyor belt.
//! 3. **Transport** -- every belt, in row-major tile order, advances its
//!    items and hands off those that reach the exit edge.
//! 4. **Goal** -- the goal tracker re-evaluates completion and expiry.
//! 5. **Bookkeeping** -- tick counter and state hash.
//!
//! Simulation time advances by the supplied delta before phase 2, so every
//! timestamp recorded during a tick is the end-of-tick time.

use crate::building::{Building, BuildingKind, BuildingState, OutputPort};
use crate::command::{Command, CommandError, CommandOutcome, CommandQueue};
use crate::config::{ConfigError, WorldConfig, WorldRules};
use crate::event::{EventLog, LogEntry, LogEvent};
use crate::fixed::{Fixed64, STALL_POSITION, Ticks};
use crate::goal::{GoalStatus, GoalTracker};
use crate::grid::{Direction, Grid, GridPosition, Terrain};
use crate::id::{BuildingId, ItemTypeId};
use crate::item::{Inventory, Item, ItemStack};
use crate::processor::UpdateResult;
use crate::query::{BuildingSnapshot, GoalProgress, TileInfo, TrackedRate};
use crate::registry::Registry;
use crate::router;
use crate::sim::{SimState, StateHash, TickResult};
use slotmap::SlotMap;
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The simulation context. There is no global state; everything a tick
/// touches lives here.
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    rules: WorldRules,
    grid: Grid,

    /// Building arena. Each live building is referenced from exactly one tile.
    buildings: SlotMap<BuildingId, Building>,

    /// The operator's personal inventory (counted, per-type capacity).
    operator: Inventory,

    goal: GoalTracker,
    log: EventLog,
    commands: CommandQueue,
    sim_state: SimState,

    /// The most recently computed state hash.
    last_state_hash: u64,
}

impl Engine {
    /// Build a world from its configuration: registry, rules, terrain and
    /// deposits, starting operator inventory, goal, and event log.
    pub fn new(config: &WorldConfig) -> Result<Self, ConfigError> {
        let registry = config.build_registry()?;
        let rules = config.resolve(&registry)?;
        let grid = config.build_grid(&registry)?;

        let mut operator = Inventory::counted(rules.capacities.operator);
        for stack in &rules.starting_inventory {
            if operator.add(stack.item_type, stack.quantity) > 0 {
                return Err(ConfigError::InvalidValue {
                    field: "operator.starting".into(),
                    reason: format!(
                        "{} {} exceeds the operator capacity of {}",
                        stack.quantity,
                        registry.item_name(stack.item_type),
                        rules.capacities.operator
                    ),
                });
            }
        }

        let goal = GoalTracker::new(
            rules.goal_item,
            rules.goal_target,
            rules.time_limit,
            rules.tracked.iter().copied(),
        );
        let mut log = EventLog::new(config.event_log_capacity);
        for &kind in &config.suppressed_events {
            log.suppress(kind);
        }

        let mut engine = Self {
            registry,
            rules,
            grid,
            buildings: SlotMap::with_key(),
            operator,
            goal,
            log,
            commands: CommandQueue::with_max_history(config.command_history),
            sim_state: SimState::new(),
            last_state_hash: 0,
        };
        engine.last_state_hash = engine.compute_state_hash();

        info!(
            width = engine.grid.width(),
            height = engine.grid.height(),
            items = engine.registry.item_count(),
            recipes = engine.registry.recipe_count(),
            "world created"
        );
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rules(&self) -> &WorldRules {
        &self.rules
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn sim_state(&self) -> SimState {
        self.sim_state
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> Ticks {
        self.sim_state.tick
    }

    /// Sum of every delta supplied so far, in seconds.
    pub fn elapsed(&self) -> Fixed64 {
        self.sim_state.elapsed
    }

    /// Hash of the state after the most recent tick (or construction).
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn operator_inventory(&self) -> &Inventory {
        &self.operator
    }

    pub fn goal(&self) -> &GoalTracker {
        &self.goal
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// The most recent `n` log entries, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<&LogEntry> {
        self.log.recent(n)
    }

    /// Queued commands already applied, as (tick, command) pairs.
    pub fn command_history(&self) -> &[(u64, Command)] {
        self.commands.history()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    /// Direct access to a building's state, bypassing command validation.
    /// Intended for tests and tooling.
    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id)
    }

    pub fn building_at(&self, x: i32, y: i32) -> Option<&Building> {
        self.grid
            .building_at(GridPosition::new(x, y))
            .and_then(|id| self.buildings.get(id))
    }

    /// Every placed building, in arena order.
    pub fn buildings(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        self.buildings.iter()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    fn record(&mut self, event: LogEvent) {
        self.log.push(self.sim_state.tick, event);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the pre-tick phase of the next tick.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Apply a command immediately.
    pub fn apply(&mut self, command: &Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::PlaceBuilding { x, y, kind, facing } => self
                .place_building(*x, *y, *kind, *facing)
                .map(|id| CommandOutcome::Placed { id }),
            Command::RemoveBuilding { x, y } => self
                .remove_building(*x, *y)
                .map(|kind| CommandOutcome::Removed { kind }),
            Command::RotateBuilding { x, y } => self
                .rotate_building(*x, *y)
                .map(|facing| CommandOutcome::Rotated { facing }),
            Command::SetBuildingRecipe { x, y, recipe } => self
                .set_building_recipe(*x, *y, recipe)
                .map(|()| CommandOutcome::RecipeSet),
            Command::SetTerminalItem { x, y, item } => self
                .set_terminal_item(*x, *y, item)
                .map(|()| CommandOutcome::TerminalItemSet),
            Command::CollectFromBuilding { x, y } => self
                .collect_from_building(*x, *y)
                .map(|items| CommandOutcome::Collected { items }),
            Command::MineResource { x, y } => self
                .mine_resource(*x, *y)
                .map(|item_type| CommandOutcome::Mined { item_type }),
        }
    }

    /// Log a rejection. Every public command funnels its result through here.
    fn checked<T>(&mut self, result: Result<T, CommandError>) -> Result<T, CommandError> {
        if let Err(err) = &result {
            debug!(tick = self.sim_state.tick, %err, "command rejected");
            self.record(LogEvent::CommandRejected {
                reason: err.to_string(),
            });
        }
        result
    }

    fn building_id_at(&self, pos: GridPosition) -> Result<BuildingId, CommandError> {
        if !self.grid.contains(pos) {
            return Err(CommandError::OutOfBounds(pos));
        }
        self.grid
            .building_at(pos)
            .ok_or(CommandError::NoBuilding(pos))
    }

    /// Place a building, debiting its cost from the operator inventory.
    pub fn place_building(
        &mut self,
        x: i32,
        y: i32,
        kind: BuildingKind,
        facing: Direction,
    ) -> Result<BuildingId, CommandError> {
        let result = self.try_place(GridPosition::new(x, y), kind, facing);
        self.checked(result)
    }

    fn try_place(
        &mut self,
        pos: GridPosition,
        kind: BuildingKind,
        facing: Direction,
    ) -> Result<BuildingId, CommandError> {
        let tile = self.grid.tile(pos).ok_or(CommandError::OutOfBounds(pos))?;
        if tile.building.is_some() {
            return Err(CommandError::Occupied(pos));
        }
        if tile.terrain == Terrain::Water {
            return Err(CommandError::Water(pos));
        }
        let on_deposit = tile.deposit.is_some();
        if kind == BuildingKind::Miner && !on_deposit {
            return Err(CommandError::RequiresDeposit(pos));
        }
        if kind != BuildingKind::Miner && on_deposit {
            return Err(CommandError::BlockedByDeposit(pos));
        }

        let mut needed: BTreeMap<ItemTypeId, u32> = BTreeMap::new();
        for stack in self.rules.cost(kind) {
            *needed.entry(stack.item_type).or_insert(0) += stack.quantity;
        }
        for (&item_type, &amount) in &needed {
            let available = self.operator.quantity(item_type);
            if available < amount {
                return Err(CommandError::InsufficientCost {
                    kind,
                    item: self.registry.item_name(item_type).to_string(),
                    needed: amount,
                    available,
                });
            }
        }
        for (item_type, amount) in needed {
            let removed = self.operator.remove(item_type, amount);
            debug_assert_eq!(removed, amount, "cost availability was checked");
        }

        let id = self
            .buildings
            .insert(Building::new(kind, pos, facing, &self.rules));
        if let Some(tile) = self.grid.tile_mut(pos) {
            tile.building = Some(id);
        }
        debug!(%pos, %kind, %facing, "building placed");
        self.record(LogEvent::BuildingPlaced {
            kind,
            position: pos,
        });
        Ok(id)
    }

    /// Remove the building on a tile, discarding its buffered items. An
    /// empty tile is a successful no-op returning `None`. Costs are not
    /// refunded.
    pub fn remove_building(&mut self, x: i32, y: i32) -> Result<Option<BuildingKind>, CommandError> {
        let result = self.try_remove(GridPosition::new(x, y));
        self.checked(result)
    }

    fn try_remove(&mut self, pos: GridPosition) -> Result<Option<BuildingKind>, CommandError> {
        let tile = self
            .grid
            .tile_mut(pos)
            .ok_or(CommandError::OutOfBounds(pos))?;
        let Some(id) = tile.building.take() else {
            return Ok(None);
        };
        let Some(building) = self.buildings.remove(id) else {
            return Ok(None);
        };
        let kind = building.kind();
        let discarded = building.stored_items();
        debug!(%pos, %kind, discarded, "building removed");
        self.record(LogEvent::BuildingRemoved {
            kind,
            position: pos,
            discarded,
        });
        Ok(Some(kind))
    }

    /// Turn a building 90 degrees clockwise. Returns the new facing.
    pub fn rotate_building(&mut self, x: i32, y: i32) -> Result<Direction, CommandError> {
        let result = self.try_rotate(GridPosition::new(x, y));
        self.checked(result)
    }

    fn try_rotate(&mut self, pos: GridPosition) -> Result<Direction, CommandError> {
        let id = self.building_id_at(pos)?;
        let building = self
            .buildings
            .get_mut(id)
            .ok_or(CommandError::NoBuilding(pos))?;
        let facing = building.rotate();
        self.record(LogEvent::BuildingRotated {
            position: pos,
            facing,
        });
        Ok(facing)
    }

    /// Assign a recipe to a furnace or assembler. Resets crafting progress.
    pub fn set_building_recipe(&mut self, x: i32, y: i32, recipe: &str) -> Result<(), CommandError> {
        let result = self.try_set_recipe(GridPosition::new(x, y), recipe);
        self.checked(result)
    }

    fn try_set_recipe(&mut self, pos: GridPosition, recipe: &str) -> Result<(), CommandError> {
        let id = self.building_id_at(pos)?;
        let building = self
            .buildings
            .get_mut(id)
            .ok_or(CommandError::NoBuilding(pos))?;
        let kind = building.kind();
        let crafter = building
            .crafter_mut()
            .ok_or(CommandError::NotCraftable(kind))?;
        let unknown = || CommandError::UnknownRecipe {
            kind,
            recipe: recipe.to_string(),
        };
        let recipe_id = self.registry.recipe_id(kind, recipe).ok_or_else(unknown)?;
        let def = self.registry.get_recipe(recipe_id).ok_or_else(unknown)?;
        crafter.set_recipe(recipe_id, def);
        let name = def.name.clone();
        debug!(%pos, recipe = %name, "recipe assigned");
        self.record(LogEvent::RecipeAssigned {
            position: pos,
            recipe: name,
        });
        Ok(())
    }

    /// Change the item type a shipping terminal accepts. Items already
    /// queued stay where they are.
    pub fn set_terminal_item(&mut self, x: i32, y: i32, item: &str) -> Result<(), CommandError> {
        let result = self.try_set_terminal_item(GridPosition::new(x, y), item);
        self.checked(result)
    }

    fn try_set_terminal_item(&mut self, pos: GridPosition, item: &str) -> Result<(), CommandError> {
        let id = self.building_id_at(pos)?;
        let Some(BuildingState::ShippingTerminal(terminal)) =
            self.buildings.get_mut(id).map(|b| &mut b.state)
        else {
            return Err(CommandError::NotATerminal(pos));
        };
        let item_type = self
            .registry
            .item_id(item)
            .ok_or_else(|| CommandError::UnknownItem(item.to_string()))?;
        terminal.accepts = item_type;
        self.record(LogEvent::TerminalItemSet {
            position: pos,
            item: item.to_string(),
        });
        Ok(())
    }

    /// Move a building's collectable items into the operator inventory.
    /// Items that don't fit stay in the building.
    pub fn collect_from_building(&mut self, x: i32, y: i32) -> Result<Vec<ItemStack>, CommandError> {
        let result = self.try_collect(GridPosition::new(x, y));
        self.checked(result)
    }

    fn try_collect(&mut self, pos: GridPosition) -> Result<Vec<ItemStack>, CommandError> {
        let id = self.building_id_at(pos)?;
        let building = self
            .buildings
            .get_mut(id)
            .ok_or(CommandError::NoBuilding(pos))?;
        let moved: Vec<ItemStack> = building
            .collect_into(&mut self.operator)
            .into_iter()
            .map(|(item_type, quantity)| ItemStack::new(item_type, quantity))
            .collect();
        let quantity: u32 = moved.iter().map(|s| s.quantity).sum();
        if quantity > 0 {
            debug!(%pos, quantity, "items collected");
            self.record(LogEvent::ItemsCollected {
                position: pos,
                quantity,
            });
        }
        Ok(moved)
    }

    /// Extract one unit by hand from the deposit on a tile.
    pub fn mine_resource(&mut self, x: i32, y: i32) -> Result<ItemTypeId, CommandError> {
        let result = self.try_mine(GridPosition::new(x, y));
        self.checked(result)
    }

    fn try_mine(&mut self, pos: GridPosition) -> Result<ItemTypeId, CommandError> {
        let tile = self
            .grid
            .tile_mut(pos)
            .ok_or(CommandError::OutOfBounds(pos))?;
        let deposit = tile
            .deposit
            .as_mut()
            .ok_or(CommandError::NoDeposit(pos))?;
        if !deposit.can_yield() {
            return Err(CommandError::DepositExhausted(pos));
        }
        if !self.operator.can_accept(deposit.item_type) {
            return Err(CommandError::OperatorInventoryFull(
                self.registry.item_name(deposit.item_type).to_string(),
            ));
        }
        let item_type = deposit
            .extract()
            .ok_or(CommandError::DepositExhausted(pos))?;
        let overflow = self.operator.add(item_type, 1);
        debug_assert_eq!(overflow, 0);
        let item = self.registry.item_name(item_type).to_string();
        self.record(LogEvent::ResourceMined {
            position: pos,
            item,
        });
        Ok(item_type)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds. Negative deltas count as zero.
    pub fn tick(&mut self, dt: Fixed64) -> TickResult {
        let dt = dt.max(Fixed64::ZERO);
        let mut result = TickResult::default();

        // Phase 1: Pre-tick -- apply queued commands.
        self.phase_pre_tick(&mut result);

        self.sim_state.elapsed = self.sim_state.elapsed.saturating_add(dt);

        // Phase 2: Production -- update buildings, emit onto belts.
        self.phase_production(dt);

        // Phase 3: Transport -- move belt items, resolve hand-offs.
        self.phase_transport(dt);

        // Phase 4: Goal.
        result.goal_transition = self.phase_goal();

        // Phase 5: Bookkeeping.
        self.phase_bookkeeping();
        result.tick = self.sim_state.tick;
        result
    }

    fn phase_pre_tick(&mut self, result: &mut TickResult) {
        for command in self.commands.drain(self.sim_state.tick) {
            let outcome = self.apply(&command);
            result.command_results.push(outcome);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Production
    // -----------------------------------------------------------------------

    fn phase_production(&mut self, dt: Fixed64) {
        let occupied: Vec<(GridPosition, BuildingId)> = self.grid.occupied().collect();
        for (pos, id) in occupied {
            let Some(building) = self.buildings.get_mut(id) else {
                continue;
            };
            let deposit = self.grid.tile_mut(pos).and_then(|t| t.deposit.as_mut());
            let outcome = building.update(dt, deposit, &self.registry);
            if !outcome.is_empty() {
                self.apply_outcome(pos, &outcome);
            }
            self.emit(id);
        }
    }

    /// Feed crafted and shipped items to the goal tracker and the log.
    fn apply_outcome(&mut self, pos: GridPosition, outcome: &UpdateResult) {
        let now = self.sim_state.elapsed;
        for &(item_type, quantity) in &outcome.produced {
            self.goal.record_production(item_type, quantity, now);
            let item = self.registry.item_name(item_type).to_string();
            self.record(LogEvent::ItemCrafted {
                position: pos,
                item,
                quantity,
            });
        }
        if outcome.shipped.is_some() {
            self.goal.record_shipment();
        }
    }

    /// Offer the head of each emitting buffer to the belt it faces.
    fn emit(&mut self, id: BuildingId) {
        let Some(building) = self.buildings.get(id) else {
            return;
        };
        let ports = building.emission_ports();
        let pos = building.position;
        for &port in ports {
            let Some(direction) = self.buildings.get(id).map(|b| b.emission_direction(port)) else {
                return;
            };
            let Some(target) = self.grid.building_at(pos.neighbor(direction)) else {
                continue;
            };
            let has_room = self
                .buildings
                .get(target)
                .and_then(Building::belt)
                .is_some_and(|belt| belt.has_room());
            if !has_room {
                continue;
            }
            let Some(item) = self
                .buildings
                .get_mut(id)
                .and_then(|b| b.emission_buffer_mut(port))
                .and_then(Inventory::pop_front)
            else {
                continue;
            };
            let placed = Item {
                position: Fixed64::ZERO,
                provenance: None,
                ..item
            };
            let accepted = self
                .buildings
                .get_mut(target)
                .and_then(Building::belt_mut)
                .is_some_and(|belt| belt.accept(placed).is_ok());
            if !accepted {
                self.return_to_buffer(id, port, item);
            }
        }
    }

    fn return_to_buffer(&mut self, id: BuildingId, port: OutputPort, item: Item) {
        if let Some(buffer) = self
            .buildings
            .get_mut(id)
            .and_then(|b| b.emission_buffer_mut(port))
        {
            buffer.push_front(item);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Transport
    // -----------------------------------------------------------------------

    fn phase_transport(&mut self, dt: Fixed64) {
        // Item counts are captured up front: anything handed into a belt
        // later in this phase sits past `count` and is not advanced again.
        let belts: Vec<(GridPosition, BuildingId, Direction, usize)> = self
            .grid
            .occupied()
            .filter_map(|(pos, id)| {
                let building = self.buildings.get(id)?;
                let belt = building.belt()?;
                Some((pos, id, building.facing, belt.items.len()))
            })
            .collect();

        for (pos, id, facing, count) in belts {
            for index in (0..count).rev() {
                let Some(belt) = self.buildings.get_mut(id).and_then(Building::belt_mut) else {
                    break;
                };
                let step = belt.step(dt);
                let Some(item) = belt.items.get_mut(index) else {
                    continue;
                };
                item.position = item.position.saturating_add(step);
                if item.position < Fixed64::ONE {
                    continue;
                }
                let item = belt.items.remove(index);
                if let Err(item) = self.hand_off(pos.neighbor(facing), item, facing) {
                    trace!(%pos, item = item.item_type.0, "belt stalled");
                    self.stall(id, index, item);
                }
            }
        }
    }

    /// Move an item off the exit edge of a belt facing `facing` into the
    /// building on `target`. A refused item is handed back unchanged.
    fn hand_off(&mut self, target: GridPosition, item: Item, facing: Direction) -> Result<(), Item> {
        let Some(dest) = self
            .grid
            .building_at(target)
            .and_then(|id| self.buildings.get_mut(id))
        else {
            return Err(item);
        };
        if let Some(belt) = dest.belt_mut() {
            let carried = Item {
                position: (item.position - Fixed64::ONE).min(STALL_POSITION),
                provenance: Some(facing),
                ..item
            };
            return belt.accept(carried).map_err(|_| item);
        }
        let entering = Item {
            position: Fixed64::ZERO,
            ..item
        };
        router::offer(dest, entering).map_err(|_| item)
    }

    /// Put a refused item back on its belt, held just short of the exit.
    fn stall(&mut self, id: BuildingId, index: usize, item: Item) {
        if let Some(belt) = self.buildings.get_mut(id).and_then(Building::belt_mut) {
            let at = index.min(belt.items.len());
            belt.items.insert(
                at,
                Item {
                    position: STALL_POSITION,
                    ..item
                },
            );
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Goal
    // -----------------------------------------------------------------------

    fn phase_goal(&mut self) -> Option<GoalStatus> {
        let transition = self.goal.evaluate(self.sim_state.elapsed)?;
        let item = self.registry.item_name(self.goal.item()).to_string();
        let target = self.goal.target();
        match transition {
            GoalStatus::Completed { at } => {
                info!(%item, target, %at, "goal reached");
                self.record(LogEvent::GoalReached { item, target });
            }
            GoalStatus::Expired { at } => {
                let produced = self.goal.produced();
                info!(%item, produced, target, %at, "goal expired");
                self.record(LogEvent::GoalExpired {
                    item,
                    produced,
                    target,
                });
            }
            GoalStatus::InProgress => {}
        }
        Some(transition)
    }

    // -----------------------------------------------------------------------
    // Phase 5: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Compute a deterministic hash of the current simulation state.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);
        hasher.write_fixed64(self.sim_state.elapsed);

        // Buildings in row-major tile order, so arena keys don't matter.
        for (pos, id) in self.grid.occupied() {
            if let Some(building) = self.buildings.get(id) {
                hasher.write_u32(pos.x as u32);
                hasher.write_u32(pos.y as u32);
                building.write_hash(&mut hasher);
            }
        }

        for pos in self.grid.positions() {
            let remaining = self
                .grid
                .tile(pos)
                .and_then(|t| t.deposit.as_ref())
                .and_then(|d| d.remaining);
            if let Some(remaining) = remaining {
                hasher.write_u32(remaining);
            }
        }

        hasher.write_inventory(&self.operator);
        hasher.write_u32(self.goal.produced());
        hasher.write_u64(self.goal.shipped());
        hasher.finish()
    }

    // -----------------------------------------------------------------------
    // Query API (read-only)
    // -----------------------------------------------------------------------

    /// Terrain, deposit, and building snapshot of a tile. `None` out of range.
    pub fn tile_info(&self, x: i32, y: i32) -> Option<TileInfo> {
        let position = GridPosition::new(x, y);
        let tile = self.grid.tile(position)?;
        Some(TileInfo {
            position,
            terrain: tile.terrain,
            deposit: tile.deposit,
            building: tile.building.and_then(|id| self.snapshot_building(id)),
        })
    }

    /// Create a snapshot of a single building.
    pub fn snapshot_building(&self, id: BuildingId) -> Option<BuildingSnapshot> {
        self.buildings
            .get(id)
            .map(|building| BuildingSnapshot::capture(id, building))
    }

    /// Snapshots of every building, in row-major tile order.
    pub fn snapshot_all_buildings(&self) -> Vec<BuildingSnapshot> {
        self.grid
            .occupied()
            .filter_map(|(_, id)| self.snapshot_building(id))
            .collect()
    }

    pub fn goal_progress(&self) -> GoalProgress {
        let now = self.sim_state.elapsed;
        let rates = self
            .goal
            .rates()
            .map(|(item_type, rate)| TrackedRate {
                item_type,
                produced: self.goal.tracked_count(item_type).unwrap_or(0),
                rate,
            })
            .collect();
        GoalProgress {
            item: self.goal.item(),
            target: self.goal.target(),
            produced: self.goal.produced(),
            shipped: self.goal.shipped(),
            status: self.goal.status(),
            remaining_time: self.goal.remaining(now),
            rates,
            average_rate: self.goal.average_rate(now),
        }
    }
}
