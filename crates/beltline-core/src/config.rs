//! World configuration: layout, capacities, timings, costs, goal, and the
//! recipe book.
//!
//! [`WorldConfig`] is the serde-facing form (names and `f64` seconds). It is
//! loaded from RON, TOML, or JSON, detected from the file extension, and
//! resolved against the registry into [`WorldRules`] (ids and [`Fixed64`])
//! when an engine is built.

use crate::building::BuildingKind;
use crate::event::EventKind;
use crate::fixed::{Fixed64, checked_f64_to_fixed64};
use crate::grid::{Deposit, Grid, GridPosition, Terrain};
use crate::id::ItemTypeId;
use crate::item::ItemStack;
use crate::registry::{RecipeDef, RecipeEntry, Registry, RegistryBuilder, RegistryError};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown item {name:?} referenced by {context}")]
    UnknownItem { name: String, context: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ===========================================================================
// Serde-facing configuration
// ===========================================================================

/// An `(item name, amount)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAmount {
    pub item: String,
    pub amount: u32,
}

impl ItemAmount {
    pub fn new(item: &str, amount: u32) -> Self {
        Self {
            item: item.to_string(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRef {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositConfig {
    pub x: i32,
    pub y: i32,
    pub item: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub deposits: Vec<DepositConfig>,
    pub water: Vec<TileRef>,
}

/// Whether deposits run dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepletionPolicy {
    #[default]
    Infinite,
    /// Every deposit starts with `amount` units.
    Finite { amount: u32 },
}

/// Buffer sizes. Ordered buffers bound total length; counted buffers
/// (crafter input, operator inventory) bound each item type separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    pub miner_output: u32,
    pub crafter_input: u32,
    pub crafter_output: u32,
    pub splitter_input: u32,
    pub splitter_output: u32,
    pub chest: u32,
    pub terminal: u32,
    pub operator: u32,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            miner_output: 10,
            crafter_input: 20,
            crafter_output: 20,
            splitter_input: 4,
            splitter_output: 2,
            chest: 50,
            terminal: 10,
            operator: 100,
        }
    }
}

/// Intervals in seconds, belt speed in tiles per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub mining_interval: f64,
    pub splitter_interval: f64,
    pub terminal_interval: f64,
    pub belt_speed: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mining_interval: 1.0,
            splitter_interval: 0.25,
            terminal_interval: 1.0,
            belt_speed: 1.0,
        }
    }
}

/// Build cost per building kind, debited from the operator inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub miner: Vec<ItemAmount>,
    pub furnace: Vec<ItemAmount>,
    pub assembler: Vec<ItemAmount>,
    pub conveyor_belt: Vec<ItemAmount>,
    pub splitter: Vec<ItemAmount>,
    pub storage_chest: Vec<ItemAmount>,
    pub shipping_terminal: Vec<ItemAmount>,
}

impl CostConfig {
    /// Every building is free.
    pub fn free() -> Self {
        Self {
            miner: Vec::new(),
            furnace: Vec::new(),
            assembler: Vec::new(),
            conveyor_belt: Vec::new(),
            splitter: Vec::new(),
            storage_chest: Vec::new(),
            shipping_terminal: Vec::new(),
        }
    }

    pub fn for_kind(&self, kind: BuildingKind) -> &[ItemAmount] {
        match kind {
            BuildingKind::Miner => &self.miner,
            BuildingKind::Furnace => &self.furnace,
            BuildingKind::Assembler => &self.assembler,
            BuildingKind::ConveyorBelt => &self.conveyor_belt,
            BuildingKind::Splitter => &self.splitter,
            BuildingKind::StorageChest => &self.storage_chest,
            BuildingKind::ShippingTerminal => &self.shipping_terminal,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        let plates = |n| vec![ItemAmount::new("iron_plate", n)];
        Self {
            miner: plates(3),
            furnace: plates(5),
            assembler: vec![
                ItemAmount::new("iron_plate", 5),
                ItemAmount::new("copper_plate", 3),
            ],
            conveyor_belt: plates(1),
            splitter: plates(3),
            storage_chest: plates(2),
            shipping_terminal: plates(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Starting contents of the operator inventory.
    pub starting: Vec<ItemAmount>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            starting: vec![
                ItemAmount::new("iron_plate", 80),
                ItemAmount::new("copper_plate", 20),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub item: String,
    pub target: u32,
    /// Seconds; `None` for no limit.
    pub time_limit: Option<f64>,
    /// Extra item types whose production rate is tracked.
    pub tracked: Vec<String>,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            item: "electronic_circuit".to_string(),
            target: 10,
            time_limit: Some(15.0 * 60.0),
            tracked: vec!["copper_wire".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeConfig {
    pub name: String,
    pub building: BuildingKind,
    pub inputs: Vec<ItemAmount>,
    #[serde(default)]
    pub fuel: Vec<ItemAmount>,
    pub outputs: Vec<ItemAmount>,
    /// Seconds per cycle.
    pub duration: f64,
}

/// The built-in recipe book.
pub fn standard_recipes() -> Vec<RecipeConfig> {
    let smelt = |name: &str, ore: &str| RecipeConfig {
        name: name.to_string(),
        building: BuildingKind::Furnace,
        inputs: vec![ItemAmount::new(ore, 1)],
        fuel: vec![ItemAmount::new("coal", 1)],
        outputs: vec![ItemAmount::new(name, 1)],
        duration: 1.0,
    };
    let assemble = |name: &str, inputs: Vec<ItemAmount>, amount: u32, duration: f64| RecipeConfig {
        name: name.to_string(),
        building: BuildingKind::Assembler,
        inputs,
        fuel: Vec::new(),
        outputs: vec![ItemAmount::new(name, amount)],
        duration,
    };
    vec![
        smelt("iron_plate", "iron_ore"),
        smelt("copper_plate", "copper_ore"),
        smelt("glass", "quartz_ore"),
        assemble("copper_wire", vec![ItemAmount::new("copper_plate", 1)], 2, 0.5),
        assemble(
            "electronic_circuit",
            vec![
                ItemAmount::new("iron_plate", 1),
                ItemAmount::new("copper_wire", 3),
            ],
            1,
            1.0,
        ),
        assemble("gear", vec![ItemAmount::new("iron_plate", 2)], 1, 0.5),
        assemble(
            "robot_body",
            vec![ItemAmount::new("gear", 2), ItemAmount::new("iron_plate", 2)],
            1,
            2.0,
        ),
        assemble(
            "robot",
            vec![
                ItemAmount::new("robot_body", 1),
                ItemAmount::new("electronic_circuit", 2),
            ],
            1,
            3.0,
        ),
    ]
}

/// Everything needed to build a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub grid: GridConfig,
    pub depletion: DepletionPolicy,
    pub capacities: Capacities,
    pub timing: TimingConfig,
    pub costs: CostConfig,
    pub operator: OperatorConfig,
    pub goal: GoalConfig,
    /// Item newly placed shipping terminals accept.
    pub terminal_item: String,
    pub event_log_capacity: usize,
    pub suppressed_events: Vec<EventKind>,
    /// Queued commands kept for replay/debugging. 0 disables history.
    pub command_history: usize,
    pub recipes: Vec<RecipeConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        let deposit = |x, y, item: &str| DepositConfig {
            x,
            y,
            item: item.to_string(),
        };
        Self {
            width: 20,
            height: 15,
            deposits: vec![
                deposit(5, 5, "iron_ore"),
                deposit(6, 5, "iron_ore"),
                deposit(5, 6, "iron_ore"),
                deposit(6, 6, "iron_ore"),
                deposit(15, 8, "copper_ore"),
                deposit(15, 9, "copper_ore"),
                deposit(3, 12, "coal"),
                deposit(4, 12, "coal"),
                deposit(10, 2, "quartz_ore"),
                deposit(11, 2, "quartz_ore"),
            ],
            water: vec![
                TileRef { x: 9, y: 11 },
                TileRef { x: 10, y: 11 },
                TileRef { x: 9, y: 12 },
                TileRef { x: 10, y: 12 },
            ],
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            depletion: DepletionPolicy::Infinite,
            capacities: Capacities::default(),
            timing: TimingConfig::default(),
            costs: CostConfig::default(),
            operator: OperatorConfig::default(),
            goal: GoalConfig::default(),
            terminal_item: "electronic_circuit".to_string(),
            event_log_capacity: 10,
            suppressed_events: Vec::new(),
            command_history: 0,
            recipes: standard_recipes(),
        }
    }
}

// ===========================================================================
// Loading
// ===========================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the file format from the extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, ConfigError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
        Format::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }
}

impl WorldConfig {
    /// Read a configuration file, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, format)
    }

    /// Parse configuration text. Omitted fields take their defaults.
    pub fn parse(content: &str, format: Format) -> Result<Self, ConfigError> {
        deserialize_str(content, format)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Build the registry from the recipe book and deposit layout.
    ///
    /// Item types are registered in first-mention order: deposits first,
    /// then recipe entries.
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        let mut builder = RegistryBuilder::new();
        for deposit in &self.grid.deposits {
            builder.register_item(&deposit.item);
        }
        for recipe in &self.recipes {
            let mut entries = |list: &[ItemAmount]| -> Vec<RecipeEntry> {
                list.iter()
                    .map(|e| RecipeEntry::new(builder.register_item(&e.item), e.amount))
                    .collect()
            };
            let inputs = entries(&recipe.inputs);
            let fuel = entries(&recipe.fuel);
            let outputs = entries(&recipe.outputs);
            let duration = positive_seconds(recipe.duration, &format!("recipe {}", recipe.name))?;
            builder.register_recipe(RecipeDef {
                name: recipe.name.clone(),
                building: recipe.building,
                inputs,
                fuel,
                outputs,
                duration,
            });
        }
        Ok(builder.build()?)
    }

    /// Resolve names and seconds into runtime rules.
    pub fn resolve(&self, registry: &Registry) -> Result<WorldRules, ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "grid".into(),
                reason: "width and height must be positive".into(),
            });
        }
        let lookup = |name: &str, context: &str| -> Result<ItemTypeId, ConfigError> {
            registry.item_id(name).ok_or_else(|| ConfigError::UnknownItem {
                name: name.to_string(),
                context: context.to_string(),
            })
        };
        let stacks = |list: &[ItemAmount], context: &str| -> Result<Vec<ItemStack>, ConfigError> {
            list.iter()
                .map(|e| lookup(&e.item, context).map(|id| ItemStack::new(id, e.amount)))
                .collect()
        };

        self.check_recipes_fit(registry)?;

        let mut costs = BTreeMap::new();
        for kind in BuildingKind::all() {
            let cost = stacks(self.costs.for_kind(kind), &format!("{kind} cost"))?;
            costs.insert(kind, cost);
        }
        let tracked = self
            .goal
            .tracked
            .iter()
            .map(|name| lookup(name, "goal.tracked"))
            .collect::<Result<Vec<_>, _>>()?;
        let time_limit = self
            .goal
            .time_limit
            .map(|limit| positive_seconds(limit, "goal.time_limit"))
            .transpose()?;

        Ok(WorldRules {
            capacities: self.capacities,
            mining_interval: positive_seconds(self.timing.mining_interval, "timing.mining_interval")?,
            splitter_interval: positive_seconds(
                self.timing.splitter_interval,
                "timing.splitter_interval",
            )?,
            terminal_interval: positive_seconds(
                self.timing.terminal_interval,
                "timing.terminal_interval",
            )?,
            belt_speed: positive_seconds(self.timing.belt_speed, "timing.belt_speed")?,
            terminal_item: lookup(&self.terminal_item, "terminal_item")?,
            costs,
            starting_inventory: stacks(&self.operator.starting, "operator.starting")?,
            goal_item: lookup(&self.goal.item, "goal.item")?,
            goal_target: self.goal.target,
            time_limit,
            tracked,
        })
    }

    /// A recipe whose per-type requirement exceeds the crafter input
    /// capacity, or whose output exceeds the output capacity, could never
    /// complete.
    fn check_recipes_fit(&self, registry: &Registry) -> Result<(), ConfigError> {
        let caps = &self.capacities;
        let crafters = BuildingKind::all().into_iter().filter(|k| k.is_crafter());
        for kind in crafters {
            for (_, def) in registry.recipes_for(kind) {
                for (&item_type, &amount) in &def.requirements() {
                    if amount > caps.crafter_input {
                        return Err(ConfigError::InvalidValue {
                            field: format!("recipe {}", def.name),
                            reason: format!(
                                "needs {amount} {} but crafter_input holds {}",
                                registry.item_name(item_type),
                                caps.crafter_input
                            ),
                        });
                    }
                }
                if def.total_output() > caps.crafter_output {
                    return Err(ConfigError::InvalidValue {
                        field: format!("recipe {}", def.name),
                        reason: format!(
                            "makes {} items but crafter_output holds {}",
                            def.total_output(),
                            caps.crafter_output
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Lay out terrain and deposits.
    pub fn build_grid(&self, registry: &Registry) -> Result<Grid, ConfigError> {
        let mut grid = Grid::new(self.grid.width, self.grid.height);
        for water in &self.grid.water {
            let pos = GridPosition::new(water.x, water.y);
            let tile = grid.tile_mut(pos).ok_or_else(|| out_of_bounds("grid.water", pos))?;
            tile.terrain = Terrain::Water;
        }
        for deposit in &self.grid.deposits {
            let pos = GridPosition::new(deposit.x, deposit.y);
            let item_type = registry.item_id(&deposit.item).ok_or_else(|| ConfigError::UnknownItem {
                name: deposit.item.clone(),
                context: "grid.deposits".into(),
            })?;
            let tile = grid
                .tile_mut(pos)
                .ok_or_else(|| out_of_bounds("grid.deposits", pos))?;
            if tile.terrain == Terrain::Water {
                return Err(ConfigError::InvalidValue {
                    field: "grid.deposits".into(),
                    reason: format!("deposit at {pos} is under water"),
                });
            }
            tile.deposit = Some(match self.depletion {
                DepletionPolicy::Infinite => Deposit::infinite(item_type),
                DepletionPolicy::Finite { amount } => Deposit::finite(item_type, amount),
            });
        }
        Ok(grid)
    }
}

fn positive_seconds(value: f64, field: &str) -> Result<Fixed64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: field.to_string(),
        reason,
    };
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("expected a positive number, got {value}")));
    }
    checked_f64_to_fixed64(value).ok_or_else(|| invalid(format!("{value} is out of range")))
}

fn out_of_bounds(field: &str, pos: GridPosition) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("{pos} is outside the grid"),
    }
}

// ===========================================================================
// Resolved rules
// ===========================================================================

/// Runtime parameters resolved from a [`WorldConfig`].
#[derive(Debug, Clone)]
pub struct WorldRules {
    pub capacities: Capacities,
    pub mining_interval: Fixed64,
    pub splitter_interval: Fixed64,
    pub terminal_interval: Fixed64,
    pub belt_speed: Fixed64,
    pub terminal_item: ItemTypeId,
    pub costs: BTreeMap<BuildingKind, Vec<ItemStack>>,
    pub starting_inventory: Vec<ItemStack>,
    pub goal_item: ItemTypeId,
    pub goal_target: u32,
    pub time_limit: Option<Fixed64>,
    pub tracked: Vec<ItemTypeId>,
}

impl WorldRules {
    pub fn cost(&self, kind: BuildingKind) -> &[ItemStack] {
        self.costs.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
