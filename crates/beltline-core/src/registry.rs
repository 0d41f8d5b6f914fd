use crate::building::BuildingKind;
use crate::fixed::Fixed64;
use crate::id::*;
use std::collections::{BTreeMap, HashMap};

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemTypeDef {
    pub name: String,
}

/// A recipe input/fuel/output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeEntry {
    pub item: ItemTypeId,
    pub quantity: u32,
}

impl RecipeEntry {
    pub fn new(item: ItemTypeId, quantity: u32) -> Self {
        Self { item, quantity }
    }
}

/// A crafting transformation performed by one building kind.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub building: BuildingKind,
    pub inputs: Vec<RecipeEntry>,
    /// Consumed alongside the inputs. Empty means no fuel.
    pub fuel: Vec<RecipeEntry>,
    pub outputs: Vec<RecipeEntry>,
    /// Crafting time in seconds.
    pub duration: Fixed64,
}

impl RecipeDef {
    /// Inputs and fuel summed per item type.
    pub fn requirements(&self) -> BTreeMap<ItemTypeId, u32> {
        let mut req = BTreeMap::new();
        for entry in self.inputs.iter().chain(self.fuel.iter()) {
            *req.entry(entry.item).or_insert(0) += entry.quantity;
        }
        req
    }

    /// Total number of output units one completion produces.
    pub fn total_output(&self) -> u32 {
        self.outputs.iter().map(|e| e.quantity).sum()
    }
}

/// Builder for constructing an immutable Registry.
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. Registering an existing name returns the
    /// existing ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        if let Some(&id) = self.item_name_to_id.get(name) {
            return id;
        }
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
        });
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a recipe. Returns its ID. Validation happens in [`build`](Self::build).
    pub fn register_recipe(&mut self, recipe: RecipeDef) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(recipe);
        id
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut recipe_key_to_id = HashMap::new();
        for (index, recipe) in self.recipes.iter().enumerate() {
            if !recipe.building.is_crafter() {
                return Err(RegistryError::NotACrafter {
                    recipe: recipe.name.clone(),
                    building: recipe.building,
                });
            }
            for entry in recipe
                .inputs
                .iter()
                .chain(recipe.fuel.iter())
                .chain(recipe.outputs.iter())
            {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(RegistryError::InvalidItemRef(entry.item));
                }
            }
            if recipe.total_output() == 0 {
                return Err(RegistryError::NoOutputs(recipe.name.clone()));
            }
            if recipe.duration <= Fixed64::ZERO {
                return Err(RegistryError::NonPositiveDuration(recipe.name.clone()));
            }
            let key = (recipe.building, recipe.name.clone());
            if recipe_key_to_id
                .insert(key, RecipeId(index as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateRecipe {
                    recipe: recipe.name.clone(),
                    building: recipe.building,
                });
            }
        }

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes: self.recipes,
            recipe_key_to_id,
        })
    }
}

/// Immutable registry of item types and recipes. Frozen after build().
#[derive(Debug)]
pub struct Registry {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    recipe_key_to_id: HashMap<(BuildingKind, String), RecipeId>,
}

impl Registry {
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    /// Name of an item type, or `"?"` for an id this registry never issued.
    pub fn item_name(&self, id: ItemTypeId) -> &str {
        self.get_item(id).map(|d| d.name.as_str()).unwrap_or("?")
    }

    /// Lookup a recipe registered for `building` under `name`.
    pub fn recipe_id(&self, building: BuildingKind, name: &str) -> Option<RecipeId> {
        self.recipe_key_to_id
            .get(&(building, name.to_string()))
            .copied()
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    /// Recipes available to one building kind, in registration order.
    pub fn recipes_for(&self, building: BuildingKind) -> impl Iterator<Item = (RecipeId, &RecipeDef)> {
        self.recipes
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.building == building)
            .map(|(i, r)| (RecipeId(i as u32), r))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("recipe {recipe:?} is registered twice for {building}")]
    DuplicateRecipe {
        recipe: String,
        building: BuildingKind,
    },
    #[error("recipe {recipe:?} targets {building}, which does not craft")]
    NotACrafter {
        recipe: String,
        building: BuildingKind,
    },
    #[error("recipe {0:?} produces nothing")]
    NoOutputs(String),
    #[error("recipe {0:?} must take a positive amount of time")]
    NonPositiveDuration(String),
}
