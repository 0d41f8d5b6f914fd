use crate::fixed::Fixed64;
use crate::grid::Direction;
use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A single unit of some item type.
///
/// `position` is only meaningful while the item rides a conveyor segment:
/// 0.0 is the entry edge, 1.0 the exit edge. `provenance` records the facing
/// of the segment the item most recently left and is cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_type: ItemTypeId,
    pub position: Fixed64,
    pub provenance: Option<Direction>,
}

impl Item {
    pub fn new(item_type: ItemTypeId) -> Self {
        Self {
            item_type,
            position: Fixed64::ZERO,
            provenance: None,
        }
    }
}

/// A quantity of one item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// How an inventory stores and bounds its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryPolicy {
    /// FIFO sequence of item instances. Capacity bounds the total length.
    Ordered,
    /// Per-type counts. Capacity bounds the count of each type separately.
    Counted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Contents {
    Ordered(VecDeque<Item>),
    Counted(BTreeMap<ItemTypeId, u32>),
}

/// A capacity-bound container of items under one [`InventoryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    capacity: u32,
    contents: Contents,
}

impl Inventory {
    pub fn ordered(capacity: u32) -> Self {
        Self {
            capacity,
            contents: Contents::Ordered(VecDeque::new()),
        }
    }

    pub fn counted(capacity: u32) -> Self {
        Self {
            capacity,
            contents: Contents::Counted(BTreeMap::new()),
        }
    }

    pub fn policy(&self) -> InventoryPolicy {
        match self.contents {
            Contents::Ordered(_) => InventoryPolicy::Ordered,
            Contents::Counted(_) => InventoryPolicy::Counted,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether one more unit of `item_type` would fit.
    pub fn can_accept(&self, item_type: ItemTypeId) -> bool {
        match &self.contents {
            Contents::Ordered(items) => (items.len() as u32) < self.capacity,
            Contents::Counted(counts) => {
                counts.get(&item_type).copied().unwrap_or(0) < self.capacity
            }
        }
    }

    /// Insert one item. On refusal the item is handed back unchanged.
    pub fn try_insert(&mut self, item: Item) -> Result<(), Item> {
        if !self.can_accept(item.item_type) {
            return Err(item);
        }
        match &mut self.contents {
            Contents::Ordered(items) => items.push_back(item),
            Contents::Counted(counts) => *counts.entry(item.item_type).or_insert(0) += 1,
        }
        Ok(())
    }

    /// Add fresh units of `item_type`. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let mut overflow = 0;
        for _ in 0..quantity {
            if self.try_insert(Item::new(item_type)).is_err() {
                overflow += 1;
            }
        }
        overflow
    }

    /// Remove up to `quantity` units of `item_type`. Returns the amount
    /// actually removed. Counted entries that reach zero are deleted.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        match &mut self.contents {
            Contents::Ordered(items) => {
                let mut removed = 0;
                items.retain(|item| {
                    if removed < quantity && item.item_type == item_type {
                        removed += 1;
                        false
                    } else {
                        true
                    }
                });
                removed
            }
            Contents::Counted(counts) => {
                let Some(count) = counts.get_mut(&item_type) else {
                    return 0;
                };
                let removed = quantity.min(*count);
                *count -= removed;
                if *count == 0 {
                    counts.remove(&item_type);
                }
                removed
            }
        }
    }

    /// The oldest item of an ordered inventory. Counted inventories have no
    /// front and always return `None`.
    pub fn front(&self) -> Option<&Item> {
        match &self.contents {
            Contents::Ordered(items) => items.front(),
            Contents::Counted(_) => None,
        }
    }

    /// Take the oldest item of an ordered inventory.
    pub fn pop_front(&mut self) -> Option<Item> {
        match &mut self.contents {
            Contents::Ordered(items) => items.pop_front(),
            Contents::Counted(_) => None,
        }
    }

    /// Put an item back at the front of an ordered inventory, undoing a
    /// [`pop_front`](Self::pop_front) whose hand-off failed.
    pub(crate) fn push_front(&mut self, item: Item) {
        match &mut self.contents {
            Contents::Ordered(items) => items.push_front(item),
            Contents::Counted(counts) => *counts.entry(item.item_type).or_insert(0) += 1,
        }
    }

    /// Get quantity of a specific item type.
    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        match &self.contents {
            Contents::Ordered(items) => {
                items.iter().filter(|i| i.item_type == item_type).count() as u32
            }
            Contents::Counted(counts) => counts.get(&item_type).copied().unwrap_or(0),
        }
    }

    /// Total items across all types.
    pub fn total(&self) -> u32 {
        match &self.contents {
            Contents::Ordered(items) => items.len() as u32,
            Contents::Counted(counts) => counts.values().sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Free slots of an ordered inventory. For counted inventories this is
    /// the headroom of the fullest type.
    pub fn headroom(&self) -> u32 {
        match &self.contents {
            Contents::Ordered(items) => self.capacity.saturating_sub(items.len() as u32),
            Contents::Counted(counts) => {
                let fullest = counts.values().copied().max().unwrap_or(0);
                self.capacity.saturating_sub(fullest)
            }
        }
    }

    /// Whether every `(type, amount)` requirement is met.
    pub fn contains_all(&self, requirements: &BTreeMap<ItemTypeId, u32>) -> bool {
        requirements
            .iter()
            .all(|(&item_type, &amount)| self.quantity(item_type) >= amount)
    }

    /// Item types in storage order (ordered) or by type id (counted).
    pub fn item_types(&self) -> Vec<ItemTypeId> {
        match &self.contents {
            Contents::Ordered(items) => items.iter().map(|i| i.item_type).collect(),
            Contents::Counted(counts) => counts
                .iter()
                .flat_map(|(&t, &n)| std::iter::repeat_n(t, n as usize))
                .collect(),
        }
    }

    /// Per-type totals, sorted by item type id.
    pub fn stacks(&self) -> Vec<ItemStack> {
        let mut totals: BTreeMap<ItemTypeId, u32> = BTreeMap::new();
        match &self.contents {
            Contents::Ordered(items) => {
                for item in items {
                    *totals.entry(item.item_type).or_insert(0) += 1;
                }
            }
            Contents::Counted(counts) => totals.clone_from(counts),
        }
        totals
            .into_iter()
            .map(|(t, n)| ItemStack::new(t, n))
            .collect()
    }

    /// Move as many items as `dest` accepts into it. Items `dest` refuses
    /// stay here in their original order. Returns the moved counts by type.
    pub fn transfer_into(&mut self, dest: &mut Inventory) -> BTreeMap<ItemTypeId, u32> {
        let mut moved: BTreeMap<ItemTypeId, u32> = BTreeMap::new();
        match &mut self.contents {
            Contents::Ordered(items) => {
                let mut kept = VecDeque::with_capacity(items.len());
                for item in items.drain(..) {
                    match dest.try_insert(item) {
                        Ok(()) => *moved.entry(item.item_type).or_insert(0) += 1,
                        Err(item) => kept.push_back(item),
                    }
                }
                *items = kept;
            }
            Contents::Counted(counts) => {
                for (&item_type, count) in counts.iter_mut() {
                    let overflow = dest.add(item_type, *count);
                    let accepted = *count - overflow;
                    if accepted > 0 {
                        moved.insert(item_type, accepted);
                    }
                    *count = overflow;
                }
                counts.retain(|_, n| *n > 0);
            }
        }
        moved
    }
}
