//! Production goal and throughput tracking.
//!
//! The tracker observes crafting completions and shipments reported by the
//! engine and derives completion status and per-item production rates using
//! [`Fixed64`] arithmetic.

use crate::fixed::Fixed64;
use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Status and rates
// ---------------------------------------------------------------------------

/// Where the goal stands. `Completed` and `Expired` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    InProgress,
    Completed {
        at: Fixed64,
    },
    Expired {
        at: Fixed64,
    },
}

impl GoalStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, GoalStatus::InProgress)
    }
}

/// Units per second, derived from the gap between the two most recent units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rate {
    Finite(Fixed64),
    /// Two units completed with no time between them.
    Unbounded,
}

/// Rate estimate for a single tracked item type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RateTracker {
    produced: u64,
    last_at: Option<Fixed64>,
    rate: Option<Rate>,
}

impl RateTracker {
    fn record(&mut self, now: Fixed64) {
        if let Some(prev) = self.last_at {
            let gap = now - prev;
            self.rate = Some(if gap <= Fixed64::ZERO {
                Rate::Unbounded
            } else {
                Fixed64::ONE
                    .checked_div(gap)
                    .map_or(Rate::Unbounded, Rate::Finite)
            });
        }
        self.last_at = Some(now);
        self.produced += 1;
    }
}

// ---------------------------------------------------------------------------
// GoalTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GoalTracker {
    item: ItemTypeId,
    target: u32,
    produced: u32,
    shipped: u64,
    time_limit: Option<Fixed64>,
    status: GoalStatus,
    rates: BTreeMap<ItemTypeId, RateTracker>,
}

impl GoalTracker {
    /// Track crafting of `target` units of `item`. The goal item always has
    /// a rate estimate; `tracked` adds more.
    pub fn new(
        item: ItemTypeId,
        target: u32,
        time_limit: Option<Fixed64>,
        tracked: impl IntoIterator<Item = ItemTypeId>,
    ) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(item, RateTracker::default());
        for t in tracked {
            rates.entry(t).or_default();
        }
        Self {
            item,
            target,
            produced: 0,
            shipped: 0,
            time_limit,
            status: GoalStatus::InProgress,
            rates,
        }
    }

    /// Record crafted output at simulation time `now`.
    pub fn record_production(&mut self, item_type: ItemTypeId, quantity: u32, now: Fixed64) {
        if item_type == self.item {
            self.produced = self.produced.saturating_add(quantity);
        }
        if let Some(tracker) = self.rates.get_mut(&item_type) {
            for _ in 0..quantity {
                tracker.record(now);
            }
        }
    }

    /// Record one item leaving through a shipping terminal.
    pub fn record_shipment(&mut self) {
        self.shipped += 1;
    }

    /// Re-evaluate the status at `now`. Returns the new status when it
    /// changed.
    pub fn evaluate(&mut self, now: Fixed64) -> Option<GoalStatus> {
        if self.status.is_final() {
            return None;
        }
        if self.produced >= self.target {
            self.status = GoalStatus::Completed { at: now };
        } else if self.time_limit.is_some_and(|limit| now >= limit) {
            self.status = GoalStatus::Expired { at: now };
        } else {
            return None;
        }
        Some(self.status)
    }

    pub fn item(&self) -> ItemTypeId {
        self.item
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn produced(&self) -> u32 {
        self.produced
    }

    pub fn shipped(&self) -> u64 {
        self.shipped
    }

    pub fn status(&self) -> GoalStatus {
        self.status
    }

    pub fn time_limit(&self) -> Option<Fixed64> {
        self.time_limit
    }

    /// Seconds left before the time limit, floored at zero.
    pub fn remaining(&self, now: Fixed64) -> Option<Fixed64> {
        self.time_limit.map(|limit| (limit - now).max(Fixed64::ZERO))
    }

    /// Latest production rate of a tracked item; `None` until two units
    /// have been produced.
    pub fn rate(&self, item_type: ItemTypeId) -> Option<Rate> {
        self.rates.get(&item_type).and_then(|t| t.rate)
    }

    /// Goal units produced per second of elapsed simulation time.
    pub fn average_rate(&self, now: Fixed64) -> Option<Fixed64> {
        if now <= Fixed64::ZERO {
            return None;
        }
        Fixed64::from_num(self.produced).checked_div(now)
    }

    /// Tracked item types with their rates, by item type id.
    pub fn rates(&self) -> impl Iterator<Item = (ItemTypeId, Option<Rate>)> + '_ {
        self.rates.iter().map(|(&t, tracker)| (t, tracker.rate))
    }

    /// Units of a tracked item produced so far.
    pub fn tracked_count(&self, item_type: ItemTypeId) -> Option<u64> {
        self.rates.get(&item_type).map(|t| t.produced)
    }
}
