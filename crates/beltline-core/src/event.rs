//! Bounded, host-visible event log.
//!
//! The engine records notable happenings (placements, crafts, collections,
//! rejected commands, goal changes) into an [`EventLog`] ring buffer with a
//! fixed capacity. When full, the oldest entries are dropped.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventLog::suppress`]; suppressed
//! events are never recorded and do not count toward `total_written`.

use crate::building::BuildingKind;
use crate::fixed::Ticks;
use crate::grid::{Direction, GridPosition};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A log-worthy simulation event. Item and recipe names are resolved when
/// the event is recorded so entries render without the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEvent {
    BuildingPlaced {
        kind: BuildingKind,
        position: GridPosition,
    },
    BuildingRemoved {
        kind: BuildingKind,
        position: GridPosition,
        discarded: u32,
    },
    BuildingRotated {
        position: GridPosition,
        facing: Direction,
    },
    RecipeAssigned {
        position: GridPosition,
        recipe: String,
    },
    TerminalItemSet {
        position: GridPosition,
        item: String,
    },
    ItemsCollected {
        position: GridPosition,
        quantity: u32,
    },
    ResourceMined {
        position: GridPosition,
        item: String,
    },
    ItemCrafted {
        position: GridPosition,
        item: String,
        quantity: u32,
    },
    CommandRejected {
        reason: String,
    },
    GoalReached {
        item: String,
        target: u32,
    },
    GoalExpired {
        item: String,
        produced: u32,
        target: u32,
    },
}

/// Discriminant tag for log events, used for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BuildingPlaced,
    BuildingRemoved,
    BuildingRotated,
    RecipeAssigned,
    TerminalItemSet,
    ItemsCollected,
    ResourceMined,
    ItemCrafted,
    CommandRejected,
    GoalReached,
    GoalExpired,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 11;

impl LogEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LogEvent::BuildingPlaced { .. } => EventKind::BuildingPlaced,
            LogEvent::BuildingRemoved { .. } => EventKind::BuildingRemoved,
            LogEvent::BuildingRotated { .. } => EventKind::BuildingRotated,
            LogEvent::RecipeAssigned { .. } => EventKind::RecipeAssigned,
            LogEvent::TerminalItemSet { .. } => EventKind::TerminalItemSet,
            LogEvent::ItemsCollected { .. } => EventKind::ItemsCollected,
            LogEvent::ResourceMined { .. } => EventKind::ResourceMined,
            LogEvent::ItemCrafted { .. } => EventKind::ItemCrafted,
            LogEvent::CommandRejected { .. } => EventKind::CommandRejected,
            LogEvent::GoalReached { .. } => EventKind::GoalReached,
            LogEvent::GoalExpired { .. } => EventKind::GoalExpired,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::BuildingPlaced { kind, position } => {
                write!(f, "placed {kind} at {position}")
            }
            LogEvent::BuildingRemoved {
                kind,
                position,
                discarded,
            } => {
                write!(f, "removed {kind} at {position}")?;
                if *discarded > 0 {
                    write!(f, " ({discarded} items discarded)")?;
                }
                Ok(())
            }
            LogEvent::BuildingRotated { position, facing } => {
                write!(f, "building at {position} now faces {facing}")
            }
            LogEvent::RecipeAssigned { position, recipe } => {
                write!(f, "building at {position} now makes {recipe}")
            }
            LogEvent::TerminalItemSet { position, item } => {
                write!(f, "terminal at {position} now ships {item}")
            }
            LogEvent::ItemsCollected { position, quantity } => {
                write!(f, "collected {quantity} items from {position}")
            }
            LogEvent::ResourceMined { position, item } => {
                write!(f, "mined 1 {item} at {position}")
            }
            LogEvent::ItemCrafted {
                position,
                item,
                quantity,
            } => write!(f, "crafted {quantity} {item} at {position}"),
            LogEvent::CommandRejected { reason } => write!(f, "rejected: {reason}"),
            LogEvent::GoalReached { item, target } => {
                write!(f, "goal reached: crafted {target} {item}")
            }
            LogEvent::GoalExpired {
                item,
                produced,
                target,
            } => write!(f, "time is up: crafted {produced}/{target} {item}"),
        }
    }
}

/// An event stamped with the tick it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: Ticks,
    pub event: LogEvent,
}

// ---------------------------------------------------------------------------
// EventLog -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EventLog {
    entries: Vec<Option<LogEntry>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total entries ever written (including dropped).
    total_written: u64,
    suppressed: [bool; EVENT_KIND_COUNT],
}

impl EventLog {
    /// Create a log with the given capacity. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            suppressed: [false; EVENT_KIND_COUNT],
        }
    }

    /// Record an event. If full, the oldest entry is dropped.
    pub fn push(&mut self, tick: Ticks, event: LogEvent) {
        if self.is_suppressed(event.kind()) {
            return;
        }
        self.entries[self.head] = Some(LogEntry { tick, event });
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of entries that were dropped because the log was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over entries from oldest to newest.
    pub fn iter(&self) -> EventLogIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventLogIter {
            log: self,
            index: start,
            remaining: self.len,
        }
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&LogEntry> {
        let skip = self.len.saturating_sub(n);
        self.iter().skip(skip).collect()
    }
}

/// Iterator over entries in an [`EventLog`], from oldest to newest.
pub struct EventLogIter<'a> {
    log: &'a EventLog,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventLogIter<'a> {
    type Item = &'a LogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.log.entries[self.index].as_ref();
        self.index = (self.index + 1) % self.log.capacity();
        self.remaining -= 1;
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventLogIter<'_> {}
