//! Splitters: one ordered input, two ordered outputs, round-robin
//! distribution on a fixed interval.

use crate::fixed::Fixed64;
use crate::grid::Direction;
use crate::item::Inventory;
use serde::{Deserialize, Serialize};

/// One of a splitter's two output ports.
///
/// `Left` ("A") faces the splitter's facing rotated counter-clockwise,
/// `Right` ("B") faces it rotated clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Port {
    Left,
    Right,
}

impl Port {
    pub fn index(self) -> usize {
        match self {
            Port::Left => 0,
            Port::Right => 1,
        }
    }

    pub fn other(self) -> Port {
        match self {
            Port::Left => Port::Right,
            Port::Right => Port::Left,
        }
    }

    /// Direction this port emits toward for a splitter facing `facing`.
    pub fn direction(self, facing: Direction) -> Direction {
        match self {
            Port::Left => facing.rotate_ccw(),
            Port::Right => facing.rotate_cw(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splitter {
    pub input: Inventory,
    /// Indexed by [`Port::index`].
    pub outputs: [Inventory; 2],
    pub timer: Fixed64,
    pub interval: Fixed64,
    pub last_used: Option<Port>,
}

impl Splitter {
    pub fn new(interval: Fixed64, input_capacity: u32, output_capacity: u32) -> Self {
        Self {
            input: Inventory::ordered(input_capacity),
            outputs: [
                Inventory::ordered(output_capacity),
                Inventory::ordered(output_capacity),
            ],
            timer: Fixed64::ZERO,
            interval,
            last_used: None,
        }
    }

    pub fn output(&self, port: Port) -> &Inventory {
        &self.outputs[port.index()]
    }

    pub fn output_mut(&mut self, port: Port) -> &mut Inventory {
        &mut self.outputs[port.index()]
    }

    /// The port the next item goes to, or `None` if both are full.
    ///
    /// With both open, the port not used last wins; the very first item goes
    /// to `Left`.
    pub fn next_port(&self) -> Option<Port> {
        let preferred = self.last_used.map_or(Port::Left, Port::other);
        [preferred, preferred.other()]
            .into_iter()
            .find(|&port| self.output(port).headroom() > 0)
    }

    /// Advance the distribution timer. Returns the port that received an
    /// item, if any.
    pub fn update(&mut self, dt: Fixed64) -> Option<Port> {
        self.timer = self.timer.saturating_add(dt);
        if self.timer < self.interval {
            return None;
        }
        self.timer = Fixed64::ZERO;
        let port = self.next_port()?;
        let item = self.input.pop_front()?;
        if let Err(item) = self.output_mut(port).try_insert(item) {
            self.input.push_front(item);
            return None;
        }
        self.last_used = Some(port);
        Some(port)
    }
}
