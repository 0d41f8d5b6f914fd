//! Hand-off of a single item into a destination building.
//!
//! The Router decides acceptance purely from the destination's kind and
//! capacity. A refused item is returned to the caller, and neither side is
//! changed.

use crate::building::{Building, BuildingState};
use crate::item::Item;

/// Offer one item to `dest`.
///
/// | destination        | accepts when                                  |
/// |--------------------|-----------------------------------------------|
/// | furnace/assembler  | count of that type in the input < capacity    |
/// | splitter, chest    | buffer length < capacity                      |
/// | shipping terminal  | type is the accepted one and length < capacity|
/// | conveyor belt      | fewer than two items on the segment           |
/// | miner              | never                                         |
pub fn offer(dest: &mut Building, item: Item) -> Result<(), Item> {
    match &mut dest.state {
        BuildingState::Miner(_) => Err(item),
        BuildingState::Furnace(c) | BuildingState::Assembler(c) => c.input.try_insert(item),
        BuildingState::Splitter(s) => s.input.try_insert(item),
        BuildingState::StorageChest(c) => c.buffer.try_insert(item),
        BuildingState::ShippingTerminal(t) => {
            if item.item_type != t.accepts {
                return Err(item);
            }
            t.input.try_insert(item)
        }
        BuildingState::ConveyorBelt(b) => b.accept(item),
    }
}
