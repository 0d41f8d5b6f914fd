//! Plain-text views of an engine for the terminal.

use std::fmt::Write as _;

use beltline_core::building::{BuildingKind, BuildingStatus};
use beltline_core::engine::Engine;
use beltline_core::fixed::fixed64_to_f64;
use beltline_core::goal::{GoalStatus, Rate};
use beltline_core::grid::{Direction, Terrain};
use beltline_core::registry::RecipeEntry;

fn glyph(kind: BuildingKind, facing: Direction) -> char {
    match kind {
        BuildingKind::Miner => 'M',
        BuildingKind::Furnace => 'F',
        BuildingKind::Assembler => 'A',
        BuildingKind::Splitter => 'S',
        BuildingKind::StorageChest => 'C',
        BuildingKind::ShippingTerminal => 'T',
        BuildingKind::ConveyorBelt => match facing {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        },
    }
}

/// One character per tile: buildings by kind (belts by facing), deposits by
/// the first letter of their item, `~` for water, `.` for empty ground.
pub fn map(engine: &Engine) -> String {
    let grid = engine.grid();
    let mut out = String::new();
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let Some(info) = engine.tile_info(x, y) else {
                continue;
            };
            let c = if let Some(b) = &info.building {
                glyph(b.kind, b.facing)
            } else if let Some(d) = info.deposit {
                engine
                    .registry()
                    .item_name(d.item_type)
                    .chars()
                    .next()
                    .unwrap_or('?')
            } else if info.terrain == Terrain::Water {
                '~'
            } else {
                '.'
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

fn rate(rate: Option<Rate>) -> String {
    match rate {
        None => "-".to_string(),
        Some(Rate::Unbounded) => "burst".to_string(),
        Some(Rate::Finite(r)) => format!("{:.2}/s", fixed64_to_f64(r)),
    }
}

/// Goal status, tracked rates, and shipments.
pub fn goal(engine: &Engine) -> String {
    let progress = engine.goal_progress();
    let registry = engine.registry();
    let mut out = String::new();
    let status = match progress.status {
        GoalStatus::InProgress => "in progress".to_string(),
        GoalStatus::Completed { at } => format!("completed at {:.2}s", fixed64_to_f64(at)),
        GoalStatus::Expired { at } => format!("expired at {:.2}s", fixed64_to_f64(at)),
    };
    let _ = writeln!(
        out,
        "goal: {}/{} {} ({status})",
        progress.produced,
        progress.target,
        registry.item_name(progress.item),
    );
    if let Some(left) = progress.remaining_time {
        let _ = writeln!(out, "time left: {:.1}s", fixed64_to_f64(left));
    }
    if let Some(avg) = progress.average_rate {
        let _ = writeln!(out, "average: {:.3}/s", fixed64_to_f64(avg));
    }
    let _ = writeln!(out, "shipped: {}", progress.shipped);
    for tracked in &progress.rates {
        let _ = writeln!(
            out,
            "  {:<20} {:>6} made, latest {}",
            registry.item_name(tracked.item_type),
            tracked.produced,
            rate(tracked.rate),
        );
    }
    out
}

/// One line per building that is not idle or working.
pub fn trouble(engine: &Engine) -> String {
    let mut out = String::new();
    for snap in engine.snapshot_all_buildings() {
        if matches!(snap.status, BuildingStatus::Idle | BuildingStatus::Working) {
            continue;
        }
        let _ = writeln!(out, "  {} at {}: {:?}", snap.kind, snap.position, snap.status);
    }
    out
}

/// The recipe book, grouped by building kind.
pub fn recipes(engine: &Engine) -> String {
    let registry = engine.registry();
    let entries = |list: &[RecipeEntry]| {
        list.iter()
            .map(|e| format!("{} {}", e.quantity, registry.item_name(e.item)))
            .collect::<Vec<_>>()
            .join(" + ")
    };
    let mut out = String::new();
    for kind in BuildingKind::all().into_iter().filter(|k| k.is_crafter()) {
        let _ = writeln!(out, "{kind}:");
        for (_, def) in registry.recipes_for(kind) {
            let _ = write!(out, "  {:<20} {}", def.name, entries(&def.inputs));
            if !def.fuel.is_empty() {
                let _ = write!(out, " (fuel {})", entries(&def.fuel));
            }
            let _ = writeln!(
                out,
                " -> {} in {}s",
                entries(&def.outputs),
                fixed64_to_f64(def.duration)
            );
        }
    }
    out
}

pub fn events(engine: &Engine, n: usize) -> String {
    let mut out = String::new();
    for entry in engine.recent_events(n) {
        let _ = writeln!(out, "  [{:>5}] {}", entry.tick, entry.event);
    }
    out
}
