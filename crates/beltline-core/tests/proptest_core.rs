//! Property-based tests for the Beltline core engine.
//!
//! Uses proptest to generate random command and tick sequences against the
//! sandbox world, then verify structural invariants hold.

use beltline_core::building::BuildingKind;
use beltline_core::command::{Command, CommandOutcome};
use beltline_core::engine::Engine;
use beltline_core::fixed::Fixed64;
use beltline_core::grid::Direction;
use beltline_core::test_utils::*;
use beltline_core::validation::{ScriptStep, check_invariants, run_script, validate_determinism};
use proptest::prelude::*;

const RECIPES: [&str; 9] = [
    "iron_plate",
    "copper_plate",
    "glass",
    "copper_wire",
    "electronic_circuit",
    "gear",
    "robot_body",
    "robot",
    "nonsense",
];

const ITEMS: [&str; 4] = ["iron_ore", "iron_plate", "electronic_circuit", "nonsense"];

const DELTAS: [f64; 5] = [0.0, 0.1, 0.25, 0.5, 1.0];

// ===========================================================================
// Generators
// ===========================================================================

/// Tile coordinates, including one ring outside the 10x8 sandbox.
fn arb_xy() -> impl Strategy<Value = (i32, i32)> {
    (-1..11i32, -1..9i32)
}

fn arb_kind() -> impl Strategy<Value = BuildingKind> {
    prop::sample::select(BuildingKind::all().to_vec())
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::all().to_vec())
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        4 => (arb_xy(), arb_kind(), arb_direction())
            .prop_map(|((x, y), kind, facing)| Command::PlaceBuilding { x, y, kind, facing }),
        1 => arb_xy().prop_map(|(x, y)| Command::RemoveBuilding { x, y }),
        1 => arb_xy().prop_map(|(x, y)| Command::RotateBuilding { x, y }),
        2 => (arb_xy(), prop::sample::select(RECIPES.to_vec())).prop_map(|((x, y), r)| {
            Command::SetBuildingRecipe {
                x,
                y,
                recipe: r.to_string(),
            }
        }),
        1 => (arb_xy(), prop::sample::select(ITEMS.to_vec())).prop_map(|((x, y), i)| {
            Command::SetTerminalItem {
                x,
                y,
                item: i.to_string(),
            }
        }),
        1 => arb_xy().prop_map(|(x, y)| Command::CollectFromBuilding { x, y }),
        1 => arb_xy().prop_map(|(x, y)| Command::MineResource { x, y }),
    ]
}

fn arb_step() -> impl Strategy<Value = ScriptStep> {
    prop_oneof![
        3 => arb_command().prop_map(ScriptStep::Apply),
        1 => arb_command().prop_map(ScriptStep::Submit),
        3 => prop::sample::select(DELTAS.to_vec()).prop_map(|dt| ScriptStep::Tick(secs(dt))),
    ]
}

fn arb_script(max_steps: usize) -> impl Strategy<Value = Vec<ScriptStep>> {
    proptest::collection::vec(arb_step(), 1..=max_steps)
}

/// Everything a command may touch, for before/after comparison.
fn observable(engine: &Engine) -> impl PartialEq + std::fmt::Debug + use<> {
    let deposits: Vec<_> = engine
        .grid()
        .positions()
        .filter_map(|pos| engine.grid().tile(pos).and_then(|t| t.deposit))
        .collect();
    (
        engine.snapshot_all_buildings(),
        engine.operator_inventory().stacks(),
        deposits,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// No sequence of commands and ticks breaks a structural invariant.
    #[test]
    fn invariants_hold_after_every_step(script in arb_script(80)) {
        let mut engine = sandbox();
        for step in &script {
            run_script(&mut engine, std::slice::from_ref(step));
            let violations = check_invariants(&engine);
            prop_assert!(violations.is_empty(), "violations after {:?}: {:?}", step, violations);
        }
    }

    /// Two engines fed the same script agree on every tick's hash.
    #[test]
    fn identical_scripts_agree(script in arb_script(60)) {
        let result = validate_determinism(&sandbox_config(), &script).unwrap();
        prop_assert!(result.is_deterministic);
        prop_assert_eq!(result.divergence_tick, None);
    }

    /// A rejected command leaves buildings, the operator, and deposits
    /// untouched.
    #[test]
    fn rejected_commands_do_not_mutate(
        setup in arb_script(40),
        command in arb_command(),
    ) {
        let mut engine = sandbox();
        run_script(&mut engine, &setup);
        let before = observable(&engine);
        if engine.apply(&command).is_err() {
            prop_assert_eq!(observable(&engine), before);
        }
    }

    /// Collection moves exactly the reported counts into the operator.
    #[test]
    fn collection_conserves_items(setup in arb_script(40), (x, y) in arb_xy()) {
        let mut engine = sandbox();
        run_script(&mut engine, &setup);
        let held_before = engine.operator_inventory().total();
        let stored_before = engine.building_at(x, y).map_or(0, |b| b.stored_items());

        if let Ok(CommandOutcome::Collected { items }) =
            engine.apply(&Command::CollectFromBuilding { x, y })
        {
            let moved: u32 = items.iter().map(|s| s.quantity).sum();
            prop_assert_eq!(engine.operator_inventory().total(), held_before + moved);
            let stored_after = engine.building_at(x, y).map_or(0, |b| b.stored_items());
            prop_assert_eq!(stored_after, stored_before - moved);
        }
    }

    /// Elapsed time is exactly the sum of the deltas ticked.
    #[test]
    fn elapsed_is_sum_of_deltas(deltas in proptest::collection::vec(0..DELTAS.len(), 1..40)) {
        let mut engine = sandbox();
        let mut expected = Fixed64::ZERO;
        for &i in &deltas {
            let dt = secs(DELTAS[i]);
            expected += dt;
            engine.tick(dt);
        }
        prop_assert_eq!(engine.elapsed(), expected);
        prop_assert_eq!(engine.tick_count(), deltas.len() as u64);
    }
}
