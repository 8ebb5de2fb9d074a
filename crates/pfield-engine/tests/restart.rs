//! Checkpoint/restart through the orchestrator.

use pfield_core::StepIndex;
use pfield_engine::{RunContext, Simulation, SimulationConfig, SimulationError};
use pfield_test_utils::ParamsBuilder;
use serde_json::{json, Value};
use tempfile::TempDir;

fn allen_cahn(max_steps: u64, output: Value) -> Simulation {
    let params = ParamsBuilder::new()
        .mesh(&[1.0, 1.0], &[8, 8], 3)
        .steps(0.01, max_steps)
        .scalar(
            "eta",
            "EXPLICIT_TIME_DEPENDENT",
            json!({ "model": "allen_cahn", "mobility": 1.0, "kappa": 0.01 }),
        )
        .with(
            "initial_condition",
            json!({ "type": "noise", "mean": 0.5, "amplitude": 0.1, "seed": 42 }),
        )
        .set("output", output)
        .to_json();
    Simulation::new(SimulationConfig::from_json(&params).unwrap()).unwrap()
}

#[test]
fn restarted_run_matches_uninterrupted_run_bit_for_bit() {
    let ctx = RunContext::new(Some(2)).unwrap();

    let full_dir = TempDir::new().unwrap();
    let mut full = allen_cahn(20, json!({ "directory": full_dir.path(), "checkpoint_on_exit": false }));
    full.build_fields().unwrap();
    full.init(&ctx).unwrap();
    full.solve(&ctx).unwrap();

    let dir = TempDir::new().unwrap();
    let mut first = allen_cahn(10, json!({ "directory": dir.path() }));
    first.build_fields().unwrap();
    first.init(&ctx).unwrap();
    first.solve(&ctx).unwrap();
    let checkpoint = first.checkpoints().path_for(10);
    assert!(checkpoint.exists());

    let mut resumed = allen_cahn(20, json!({ "directory": dir.path(), "checkpoint_on_exit": false }));
    resumed.build_fields().unwrap();
    resumed.init(&ctx).unwrap();
    resumed.restore(&checkpoint).unwrap();
    assert_eq!(resumed.time().step, StepIndex(10));
    let end = resumed.solve(&ctx).unwrap();

    assert_eq!(end, full.time());
    let a: Vec<u64> = full.values("eta").unwrap().iter().map(|v| v.to_bits()).collect();
    let b: Vec<u64> = resumed.values("eta").unwrap().iter().map(|v| v.to_bits()).collect();
    assert_eq!(a, b);
}

#[test]
fn checkpoint_of_initial_state_restores_identically() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let dir = TempDir::new().unwrap();
    let mut sim = allen_cahn(5, json!({ "directory": dir.path() }));
    sim.build_fields().unwrap();
    sim.init(&ctx).unwrap();
    let path = sim.save_checkpoint().unwrap();
    let initial = sim.values("eta").unwrap().to_vec();

    let mut other = allen_cahn(5, json!({ "directory": dir.path() }));
    other.build_fields().unwrap();
    other.init(&ctx).unwrap();
    other.restore(&path).unwrap();
    assert_eq!(other.values("eta").unwrap(), initial.as_slice());
    assert_eq!(other.time(), sim.time());
}

#[test]
fn periodic_checkpoints_are_pruned() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let dir = TempDir::new().unwrap();
    let mut sim = allen_cahn(
        10,
        json!({ "directory": dir.path(), "checkpoint_every": 2, "keep_checkpoints": 2 }),
    );
    sim.build_fields().unwrap();
    sim.init(&ctx).unwrap();
    sim.solve(&ctx).unwrap();
    let steps: Vec<u64> = sim
        .checkpoints()
        .list()
        .unwrap()
        .into_iter()
        .map(|(step, _)| step)
        .collect();
    assert_eq!(steps, vec![8, 10]);
}

#[test]
fn restore_rejects_a_different_field_layout() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let dir = TempDir::new().unwrap();
    let mut sim = allen_cahn(1, json!({ "directory": dir.path() }));
    sim.build_fields().unwrap();
    sim.init(&ctx).unwrap();
    let path = sim.save_checkpoint().unwrap();

    let params = ParamsBuilder::new()
        .mesh(&[1.0, 1.0], &[8, 8], 3)
        .scalar("c", "EXPLICIT_TIME_DEPENDENT", json!({ "model": "frozen" }))
        .set("output", json!({ "directory": dir.path() }))
        .to_json();
    let mut other = Simulation::new(SimulationConfig::from_json(&params).unwrap()).unwrap();
    other.build_fields().unwrap();
    other.init(&ctx).unwrap();
    let err = other.restore(&path).unwrap_err();
    assert!(matches!(err, SimulationError::Checkpoint(_)));
}

#[test]
fn restore_latest_without_checkpoints_is_an_error() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let dir = TempDir::new().unwrap();
    let mut sim = allen_cahn(1, json!({ "directory": dir.path().join("empty") }));
    sim.build_fields().unwrap();
    sim.init(&ctx).unwrap();
    assert!(sim.restore_latest().is_err());
}

#[test]
fn integrated_fields_are_written_on_cadence() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let dir = TempDir::new().unwrap();
    let mut sim = allen_cahn(
        6,
        json!({ "directory": dir.path(), "postprocess_every": 2, "checkpoint_on_exit": false }),
    );
    sim.build_fields().unwrap();
    sim.init(&ctx).unwrap();
    sim.solve(&ctx).unwrap();
    let text = std::fs::read_to_string(dir.path().join("integratedFields.txt")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l.starts_with("time ") && l.contains("\teta ")));
}

#[test]
fn resumed_run_continues_the_integrated_fields_history() {
    let ctx = RunContext::new(Some(1)).unwrap();
    let output = |dir: &TempDir, on_exit: bool| {
        json!({ "directory": dir.path(), "postprocess_every": 1, "checkpoint_on_exit": on_exit })
    };

    let full_dir = TempDir::new().unwrap();
    let mut full = allen_cahn(5, output(&full_dir, false));
    full.build_fields().unwrap();
    full.init(&ctx).unwrap();
    full.solve(&ctx).unwrap();

    let dir = TempDir::new().unwrap();
    let mut first = allen_cahn(3, output(&dir, true));
    first.build_fields().unwrap();
    first.init(&ctx).unwrap();
    first.solve(&ctx).unwrap();

    let mut resumed = allen_cahn(5, output(&dir, false));
    resumed.build_fields().unwrap();
    resumed.init(&ctx).unwrap();
    resumed.restore_latest().unwrap();
    assert_eq!(resumed.time().step, StepIndex(3));
    resumed.solve(&ctx).unwrap();

    let read = |dir: &TempDir| std::fs::read_to_string(dir.path().join("integratedFields.txt")).unwrap();
    let expected = read(&full_dir);
    assert_eq!(expected.lines().count(), 6);
    assert_eq!(read(&dir), expected);
}
