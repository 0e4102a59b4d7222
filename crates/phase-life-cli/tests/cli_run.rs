use phase_life_cli::{benchmark, format_summary, load_config, run, write_outputs};
use phase_life_core::{RunSummary, SimConfig, WorldSnapshot};
use std::fs;
use tempfile::tempdir;

fn small_config() -> SimConfig {
    SimConfig {
        seed: 9,
        grid_size: 12,
        initial_cells: 40,
        turns: 20,
        ..SimConfig::default()
    }
}

#[test]
fn load_config_accepts_partial_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "seed": 5, "grid_size": 20, "initial_cells": 15 }"#).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.seed, 5);
    assert_eq!(config.grid_size, 20);
    assert_eq!(config.initial_cells, 15);
    assert_eq!(config.turns, SimConfig::default().turns);
}

#[test]
fn load_config_rejects_invalid_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "grid_size": 1 }"#).unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("validation"));
}

#[test]
fn load_config_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("failed to open config file"));
}

#[test]
fn run_writes_summary_snapshot_and_memoirs() {
    let dir = tempdir().unwrap();
    let output = run(small_config(), None, 5).unwrap();
    assert_eq!(output.summary.turns, 20);
    assert_eq!(output.summary.samples.len(), 4);
    assert!(output.orphans.is_empty());

    write_outputs(dir.path(), &output).unwrap();
    let summary: RunSummary =
        serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary.final_alive_count, output.summary.final_alive_count);
    let snapshot: WorldSnapshot = serde_json::from_str(
        &fs::read_to_string(dir.path().join("final_snapshot.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(snapshot, output.snapshot);
    assert!(dir.path().join("memoirs.json").exists());
}

#[test]
fn turn_override_wins_over_config() {
    let output = run(small_config(), Some(3), 1).unwrap();
    assert_eq!(output.summary.turns, 3);
    assert_eq!(output.snapshot.turn, 3);
    assert!(format_summary(&output).contains("Turns:          3"));
}

#[test]
fn runs_with_same_config_agree() {
    let a = run(small_config(), Some(15), 5).unwrap();
    let b = run(small_config(), Some(15), 5).unwrap();
    assert_eq!(a.snapshot, b.snapshot);
    assert_eq!(a.memoirs, b.memoirs);
}

#[test]
fn benchmark_reports_throughput() {
    let result = benchmark(10, 1, 5).unwrap();
    assert_eq!(result.initial_cells, 20);
    assert_eq!(result.turns, 5);
    assert!(result.turns_per_sec > 0.0);
}
