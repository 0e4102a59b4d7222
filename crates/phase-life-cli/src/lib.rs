//! Driver functions behind the `phase-life` binary. Kept in a library so the
//! integration tests can call them without spawning a process.

use anyhow::{Context, Result};
use phase_life_core::{Memoir, MemoirRecorder, RunSummary, SimConfig, World, WorldSnapshot};
use serde::Serialize;
use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const WARMUP_TURNS: usize = 10;
pub const BENCHMARK_TURNS: usize = 200;

/// Route `tracing` events to stderr, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<SimConfig> {
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutput {
    pub summary: RunSummary,
    pub snapshot: WorldSnapshot,
    pub memoirs: Vec<Memoir>,
    pub orphans: Vec<u64>,
}

/// Build a world from `config` and advance it `turns` turns, or
/// `config.turns` when not given.
pub fn run(config: SimConfig, turns: Option<usize>, sample_every: usize) -> Result<RunOutput> {
    let turns = turns.unwrap_or(config.turns);
    let recorder = Rc::new(RefCell::new(MemoirRecorder::new()));
    let mut world =
        World::new(config, Box::new(recorder.clone())).context("failed to initialize world")?;
    info!(turns, sample_every, "run started");

    let summary = world
        .try_run_experiment(turns, sample_every)
        .context("simulation failed")?;
    let archive = recorder.borrow();
    info!(
        final_alive = summary.final_alive_count,
        memoirs = archive.memoirs().len(),
        "run complete"
    );
    Ok(RunOutput {
        summary,
        snapshot: world.snapshot(),
        memoirs: archive.memoirs().to_vec(),
        orphans: archive.orphans().to_vec(),
    })
}

/// Write `summary.json`, `final_snapshot.json` and `memoirs.json` into `out_dir`.
pub fn write_outputs(out_dir: &Path, output: &RunOutput) -> Result<()> {
    std::fs::create_dir_all(out_dir).context("failed to create output directory")?;
    write_json(&out_dir.join("summary.json"), &output.summary)?;
    write_json(&out_dir.join("final_snapshot.json"), &output.snapshot)?;
    write_json(&out_dir.join("memoirs.json"), &output.memoirs)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Human-readable digest of a run.
pub fn format_summary(output: &RunOutput) -> String {
    let summary = &output.summary;
    let totals = &summary.totals;
    let mut lines = vec![
        format!("Turns:          {}", summary.turns),
        format!("Final alive:    {}", summary.final_alive_count),
        format!(
            "Births:         {} ({} failed, {} forced)",
            totals.births, totals.failed_births, totals.forced_spawns
        ),
        format!(
            "Deaths:         {} (starvation {}, age {}, squish {}, disintegration {})",
            totals.deaths.total(),
            totals.deaths.starvation,
            totals.deaths.age,
            totals.deaths.squish,
            totals.deaths.disintegration
        ),
        format!(
            "Moves:          {} ({} pushes, {} blocked)",
            totals.moves, totals.pushes, totals.blocked_moves
        ),
        format!("Phase changes:  {}", totals.phase_transitions),
    ];
    if let Some(last) = summary.samples.last() {
        lines.push(format!(
            "Top energy:     {:.1}, best attractiveness {:.2}",
            last.top_energy, last.best_attractiveness
        ));
    }
    if !output.orphans.is_empty() {
        lines.push(format!("Orphan deaths:  {}", output.orphans.len()));
    }
    lines.join("\n")
}

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkResult {
    pub grid_size: usize,
    pub initial_cells: usize,
    pub turns: usize,
    pub avg_turn_us: f64,
    pub turns_per_sec: f64,
    pub final_alive: usize,
}

/// Time `turns` turns on a grid of `grid_size` seeded to one cell in five.
pub fn benchmark(grid_size: usize, seed: u64, turns: usize) -> Result<BenchmarkResult> {
    let initial_cells = grid_size * grid_size / 5;
    let config = SimConfig {
        seed,
        grid_size,
        initial_cells,
        ..SimConfig::default()
    };
    let mut world = World::new(config, Box::new(phase_life_core::NullRecorder))
        .context("benchmark config validation error")?;

    for _ in 0..WARMUP_TURNS {
        world.advance_turn().context("warmup turn failed")?;
    }
    let started = Instant::now();
    for _ in 0..turns {
        world.advance_turn().context("benchmark turn failed")?;
    }
    let elapsed_us = started.elapsed().as_secs_f64() * 1_000_000.0;
    let avg_turn_us = elapsed_us / turns.max(1) as f64;

    Ok(BenchmarkResult {
        grid_size,
        initial_cells,
        turns,
        avg_turn_us,
        turns_per_sec: if avg_turn_us > 0.0 {
            1_000_000.0 / avg_turn_us
        } else {
            f64::INFINITY
        },
        final_alive: world.alive_count(),
    })
}
