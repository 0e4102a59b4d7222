use crate::cell::{Cell, CellKey, DeathCause};
use crate::config::{SimConfig, SimConfigError};
use crate::environment::{Environment, FieldDecay};
use crate::metrics::{collect_turn_metrics, PopulationStats, RunSummary, TurnCounters};
use crate::phase::Phase;
use crate::recorder::Recorder;
use crate::rng::create_rng;
use crate::snapshot::{CellSnapshot, WorldSnapshot};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha12Rng;
use slotmap::SlotMap;
use std::{error::Error, fmt};
use tracing::{debug, error, info};

/// Result of one `move` step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Dead, or too little energy to move.
    Inactive,
    Moved,
    /// Moved into a slot freed by pushing its occupant.
    Pushed,
    Blocked,
}

/// Result of one `reproduce` step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReproductionOutcome {
    Ineligible,
    Born(CellKey),
    /// Target slot taken; the parent still paid a smaller cost.
    Failed,
    Disintegrated { removed: bool },
}

/// Faults that mean the grid and the cell arena no longer agree. Fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    OccupancyMismatch { x: usize, y: usize },
    SquishChainOverflow { depth: usize },
    DeadCellAction { cell_id: u64 },
    UnknownCell,
    Halted,
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::OccupancyMismatch { x, y } => {
                write!(f, "occupancy grid and cell position disagree at ({x}, {y})")
            }
            WorldError::SquishChainOverflow { depth } => {
                write!(f, "displacement chain exceeded depth {depth}")
            }
            WorldError::DeadCellAction { cell_id } => {
                write!(f, "dead cell {cell_id} was asked to act")
            }
            WorldError::UnknownCell => write!(f, "grid references a cell that does not exist"),
            WorldError::Halted => write!(f, "world halted after a fatal error"),
        }
    }
}

impl Error for WorldError {}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManyTurns { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
    World(WorldError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManyTurns { max, actual } => {
                write!(f, "turns ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
            ExperimentError::World(e) => write!(f, "{}", e),
        }
    }
}

impl From<WorldError> for ExperimentError {
    fn from(err: WorldError) -> Self {
        ExperimentError::World(err)
    }
}

impl Error for ExperimentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExperimentError::World(e) => Some(e),
            _ => None,
        }
    }
}

pub struct World {
    // Keep config private to preserve constructor invariants.
    config: SimConfig,
    environment: Environment,
    cells: SlotMap<CellKey, Cell>,
    rng: ChaCha12Rng,
    recorder: Box<dyn Recorder>,
    turn: u64,
    next_cell_id: u64,
    best_attractiveness: f32,
    top_energy: f32,
    turn_counters: TurnCounters,
    total_counters: TurnCounters,
    halted: bool,
}

impl World {
    pub const MAX_EXPERIMENT_TURNS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig, recorder: Box<dyn Recorder>) -> Result<Self, WorldInitError> {
        config.validate()?;
        let mut rng = create_rng(config.seed);
        let mut environment =
            Environment::new(config.grid_size, config.light_max, config.attractiveness_max);
        environment.seed_light(config.initial_light_max, &mut rng);

        let mut world = Self {
            environment,
            cells: SlotMap::with_capacity_and_key(config.initial_cells),
            rng,
            recorder,
            turn: 0,
            next_cell_id: 0,
            best_attractiveness: 0.0,
            top_energy: 0.0,
            turn_counters: TurnCounters::default(),
            total_counters: TurnCounters::default(),
            halted: false,
            config,
        };
        world.seed_population();
        info!(
            seed = world.config.seed,
            grid_size = world.config.grid_size,
            cells = world.cells.len(),
            "world constructed"
        );
        Ok(world)
    }

    fn seed_population(&mut self) {
        let size = self.config.grid_size;
        let mut slots: Vec<usize> = (0..self.config.capacity()).collect();
        slots.shuffle(&mut self.rng);
        for idx in slots.into_iter().take(self.config.initial_cells) {
            let energy = self.config.initial_energy.sample(&mut self.rng);
            self.spawn_cell_at((idx % size) as i64, (idx / size) as i64, energy);
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of completed turns.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn key_at(&self, x: i64, y: i64) -> Option<CellKey> {
        self.environment.cell_at(x, y)
    }

    pub fn cell_at(&self, x: i64, y: i64) -> Option<&Cell> {
        self.key_at(x, y).and_then(|key| self.cells.get(key))
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.cells.iter()
    }

    /// Cells on the grid, live or shedding mass.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn alive_count(&self) -> usize {
        self.cells.values().filter(|c| c.alive).count()
    }

    pub fn last_turn_counters(&self) -> &TurnCounters {
        &self.turn_counters
    }

    pub fn total_counters(&self) -> &TurnCounters {
        &self.total_counters
    }

    /// Highest attractiveness any cell has reached.
    pub fn best_attractiveness(&self) -> f32 {
        self.best_attractiveness
    }

    /// Highest energy any cell has ended a turn with.
    pub fn top_energy(&self) -> f32 {
        self.top_energy
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats::collect(self.cells.values())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let cells = self
            .environment
            .occupancy()
            .iter()
            .filter_map(|slot| slot.and_then(|key| self.cells.get(key)))
            .map(CellSnapshot::from)
            .collect();
        WorldSnapshot {
            turn: self.turn,
            size: self.environment.size(),
            light: self.environment.light().data().to_vec(),
            attractiveness: self.environment.attractiveness().data().to_vec(),
            inert: self.environment.inert().data().to_vec(),
            signal: self.environment.signal().data().to_vec(),
            cells,
        }
    }

    /// Place a fresh cell at `(x, y)` on behalf of an outside caller. Returns
    /// `false` if the slot is taken.
    pub fn attempt_spawn(&mut self, x: i64, y: i64) -> bool {
        if !self.environment.can_place_cell_at(x, y) {
            self.tally(|c| c.failed_forced_spawns += 1);
            debug!(x, y, "forced spawn refused, slot occupied");
            return false;
        }
        let energy = self.config.initial_energy.sample(&mut self.rng);
        match self.spawn_cell_at(x, y, energy) {
            Some(key) => {
                self.tally(|c| c.forced_spawns += 1);
                debug!(cell_id = self.cells[key].id, x, y, energy, "forced spawn");
                true
            }
            None => {
                self.tally(|c| c.failed_forced_spawns += 1);
                false
            }
        }
    }

    /// Advance the simulation by one turn.
    ///
    /// The signal snapshot is rebuilt first, then every occupied slot is
    /// visited once in row-major order, then the fields are enriched and
    /// decayed, then the grid is checked against every cell's position. Any
    /// error is fatal and leaves the world halted.
    pub fn advance_turn(&mut self) -> Result<(), WorldError> {
        if self.halted {
            return Err(WorldError::Halted);
        }
        self.turn += 1;
        self.turn_counters = TurnCounters::default();
        self.environment
            .recompute_signal(&self.cells, &self.config.signal_weights);

        if let Err(err) = self.scan_grid().and_then(|()| self.finish_turn()) {
            error!(turn = self.turn, %err, "simulation halted");
            self.halted = true;
            return Err(err);
        }
        Ok(())
    }

    pub fn try_run_experiment(
        &mut self,
        turns: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if turns > Self::MAX_EXPERIMENT_TURNS {
            return Err(ExperimentError::TooManyTurns {
                max: Self::MAX_EXPERIMENT_TURNS,
                actual: turns,
            });
        }
        let estimated_samples = if turns == 0 {
            0
        } else {
            ((turns - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let mut totals = TurnCounters::default();
        let mut samples = Vec::with_capacity(estimated_samples);
        for turn in 1..=turns {
            self.advance_turn()?;
            totals.accumulate(&self.turn_counters);
            if turn % sample_every == 0 || turn == turns {
                samples.push(collect_turn_metrics(
                    self.turn,
                    self.cells.values(),
                    &self.turn_counters,
                    &self.environment,
                    self.best_attractiveness,
                    self.top_energy,
                ));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            turns,
            sample_every,
            final_alive_count: self.alive_count(),
            samples,
            totals,
        })
    }

    /// Check that the grid and every cell's cached position agree.
    pub fn verify_occupancy(&self) -> Result<(), WorldError> {
        let size = self.environment.size();
        for (idx, slot) in self.environment.occupancy().iter().enumerate() {
            let Some(key) = slot else { continue };
            let (x, y) = (idx % size, idx / size);
            match self.cells.get(*key) {
                Some(cell) if cell.x == x && cell.y == y => {}
                _ => return Err(WorldError::OccupancyMismatch { x, y }),
            }
        }
        for (key, cell) in &self.cells {
            if self.environment.cell_at(cell.x as i64, cell.y as i64) != Some(key) {
                return Err(WorldError::OccupancyMismatch {
                    x: cell.x,
                    y: cell.y,
                });
            }
        }
        Ok(())
    }

    fn scan_grid(&mut self) -> Result<(), WorldError> {
        for idx in 0..self.config.capacity() {
            let Some(key) = self.environment.cell_at_index(idx) else {
                continue;
            };
            let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
            // Cells pushed or moved ahead in raster order were already handled.
            if cell.last_turn == Some(self.turn) {
                continue;
            }
            cell.last_turn = Some(self.turn);
            self.update_cell(key)?;
        }
        Ok(())
    }

    /// Run one cell's pipeline: move, absorb, phase, reproduce, decay, emit.
    /// Dead cells only shed mass.
    fn update_cell(&mut self, key: CellKey) -> Result<(), WorldError> {
        let alive = self
            .cells
            .get(key)
            .ok_or(WorldError::UnknownCell)?
            .alive;
        if !alive {
            self.step_reproduce(key)?;
            return Ok(());
        }
        self.step_move(key)?;
        self.step_absorb(key)?;
        self.step_phase(key)?;
        self.step_reproduce(key)?;
        if !self.cells.contains_key(key) {
            return Ok(());
        }
        self.step_decay(key)?;
        self.step_emit(key)?;
        Ok(())
    }

    fn finish_turn(&mut self) -> Result<(), WorldError> {
        let decay = FieldDecay {
            light: self.config.light_decay,
            attractiveness: self.config.attractiveness_decay,
            inert: self.config.inert_decay,
        };
        self.environment.enrich_and_decay(
            self.config.enrichment_sources,
            self.config.enrichment_amount,
            decay,
            &mut self.rng,
        );
        self.verify_occupancy()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_cell_id;
        self.next_cell_id += 1;
        id
    }

    /// Bump a counter for both the current turn and the whole run.
    fn tally(&mut self, bump: impl Fn(&mut TurnCounters)) {
        bump(&mut self.turn_counters);
        bump(&mut self.total_counters);
    }

    fn spawn_cell_at(&mut self, x: i64, y: i64, energy: f32) -> Option<CellKey> {
        if !self.environment.can_place_cell_at(x, y) {
            return None;
        }
        let id = self.next_id();
        let (cx, cy) = self.environment.wrap(x, y);
        let cell = Cell::spawn(id, cx, cy, energy, &self.config, &mut self.rng);
        self.insert_placed(cell)
    }

    /// Store `cell` in the arena at its own coordinates and report the birth.
    fn insert_placed(&mut self, cell: Cell) -> Option<CellKey> {
        let (x, y) = (cell.x as i64, cell.y as i64);
        let key = self.cells.insert(cell);
        if !self
            .environment
            .place_cell_at(key, &mut self.cells[key], x, y)
        {
            self.cells.remove(key);
            return None;
        }
        self.recorder.on_birth(self.turn, &self.cells[key]);
        Some(key)
    }

    /// Kill a live cell in place. It keeps its slot until it has shed its mass.
    fn mark_dead(&mut self, key: CellKey, cause: DeathCause) {
        let Some(cell) = self.cells.get_mut(key) else {
            return;
        };
        if !cell.alive {
            return;
        }
        cell.alive = false;
        cell.death_cause = Some(cause);
        cell.traits.mass += cell.energy;
        cell.energy = 0.0;
        cell.phase = Phase::Inert;
        let (x, y) = (cell.x as i64, cell.y as i64);
        let (id, age) = (cell.id, cell.age);
        let pulse = cell.traits.light_emission * self.config.death_release_light;

        self.environment
            .add_inert(x, y, self.config.death_release_inert);
        if pulse > 0.0 {
            self.environment.add_light(x, y, pulse);
        }
        self.tally(|c| c.deaths.record(cause));
        if let Some(cell) = self.cells.get_mut(key) {
            if !cell.death_recorded {
                cell.death_recorded = true;
                self.recorder.on_death(self.turn, cell, cause);
            }
        }
        debug!(cell_id = id, age, %cause, "cell died");
    }

    /// Take a cell off the grid and out of the arena.
    fn remove_cell(&mut self, key: CellKey) -> Result<Cell, WorldError> {
        let cell = self.cells.get(key).ok_or(WorldError::UnknownCell)?;
        let (x, y) = (cell.x, cell.y);
        if self.environment.cell_at(x as i64, y as i64) != Some(key) {
            return Err(WorldError::OccupancyMismatch { x, y });
        }
        self.environment.remove_cell_at(x as i64, y as i64);
        let cell = self.cells.remove(key).ok_or(WorldError::UnknownCell)?;
        self.tally(|c| c.removals += 1);
        Ok(cell)
    }
}

mod phases;
