use crate::cell::{Cell, DeathCause};
use crate::environment::Environment;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathCounts {
    pub starvation: usize,
    pub age: usize,
    pub squish: usize,
    pub disintegration: usize,
}

impl DeathCounts {
    pub fn record(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::Starvation => self.starvation += 1,
            DeathCause::Age => self.age += 1,
            DeathCause::Squish => self.squish += 1,
            DeathCause::Disintegration => self.disintegration += 1,
        }
    }

    pub fn get(&self, cause: DeathCause) -> usize {
        match cause {
            DeathCause::Starvation => self.starvation,
            DeathCause::Age => self.age,
            DeathCause::Squish => self.squish,
            DeathCause::Disintegration => self.disintegration,
        }
    }

    pub fn total(&self) -> usize {
        self.starvation + self.age + self.squish + self.disintegration
    }
}

/// Event tallies. The world keeps one for the turn in progress and one for
/// the whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnCounters {
    pub births: usize,
    pub failed_births: usize,
    pub forced_spawns: usize,
    pub failed_forced_spawns: usize,
    pub moves: usize,
    pub pushes: usize,
    pub escapes: usize,
    pub blocked_moves: usize,
    pub squishes: usize,
    pub phase_transitions: usize,
    pub phase_stable: usize,
    pub disintegrations: usize,
    /// Cells taken off the grid, whatever the reason.
    pub removals: usize,
    pub deaths: DeathCounts,
}

impl TurnCounters {
    pub fn accumulate(&mut self, other: &TurnCounters) {
        self.births += other.births;
        self.failed_births += other.failed_births;
        self.forced_spawns += other.forced_spawns;
        self.failed_forced_spawns += other.failed_forced_spawns;
        self.moves += other.moves;
        self.pushes += other.pushes;
        self.escapes += other.escapes;
        self.blocked_moves += other.blocked_moves;
        self.squishes += other.squishes;
        self.phase_transitions += other.phase_transitions;
        self.phase_stable += other.phase_stable;
        self.disintegrations += other.disintegrations;
        self.removals += other.removals;
        self.deaths.starvation += other.deaths.starvation;
        self.deaths.age += other.deaths.age;
        self.deaths.squish += other.deaths.squish;
        self.deaths.disintegration += other.deaths.disintegration;
    }
}

/// Number of cells present in each phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseCensus {
    pub plasma: usize,
    pub gas: usize,
    pub liquid: usize,
    pub mesophase: usize,
    pub solid: usize,
    pub inert: usize,
}

impl PhaseCensus {
    pub fn add(&mut self, phase: Phase) {
        match phase {
            Phase::Plasma => self.plasma += 1,
            Phase::Gas => self.gas += 1,
            Phase::Liquid => self.liquid += 1,
            Phase::Mesophase => self.mesophase += 1,
            Phase::Solid => self.solid += 1,
            Phase::Inert => self.inert += 1,
        }
    }

    pub fn get(&self, phase: Phase) -> usize {
        match phase {
            Phase::Plasma => self.plasma,
            Phase::Gas => self.gas,
            Phase::Liquid => self.liquid,
            Phase::Mesophase => self.mesophase,
            Phase::Solid => self.solid,
            Phase::Inert => self.inert,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationStats {
    pub alive_count: usize,
    /// Dead cells still on the grid, shedding mass.
    pub dead_present: usize,
    pub mean_energy: f32,
    pub mean_age: f32,
    pub max_generation: u32,
    /// Census of live cells by phase.
    pub phases: PhaseCensus,
}

impl PopulationStats {
    pub fn collect<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut stats = Self::default();
        let mut energy_sum = 0.0f64;
        let mut age_sum = 0.0f64;
        for cell in cells {
            if !cell.alive {
                stats.dead_present += 1;
                continue;
            }
            stats.alive_count += 1;
            energy_sum += cell.energy as f64;
            age_sum += cell.age as f64;
            stats.max_generation = stats.max_generation.max(cell.generation);
            stats.phases.add(cell.phase);
        }
        if stats.alive_count > 0 {
            stats.mean_energy = (energy_sum / stats.alive_count as f64) as f32;
            stats.mean_age = (age_sum / stats.alive_count as f64) as f32;
        }
        stats
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnMetrics {
    pub turn: u64,
    pub population: PopulationStats,
    pub counters: TurnCounters,
    pub light_total: f64,
    pub attractiveness_total: f64,
    pub inert_total: f64,
    pub best_attractiveness: f32,
    pub top_energy: f32,
}

pub fn collect_turn_metrics<'a>(
    turn: u64,
    cells: impl IntoIterator<Item = &'a Cell>,
    counters: &TurnCounters,
    environment: &Environment,
    best_attractiveness: f32,
    top_energy: f32,
) -> TurnMetrics {
    TurnMetrics {
        turn,
        population: PopulationStats::collect(cells),
        counters: counters.clone(),
        light_total: environment.light().total(),
        attractiveness_total: environment.attractiveness().total(),
        inert_total: environment.inert().total(),
        best_attractiveness,
        top_energy,
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub turns: usize,
    pub sample_every: usize,
    pub final_alive_count: usize,
    pub samples: Vec<TurnMetrics>,
    /// Counters accumulated over the turns of this run only.
    #[serde(default)]
    pub totals: TurnCounters,
}
