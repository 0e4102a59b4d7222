pub mod cell;
pub mod config;
pub mod constants;
pub mod environment;
pub mod field;
pub mod metrics;
pub mod phase;
pub mod recorder;
pub mod rng;
pub mod snapshot;
pub mod world;

pub use cell::{Cell, CellKey, CellTraits, DeathCause};
pub use config::{SimConfig, SimConfigError};
pub use constants::MAX_GRID_SIZE;
pub use environment::Environment;
pub use metrics::{DeathCounts, PhaseCensus, PopulationStats, RunSummary, TurnCounters, TurnMetrics};
pub use phase::{Phase, PhaseTable, PhaseThresholds, TraitBundle, TraitRange};
pub use recorder::{Memoir, MemoirRecorder, NullRecorder, Recorder, TraitSnapshot};
pub use snapshot::{CellSnapshot, WorldSnapshot};
pub use world::{
    ExperimentError, MoveOutcome, ReproductionOutcome, World, WorldError, WorldInitError,
};
