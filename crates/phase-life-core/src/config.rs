use crate::phase::{Phase, PhaseTable, PhaseThresholds, TraitRange};
use serde::{Deserialize, Serialize};

/// Weights of the normalized trait sum a cell uses as its attractiveness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractivenessWeights {
    pub energy: f32,
    pub age: f32,
    pub growth_rate: f32,
    pub resilience: f32,
    pub perception: f32,
    pub speed: f32,
    pub light_emission: f32,
    pub mass: f32,
    pub height: f32,
    /// Divisor applied to the weighted sum.
    pub norm: f32,
}

impl Default for AttractivenessWeights {
    fn default() -> Self {
        Self {
            energy: 0.5,
            age: 0.5,
            growth_rate: 50.0,
            resilience: 0.5,
            perception: 0.5,
            speed: 0.5,
            light_emission: 0.5,
            mass: 0.1,
            height: 0.1,
            norm: 70.0,
        }
    }
}

impl AttractivenessWeights {
    fn is_valid(&self) -> bool {
        let weights = [
            self.energy,
            self.age,
            self.growth_rate,
            self.resilience,
            self.perception,
            self.speed,
            self.light_emission,
            self.mass,
            self.height,
        ];
        weights.iter().all(|w| w.is_finite() && *w >= 0.0)
            && self.norm.is_finite()
            && self.norm > 0.0
    }
}

/// Weights of the composite per-turn signal field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub light: f32,
    pub attractiveness: f32,
    pub inert: f32,
    /// Subtracted per point of resilience of a live occupant.
    pub occupant_resilience_penalty: f32,
    /// Added per point of light emission of a live occupant.
    pub occupant_emission_bonus: f32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            light: 1.0,
            attractiveness: 0.5,
            inert: 0.2,
            occupant_resilience_penalty: 0.5,
            occupant_emission_bonus: 0.01,
        }
    }
}

impl SignalWeights {
    fn is_valid(&self) -> bool {
        [
            self.light,
            self.attractiveness,
            self.inert,
            self.occupant_resilience_penalty,
            self.occupant_emission_bonus,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible runs.
    pub seed: u64,
    /// Edge length of the square toroidal grid.
    pub grid_size: usize,
    /// Cells scattered over the grid when the world is built.
    pub initial_cells: usize,
    /// Turns the driver advances by default.
    pub turns: usize,
    /// Energy band boundaries.
    pub thresholds: PhaseThresholds,
    /// Trait ranges seeded into freshly spawned cells, per phase.
    pub phase_traits: PhaseTable,
    /// Starting energy of seeded and force-spawned cells.
    pub initial_energy: TraitRange,

    /// Upper bound of the uniform light drawn into every slot at start.
    pub initial_light_max: f32,
    /// Light field ceiling.
    pub light_max: f32,
    /// Attractiveness field ceiling.
    pub attractiveness_max: f32,
    /// Light added by one enrichment burst.
    pub enrichment_amount: f32,
    /// Bursts injected per turn.
    pub enrichment_sources: usize,
    /// Subtracted from every light slot each turn.
    pub light_decay: f32,
    /// Subtracted from every attractiveness slot each turn.
    pub attractiveness_decay: f32,
    /// Subtracted from every inert slot each turn.
    pub inert_decay: f32,
    /// Light removed per unit of energy absorbed.
    pub absorption_waste: f32,
    pub signal_weights: SignalWeights,
    /// Fraction of a cell's light emission added to the light field each turn.
    pub emission_scale: f32,

    /// Cells below this energy do not move.
    pub move_energy_min: f32,
    /// Placement attempts per turn before a move gives up.
    pub move_attempts: usize,
    /// Energy paid by a cell that escapes a push.
    pub escape_energy_cost: f32,
    /// Resilience gained by a cell that escapes a push.
    pub escape_resilience_gain: f32,
    /// Fraction of a squished cell's energy handed to the occupant.
    pub squish_ratio: TraitRange,
    /// Divisor applied to parent energy after a successful birth.
    pub reproduction_success_cost: f32,
    /// Divisor applied to parent energy after a failed birth.
    pub reproduction_failure_cost: f32,
    /// Share of the parent's shed energy the child starts with.
    pub child_energy_share: f32,
    /// Fraction of the attractiveness record that also triggers reproduction.
    pub attractiveness_record_fraction: f32,
    /// Per-turn fractional loss of growth rate.
    pub growth_decay_rate: f32,
    /// Scale of the speed/resilience weighted energy loss per turn.
    pub decay_energy_base: f32,
    pub age_per_turn: f32,
    /// Relative jitter applied to life expectancy when checking for old age.
    pub life_expectancy_jitter: f32,
    /// Energy above the running record tolerated before it is taxed.
    pub excess_energy_tolerance: f32,
    /// Fraction of the excess above the record removed each turn.
    pub excess_energy_tax: f32,
    pub attractiveness_weights: AttractivenessWeights,
    /// Relative luck lost by a child per unit of parent age.
    pub luck_age_decay: f32,
    /// Fraction of `min(age, mass)` shed per disintegration turn.
    pub disintegration_fraction: f32,
    /// Smallest mass shed per disintegration turn.
    pub disintegration_min_chunk: f32,
    /// Inert matter dropped where a cell dies.
    pub death_release_inert: f32,
    /// Light pulse per unit of emission released where an emitting cell dies.
    pub death_release_light: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_size: 100,
            initial_cells: 2_000,
            turns: 1_000,
            thresholds: PhaseThresholds::default(),
            phase_traits: PhaseTable::default(),
            initial_energy: TraitRange::new(0.0, 200.0),
            initial_light_max: 5.0,
            light_max: 1_000.0,
            attractiveness_max: 100.0,
            enrichment_amount: 500.0,
            enrichment_sources: 100,
            light_decay: 0.05,
            attractiveness_decay: 0.05,
            inert_decay: 0.01,
            absorption_waste: 1.2,
            signal_weights: SignalWeights::default(),
            emission_scale: 0.01,
            move_energy_min: 10.0,
            move_attempts: 4,
            escape_energy_cost: 1.0,
            escape_resilience_gain: 0.5,
            squish_ratio: TraitRange::new(0.2, 0.6),
            reproduction_success_cost: 5.0,
            reproduction_failure_cost: 1.1,
            child_energy_share: 0.5,
            attractiveness_record_fraction: 0.9,
            growth_decay_rate: 0.01,
            decay_energy_base: 1.0,
            age_per_turn: 1.0,
            life_expectancy_jitter: 0.1,
            excess_energy_tolerance: 1.0,
            excess_energy_tax: 0.3,
            attractiveness_weights: AttractivenessWeights::default(),
            luck_age_decay: 0.001,
            disintegration_fraction: 0.1,
            disintegration_min_chunk: 1.0,
            death_release_inert: 200.0,
            death_release_light: 0.5,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidGridSize => "grid_size must be greater than 1";
    GridSizeTooLarge { max: usize, actual: usize } => "grid_size ({actual}) exceeds supported maximum ({max})";
    TooManyInitialCells { max: usize, actual: usize } => "initial_cells ({actual}) exceeds grid capacity ({max})";
    InvalidThresholds => "phase thresholds must be finite, non-negative and strictly decreasing from plasma to solid";
    InvalidTraitRange { phase: Phase, name: &'static str } => "{phase} trait range `{name}` must be finite, non-negative and ordered (min <= max)";
    InvalidInitialEnergy => "initial_energy must be finite, non-negative and ordered";
    InvalidInitialLight => "initial_light_max must be finite, non-negative and <= light_max";
    InvalidLightMax => "light_max must be finite and positive";
    InvalidAttractivenessMax => "attractiveness_max must be finite and positive";
    InvalidEnrichmentAmount => "enrichment_amount must be finite and non-negative";
    InvalidFieldDecay => "light_decay, attractiveness_decay and inert_decay must be finite and non-negative";
    InvalidAbsorptionWaste => "absorption_waste must be finite and non-negative";
    InvalidSignalWeights => "signal weights must be finite and non-negative";
    InvalidEmissionScale => "emission_scale must be finite and non-negative";
    InvalidMoveEnergyMin => "move_energy_min must be finite and non-negative";
    InvalidMoveAttempts => "move_attempts must be positive";
    InvalidEscapeCost => "escape_energy_cost and escape_resilience_gain must be finite and non-negative";
    InvalidSquishRatio => "squish_ratio must be ordered and within [0,1]";
    InvalidReproductionCost => "reproduction costs must be finite and >= 1";
    InvalidReproductionCostOrder => "reproduction_failure_cost must not exceed reproduction_success_cost";
    InvalidChildEnergyShare => "child_energy_share must be finite and within [0,1]";
    InvalidAttractivenessRecordFraction => "attractiveness_record_fraction must be finite and within [0,1]";
    InvalidGrowthDecayRate => "growth_decay_rate must be finite and within [0,1]";
    InvalidDecayEnergyBase => "decay_energy_base must be finite and non-negative";
    InvalidAgePerTurn => "age_per_turn must be finite and positive";
    InvalidLifeExpectancyJitter => "life_expectancy_jitter must be finite and within [0,1)";
    InvalidExcessEnergy => "excess_energy_tolerance must be non-negative and excess_energy_tax within [0,1]";
    InvalidAttractivenessWeights => "attractiveness weights must be finite and non-negative with a positive norm";
    InvalidLuckAgeDecay => "luck_age_decay must be finite and non-negative";
    InvalidDisintegration => "disintegration_fraction must be within (0,1] and disintegration_min_chunk positive";
    InvalidDeathRelease => "death_release_inert and death_release_light must be finite and non-negative";
}

impl std::error::Error for SimConfigError {}

fn finite_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

impl SimConfig {
    pub const MAX_GRID_SIZE: usize = crate::constants::MAX_GRID_SIZE;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_grid()?;
        self.validate_phases()?;
        self.validate_environment()?;
        self.validate_movement()?;
        self.validate_reproduction()?;
        self.validate_decay()?;
        Ok(())
    }

    /// Number of slots on the grid.
    pub fn capacity(&self) -> usize {
        self.grid_size * self.grid_size
    }

    fn validate_grid(&self) -> Result<(), SimConfigError> {
        if self.grid_size < 2 {
            return Err(SimConfigError::InvalidGridSize);
        }
        if self.grid_size > Self::MAX_GRID_SIZE {
            return Err(SimConfigError::GridSizeTooLarge {
                max: Self::MAX_GRID_SIZE,
                actual: self.grid_size,
            });
        }
        if self.initial_cells > self.capacity() {
            return Err(SimConfigError::TooManyInitialCells {
                max: self.capacity(),
                actual: self.initial_cells,
            });
        }
        Ok(())
    }

    fn validate_phases(&self) -> Result<(), SimConfigError> {
        if !self.thresholds.is_valid() {
            return Err(SimConfigError::InvalidThresholds);
        }
        if let Some((phase, name)) = self.phase_traits.first_invalid() {
            return Err(SimConfigError::InvalidTraitRange { phase, name });
        }
        if !self.initial_energy.is_valid() {
            return Err(SimConfigError::InvalidInitialEnergy);
        }
        Ok(())
    }

    fn validate_environment(&self) -> Result<(), SimConfigError> {
        if !(self.light_max.is_finite() && self.light_max > 0.0) {
            return Err(SimConfigError::InvalidLightMax);
        }
        if !(finite_non_negative(self.initial_light_max) && self.initial_light_max <= self.light_max)
        {
            return Err(SimConfigError::InvalidInitialLight);
        }
        if !(self.attractiveness_max.is_finite() && self.attractiveness_max > 0.0) {
            return Err(SimConfigError::InvalidAttractivenessMax);
        }
        if !finite_non_negative(self.enrichment_amount) {
            return Err(SimConfigError::InvalidEnrichmentAmount);
        }
        if !(finite_non_negative(self.light_decay)
            && finite_non_negative(self.attractiveness_decay)
            && finite_non_negative(self.inert_decay))
        {
            return Err(SimConfigError::InvalidFieldDecay);
        }
        if !finite_non_negative(self.absorption_waste) {
            return Err(SimConfigError::InvalidAbsorptionWaste);
        }
        if !self.signal_weights.is_valid() {
            return Err(SimConfigError::InvalidSignalWeights);
        }
        if !finite_non_negative(self.emission_scale) {
            return Err(SimConfigError::InvalidEmissionScale);
        }
        Ok(())
    }

    fn validate_movement(&self) -> Result<(), SimConfigError> {
        if !finite_non_negative(self.move_energy_min) {
            return Err(SimConfigError::InvalidMoveEnergyMin);
        }
        if self.move_attempts == 0 {
            return Err(SimConfigError::InvalidMoveAttempts);
        }
        if !(finite_non_negative(self.escape_energy_cost)
            && finite_non_negative(self.escape_resilience_gain))
        {
            return Err(SimConfigError::InvalidEscapeCost);
        }
        if !(self.squish_ratio.is_valid() && self.squish_ratio.max <= 1.0) {
            return Err(SimConfigError::InvalidSquishRatio);
        }
        Ok(())
    }

    fn validate_reproduction(&self) -> Result<(), SimConfigError> {
        let cost_ok = |c: f32| c.is_finite() && c >= 1.0;
        if !(cost_ok(self.reproduction_success_cost) && cost_ok(self.reproduction_failure_cost)) {
            return Err(SimConfigError::InvalidReproductionCost);
        }
        if self.reproduction_failure_cost > self.reproduction_success_cost {
            return Err(SimConfigError::InvalidReproductionCostOrder);
        }
        if !unit_interval(self.child_energy_share) {
            return Err(SimConfigError::InvalidChildEnergyShare);
        }
        if !unit_interval(self.attractiveness_record_fraction) {
            return Err(SimConfigError::InvalidAttractivenessRecordFraction);
        }
        if !finite_non_negative(self.luck_age_decay) {
            return Err(SimConfigError::InvalidLuckAgeDecay);
        }
        if !(self.disintegration_fraction.is_finite()
            && self.disintegration_fraction > 0.0
            && self.disintegration_fraction <= 1.0
            && self.disintegration_min_chunk.is_finite()
            && self.disintegration_min_chunk > 0.0)
        {
            return Err(SimConfigError::InvalidDisintegration);
        }
        Ok(())
    }

    fn validate_decay(&self) -> Result<(), SimConfigError> {
        if !unit_interval(self.growth_decay_rate) {
            return Err(SimConfigError::InvalidGrowthDecayRate);
        }
        if !finite_non_negative(self.decay_energy_base) {
            return Err(SimConfigError::InvalidDecayEnergyBase);
        }
        if !(self.age_per_turn.is_finite() && self.age_per_turn > 0.0) {
            return Err(SimConfigError::InvalidAgePerTurn);
        }
        if !(self.life_expectancy_jitter.is_finite()
            && (0.0..1.0).contains(&self.life_expectancy_jitter))
        {
            return Err(SimConfigError::InvalidLifeExpectancyJitter);
        }
        if !(finite_non_negative(self.excess_energy_tolerance)
            && unit_interval(self.excess_energy_tax))
        {
            return Err(SimConfigError::InvalidExcessEnergy);
        }
        if !self.attractiveness_weights.is_valid() {
            return Err(SimConfigError::InvalidAttractivenessWeights);
        }
        if !(finite_non_negative(self.death_release_inert)
            && finite_non_negative(self.death_release_light))
        {
            return Err(SimConfigError::InvalidDeathRelease);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_default() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_grid_size() {
        let config = SimConfig {
            grid_size: 1,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidGridSize));

        let config = SimConfig {
            grid_size: SimConfig::MAX_GRID_SIZE + 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::GridSizeTooLarge { .. })
        ));
    }

    #[test]
    fn validate_rejects_overfull_seeding() {
        let config = SimConfig {
            grid_size: 4,
            initial_cells: 17,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::TooManyInitialCells {
                max: 16,
                actual: 17
            })
        );
    }

    #[test]
    fn validate_rejects_degenerate_phase_range() {
        let mut config = SimConfig::default();
        config.phase_traits.gas.resilience = TraitRange::new(40.0, 20.0);
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidTraitRange {
                phase: Phase::Gas,
                name: "resilience"
            })
        );
    }

    #[test]
    fn validate_rejects_unordered_thresholds() {
        let config = SimConfig {
            thresholds: PhaseThresholds {
                liquid: 200.0,
                ..PhaseThresholds::default()
            },
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidThresholds));
    }

    #[test]
    fn validate_rejects_reproduction_costs() {
        let config = SimConfig {
            reproduction_success_cost: 0.5,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidReproductionCost)
        );

        let config = SimConfig {
            reproduction_success_cost: 2.0,
            reproduction_failure_cost: 3.0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidReproductionCostOrder)
        );
    }

    #[test]
    fn validate_rejects_squish_ratio_outside_unit_interval() {
        let config = SimConfig {
            squish_ratio: TraitRange::new(0.2, 1.5),
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidSquishRatio));
    }

    #[test]
    fn validate_rejects_non_finite_decay() {
        let config = SimConfig {
            light_decay: f32::NAN,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidFieldDecay));
    }

    #[test]
    fn error_messages_name_the_offending_field() {
        let err = SimConfigError::InvalidTraitRange {
            phase: Phase::Plasma,
            name: "mass",
        };
        assert!(err.to_string().contains("plasma"));
        assert!(err.to_string().contains("mass"));
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "seed": 9,
            "grid_size": 20,
            "initial_cells": 10,
            "thresholds": { "plasma": 300.0 }
        }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.grid_size, 20);
        assert_eq!(cfg.thresholds.plasma, 300.0);
        assert_eq!(cfg.thresholds.gas, 160.0);
        assert_eq!(cfg.move_attempts, 4);
        assert_eq!(cfg.phase_traits, PhaseTable::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = serde_json::to_string(&SimConfig::default()).expect("serialize");
        let back: SimConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.phase_traits, PhaseTable::default());
        assert_eq!(back.grid_size, SimConfig::default().grid_size);
    }
}
