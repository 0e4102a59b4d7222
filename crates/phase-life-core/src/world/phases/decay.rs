use super::super::{World, WorldError};
use crate::cell::{CellKey, DeathCause};
use crate::phase::TraitRange;

/// Keeps the decay divisor away from zero for cells with no resilience.
const MIN_DECAY_DIVISOR: f32 = 1e-3;

impl World {
    /// Age the cell and burn energy. Returns the cause if the cell died.
    pub(in crate::world) fn step_decay(
        &mut self,
        key: CellKey,
    ) -> Result<Option<DeathCause>, WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        if !cell.alive {
            return Ok(None);
        }
        let config = &self.config;

        let divisor = (cell.traits.resilience + cell.age / 100.0).max(MIN_DECAY_DIVISOR);
        let cost = config.decay_energy_base * cell.traits.speed / divisor;
        cell.energy = (cell.energy - cost).max(0.0);
        cell.age += config.age_per_turn;
        cell.traits.growth_rate -= cell.traits.growth_rate * config.growth_decay_rate;

        let reroll = TraitRange::new(
            cell.traits.life_expectancy_min,
            cell.traits.life_expectancy_max,
        )
        .sample(&mut self.rng);
        cell.traits.life_expectancy = cell.traits.life_expectancy.min(reroll);
        cell.traits.attractiveness = cell.attractiveness_score(&config.attractiveness_weights);

        if cell.energy > cell.energy_record + config.excess_energy_tolerance {
            cell.energy -= (cell.energy - cell.energy_record) * config.excess_energy_tax;
        }
        cell.energy_record = cell.energy_record.max(cell.energy);
        self.best_attractiveness = self.best_attractiveness.max(cell.traits.attractiveness);
        self.top_energy = self.top_energy.max(cell.energy);

        let jitter = config.life_expectancy_jitter;
        let limit = cell.traits.life_expectancy
            * TraitRange::new(1.0 - jitter, 1.0 + jitter).sample(&mut self.rng);
        let starved = cell.energy <= 0.0;
        if !starved && cell.age < limit {
            return Ok(None);
        }
        let cause = if cell.age < limit {
            DeathCause::Starvation
        } else {
            DeathCause::Age
        };
        self.mark_dead(key, cause);
        Ok(Some(cause))
    }
}
