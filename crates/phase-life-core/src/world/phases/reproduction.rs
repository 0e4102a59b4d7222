use super::super::{ReproductionOutcome, World, WorldError};
use crate::cell::{Cell, CellKey, DeathCause};
use crate::constants::{
    BIRTH_OFFSETS, CARDINAL_DIRECTIONS, DISINTEGRATION_NEIGHBOR_SHARE, DISINTEGRATION_SELF_SHARE,
};
use crate::phase::Phase;
use rand::Rng;
use tracing::debug;

impl World {
    /// Inert cells, dead or alive, shed mass. Everyone else may try for a
    /// child in a random adjacent slot.
    pub(in crate::world) fn step_reproduce(
        &mut self,
        key: CellKey,
    ) -> Result<ReproductionOutcome, WorldError> {
        let cell = self.cells.get(key).ok_or(WorldError::UnknownCell)?;
        if cell.phase == Phase::Inert {
            return self.disintegrate(key);
        }
        if !cell.is_fertile() {
            return Ok(ReproductionOutcome::Ineligible);
        }

        let record_threshold = self.best_attractiveness * self.config.attractiveness_record_fraction;
        let near_record =
            self.best_attractiveness > 0.0 && cell.traits.attractiveness >= record_threshold;
        let rolled = self.rng.random_range(0.0f32..100.0) < cell.traits.fertility_rate;
        if !(rolled || near_record) {
            return Ok(ReproductionOutcome::Ineligible);
        }

        let (x, y) = (cell.x as i64, cell.y as i64);
        let (dx, dy) = BIRTH_OFFSETS[self.rng.random_range(0..BIRTH_OFFSETS.len())];
        if self.environment.can_place_cell_at(x + dx, y + dy) {
            let child = self.spawn_offspring(key, x + dx, y + dy)?;
            return Ok(ReproductionOutcome::Born(child));
        }

        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        cell.energy /= self.config.reproduction_failure_cost;
        self.tally(|c| c.failed_births += 1);
        Ok(ReproductionOutcome::Failed)
    }

    /// Parent pays for the birth and the child appears at `(x, y)`. The child
    /// does not act until the next turn.
    fn spawn_offspring(&mut self, parent_key: CellKey, x: i64, y: i64) -> Result<CellKey, WorldError> {
        let id = self.next_id();
        let (cx, cy) = self.environment.wrap(x, y);
        let parent = self
            .cells
            .get_mut(parent_key)
            .ok_or(WorldError::UnknownCell)?;

        let before = parent.energy;
        parent.energy = before / self.config.reproduction_success_cost;
        parent.energy_record /= self.config.reproduction_success_cost;
        let child_energy = (before - parent.energy) * self.config.child_energy_share;
        let (mass, height) = (parent.traits.mass, parent.traits.height);
        parent.traits.mass = mass * 0.5;
        parent.traits.height = height * 0.5;

        let mut child = Cell::offspring(
            parent,
            parent_key,
            mass,
            height,
            id,
            cx,
            cy,
            child_energy,
            &self.config,
            &mut self.rng,
        );
        child.last_turn = Some(self.turn);
        let parent_id = parent.id;
        let generation = child.generation;

        let child_key = self
            .insert_placed(child)
            .ok_or(WorldError::OccupancyMismatch { x: cx, y: cy })?;
        self.tally(|c| c.births += 1);
        debug!(cell_id = id, parent_id, generation, x = cx, y = cy, "cell born");
        Ok(child_key)
    }

    /// Drop a chunk of mass into the inert field around the cell. Removes the
    /// cell once nothing is left.
    fn disintegrate(&mut self, key: CellKey) -> Result<ReproductionOutcome, WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        let (x, y) = (cell.x as i64, cell.y as i64);
        let mass = cell.traits.mass.max(0.0);
        let amount = (self.config.disintegration_fraction * cell.age.min(mass))
            .max(self.config.disintegration_min_chunk)
            .min(mass);
        cell.traits.mass = mass - amount;
        let exhausted = cell.traits.mass <= 0.0;
        let alive = cell.alive;

        self.spread_inert(x, y, amount);
        self.tally(|c| c.disintegrations += 1);

        if !exhausted {
            return Ok(ReproductionOutcome::Disintegrated { removed: false });
        }
        if alive {
            // Dying folds the leftover energy into mass; shed it the same way.
            self.mark_dead(key, DeathCause::Disintegration);
            let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
            let leftover = std::mem::take(&mut cell.traits.mass).max(0.0);
            self.spread_inert(x, y, leftover);
        }
        self.remove_cell(key)?;
        Ok(ReproductionOutcome::Disintegrated { removed: true })
    }

    /// 20% lands on the slot, 10% on each cardinal neighbour, the rest is lost.
    fn spread_inert(&mut self, x: i64, y: i64, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        self.environment
            .add_inert(x, y, amount * DISINTEGRATION_SELF_SHARE);
        for (dx, dy) in CARDINAL_DIRECTIONS {
            self.environment
                .add_inert(x + dx, y + dy, amount * DISINTEGRATION_NEIGHBOR_SHARE);
        }
    }
}
