use super::super::{MoveOutcome, World, WorldError};
use crate::cell::{CellKey, DeathCause};
use crate::constants::CARDINAL_DIRECTIONS;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

type Direction = (i64, i64);

impl World {
    /// Step towards the strongest neighboring signal, pushing a weaker
    /// occupant out of the way when every neighbor is taken.
    pub(in crate::world) fn step_move(&mut self, key: CellKey) -> Result<MoveOutcome, WorldError> {
        let cell = self.cells.get(key).ok_or(WorldError::UnknownCell)?;
        if !cell.alive || cell.energy < self.config.move_energy_min {
            return Ok(MoveOutcome::Inactive);
        }

        for _ in 0..self.config.move_attempts {
            let cell = self.cells.get(key).ok_or(WorldError::UnknownCell)?;
            let (x, y) = (cell.x as i64, cell.y as i64);
            let resilience = cell.traits.resilience;
            let cell_id = cell.id;

            let mut directions = CARDINAL_DIRECTIONS;
            directions.shuffle(&mut self.rng);
            let mut best_free: Option<(Direction, f32)> = None;
            let mut best_occupied: Option<(Direction, f32)> = None;
            for (dx, dy) in directions {
                let signal = self.environment.signal_at(x + dx, y + dy);
                let best = if self.environment.can_place_cell_at(x + dx, y + dy) {
                    &mut best_free
                } else {
                    &mut best_occupied
                };
                if best.map_or(true, |(_, current)| signal > current) {
                    *best = Some(((dx, dy), signal));
                }
            }

            if let Some(((dx, dy), _)) = best_free {
                self.relocate(key, x + dx, y + dy)?;
                self.tally(|c| c.moves += 1);
                return Ok(MoveOutcome::Moved);
            }

            if let Some(((dx, dy), _)) = best_occupied {
                let occupant = self
                    .environment
                    .cell_at(x + dx, y + dy)
                    .ok_or(WorldError::UnknownCell)?;
                let occupant_resilience = self
                    .cells
                    .get(occupant)
                    .ok_or(WorldError::UnknownCell)?
                    .traits
                    .resilience;
                if occupant_resilience < resilience {
                    self.tally(|c| c.pushes += 1);
                    self.resolve_displacement(occupant, (dx, dy), key, 0)?;
                    if self.environment.can_place_cell_at(x + dx, y + dy) {
                        self.relocate(key, x + dx, y + dy)?;
                        self.tally(|c| c.moves += 1);
                        return Ok(MoveOutcome::Pushed);
                    }
                }
            }

            self.tally(|c| c.blocked_moves += 1);
            trace!(cell_id, x, y, "move attempt blocked");
        }
        Ok(MoveOutcome::Blocked)
    }

    /// Get `displaced` out of the way of `origin`, one slot further along
    /// `direction`. Escapes into a free slot, is squished by a much tougher
    /// occupant, or first asks that occupant to move along.
    pub(in crate::world) fn resolve_displacement(
        &mut self,
        displaced: CellKey,
        direction: Direction,
        origin: CellKey,
        depth: usize,
    ) -> Result<(), WorldError> {
        if depth > 2 * self.config.grid_size {
            return Err(WorldError::SquishChainOverflow { depth });
        }
        let pusher = self.cells.get(origin).ok_or(WorldError::UnknownCell)?;
        if !pusher.alive {
            return Err(WorldError::DeadCellAction { cell_id: pusher.id });
        }

        let cell = self.cells.get(displaced).ok_or(WorldError::UnknownCell)?;
        let resilience = cell.traits.resilience;
        let (tx, ty) = (cell.x as i64 + direction.0, cell.y as i64 + direction.1);

        let Some(occupant) = self.environment.cell_at(tx, ty) else {
            return self.escape(displaced, tx, ty);
        };
        if occupant == origin {
            // Only way out is the pusher's own slot.
            return self.crush_if_dead(displaced);
        }

        let occupant_resilience = self
            .cells
            .get(occupant)
            .ok_or(WorldError::UnknownCell)?
            .traits
            .resilience;
        if occupant_resilience > 2.0 * resilience {
            let ratio = self.config.squish_ratio.sample(&mut self.rng);
            return self.squish_cell(displaced, occupant, ratio);
        }

        self.resolve_displacement(occupant, direction, origin, depth + 1)?;
        if self.environment.can_place_cell_at(tx, ty) {
            self.escape(displaced, tx, ty)
        } else {
            self.crush_if_dead(displaced)
        }
    }

    /// `displaced` dies against `occupant`, handing over `ratio` of its energy.
    /// What is left goes into the inert field at its slot.
    pub(in crate::world) fn squish_cell(
        &mut self,
        displaced: CellKey,
        occupant: CellKey,
        ratio: f32,
    ) -> Result<(), WorldError> {
        let victim = self.cells.get_mut(displaced).ok_or(WorldError::UnknownCell)?;
        if !victim.alive {
            return self.crush(displaced);
        }
        let transfer = victim.energy * ratio;
        victim.energy -= transfer;
        let victim_id = victim.id;

        let winner = self.cells.get_mut(occupant).ok_or(WorldError::UnknownCell)?;
        winner.energy += transfer;
        let winner_id = winner.id;

        self.tally(|c| c.squishes += 1);
        self.mark_dead(displaced, DeathCause::Squish);
        debug!(
            cell_id = victim_id,
            occupant_id = winner_id,
            transfer,
            "cell squished"
        );
        self.crush(displaced)
    }

    fn escape(&mut self, key: CellKey, x: i64, y: i64) -> Result<(), WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        let (ox, oy) = (cell.x, cell.y);
        if !self.environment.move_cell_to(key, cell, x, y) {
            return Err(WorldError::OccupancyMismatch { x: ox, y: oy });
        }
        if cell.alive {
            cell.traits.resilience += self.config.escape_resilience_gain;
            cell.energy = (cell.energy - self.config.escape_energy_cost).max(0.0);
        } else {
            // Dead cells smear some of their mass behind them.
            let trail = cell.traits.mass.min(self.config.disintegration_min_chunk);
            cell.traits.mass -= trail;
            self.environment.add_inert(ox as i64, oy as i64, trail);
        }
        self.tally(|c| c.escapes += 1);
        Ok(())
    }

    fn crush_if_dead(&mut self, key: CellKey) -> Result<(), WorldError> {
        let alive = self.cells.get(key).ok_or(WorldError::UnknownCell)?.alive;
        if alive {
            Ok(())
        } else {
            self.crush(key)
        }
    }

    /// Remove a dead cell and drop its remaining mass where it lay.
    fn crush(&mut self, key: CellKey) -> Result<(), WorldError> {
        let cell = self.remove_cell(key)?;
        self.environment
            .add_inert(cell.x as i64, cell.y as i64, cell.traits.mass.max(0.0));
        Ok(())
    }

    fn relocate(&mut self, key: CellKey, x: i64, y: i64) -> Result<(), WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        let (ox, oy) = (cell.x, cell.y);
        if self.environment.move_cell_to(key, cell, x, y) {
            Ok(())
        } else {
            Err(WorldError::OccupancyMismatch { x: ox, y: oy })
        }
    }
}
