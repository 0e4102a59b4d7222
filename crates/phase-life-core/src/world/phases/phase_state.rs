use super::super::{World, WorldError};
use crate::cell::CellKey;
use tracing::trace;

impl World {
    /// Re-derive the phase from energy. Traits stay as they are; only the band
    /// changes. Returns `true` on a transition.
    pub(in crate::world) fn step_phase(&mut self, key: CellKey) -> Result<bool, WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        if !cell.alive {
            return Ok(false);
        }
        let next = self.config.thresholds.classify(cell.energy);
        if next == cell.phase {
            self.tally(|c| c.phase_stable += 1);
            return Ok(false);
        }
        let from = cell.phase;
        cell.phase = next;
        let cell_id = cell.id;
        self.tally(|c| c.phase_transitions += 1);
        trace!(cell_id, %from, to = %next, "phase transition");
        Ok(true)
    }
}
