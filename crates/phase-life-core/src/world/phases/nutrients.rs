use super::super::{World, WorldError};
use crate::cell::CellKey;

impl World {
    /// Feed on the light under the cell. Returns the energy gained.
    pub(in crate::world) fn step_absorb(&mut self, key: CellKey) -> Result<f32, WorldError> {
        let cell = self.cells.get_mut(key).ok_or(WorldError::UnknownCell)?;
        if !cell.alive {
            return Ok(0.0);
        }
        let (x, y) = (cell.x as i64, cell.y as i64);
        let gained = self.environment.light_at(x, y) * cell.traits.growth_rate;
        if gained <= 0.0 {
            return Ok(0.0);
        }
        cell.energy += gained;
        self.environment
            .deplete_light(x, y, gained * self.config.absorption_waste);
        Ok(gained)
    }
}
