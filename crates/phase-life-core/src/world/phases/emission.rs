use super::super::{World, WorldError};
use crate::cell::CellKey;

impl World {
    /// Glow into the light field and advertise into the attractiveness field.
    pub(in crate::world) fn step_emit(&mut self, key: CellKey) -> Result<(), WorldError> {
        let cell = self.cells.get(key).ok_or(WorldError::UnknownCell)?;
        if !cell.alive {
            return Ok(());
        }
        let (x, y) = (cell.x as i64, cell.y as i64);
        let glow = cell.traits.light_emission * self.config.emission_scale;
        let allure = cell.traits.attractiveness;
        if glow > 0.0 {
            self.environment.add_light(x, y, glow);
        }
        if allure > 0.0 {
            self.environment.add_attractiveness(x, y, allure);
        }
        Ok(())
    }
}
