use crate::cell::Cell;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};

/// One occupied slot, as a renderer sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub alive: bool,
    pub phase: Phase,
    pub energy: f32,
    pub age: f32,
    pub generation: u32,
    pub light_emission: f32,
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        Self {
            id: cell.id,
            x: cell.x,
            y: cell.y,
            alive: cell.alive,
            phase: cell.phase,
            energy: cell.energy,
            age: cell.age,
            generation: cell.generation,
            light_emission: cell.traits.light_emission,
        }
    }
}

/// Read-only copy of the grid and its fields. Field vectors are row-major,
/// `y * size + x`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub turn: u64,
    pub size: usize,
    pub light: Vec<f32>,
    pub attractiveness: Vec<f32>,
    pub inert: Vec<f32>,
    pub signal: Vec<f32>,
    /// Occupied slots in raster order.
    pub cells: Vec<CellSnapshot>,
}

impl WorldSnapshot {
    pub fn cell_at(&self, x: usize, y: usize) -> Option<&CellSnapshot> {
        self.cells.iter().find(|c| c.x == x && c.y == y)
    }
}
