use crate::cell::{Cell, CellKey};
use crate::config::SignalWeights;
use crate::field::{wrap_coords, ScalarField};
use rand::Rng;
use slotmap::SlotMap;

/// Occupancy grid plus the four scalar fields laid over it.
///
/// The occupancy grid is the authoritative location of every cell; a cell's
/// own `x`/`y` mirror it and are only written through this type.
#[derive(Clone, Debug)]
pub struct Environment {
    size: usize,
    occupancy: Vec<Option<CellKey>>,
    light: ScalarField,
    attractiveness: ScalarField,
    inert: ScalarField,
    signal: ScalarField,
}

impl Environment {
    pub fn new(size: usize, light_max: f32, attractiveness_max: f32) -> Self {
        Self {
            size,
            occupancy: vec![None; size * size],
            light: ScalarField::new(size, Some(light_max)),
            attractiveness: ScalarField::new(size, Some(attractiveness_max)),
            inert: ScalarField::new(size, None),
            signal: ScalarField::new(size, None),
        }
    }

    /// Fill the light field with uniform noise in `[0, max)`.
    pub fn seed_light<R: Rng + ?Sized>(&mut self, max: f32, rng: &mut R) {
        for value in self.light.data_mut() {
            *value = rng.random::<f32>() * max;
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn wrap(&self, x: i64, y: i64) -> (usize, usize) {
        wrap_coords(self.size, x, y)
    }

    pub fn light(&self) -> &ScalarField {
        &self.light
    }

    pub fn attractiveness(&self) -> &ScalarField {
        &self.attractiveness
    }

    pub fn inert(&self) -> &ScalarField {
        &self.inert
    }

    pub fn signal(&self) -> &ScalarField {
        &self.signal
    }

    /// Row-major occupancy slots.
    pub fn occupancy(&self) -> &[Option<CellKey>] {
        &self.occupancy
    }

    pub fn light_at(&self, x: i64, y: i64) -> f32 {
        self.light.get(x, y)
    }

    pub fn attractiveness_at(&self, x: i64, y: i64) -> f32 {
        self.attractiveness.get(x, y)
    }

    pub fn inert_at(&self, x: i64, y: i64) -> f32 {
        self.inert.get(x, y)
    }

    pub fn signal_at(&self, x: i64, y: i64) -> f32 {
        self.signal.get(x, y)
    }

    pub fn set_light(&mut self, x: i64, y: i64, value: f32) -> bool {
        self.light.set(x, y, value);
        self.light.get(x, y) > 0.0
    }

    pub fn add_light(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.light.add(x, y, amount) > 0.0
    }

    pub fn deplete_light(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.light.deplete(x, y, amount)
    }

    pub fn set_attractiveness(&mut self, x: i64, y: i64, value: f32) -> bool {
        self.attractiveness.set(x, y, value);
        self.attractiveness.get(x, y) > 0.0
    }

    pub fn add_attractiveness(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.attractiveness.add(x, y, amount) > 0.0
    }

    pub fn deplete_attractiveness(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.attractiveness.deplete(x, y, amount)
    }

    pub fn set_inert(&mut self, x: i64, y: i64, value: f32) -> bool {
        self.inert.set(x, y, value);
        self.inert.get(x, y) > 0.0
    }

    pub fn add_inert(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.inert.add(x, y, amount) > 0.0
    }

    pub fn deplete_inert(&mut self, x: i64, y: i64, amount: f32) -> bool {
        self.inert.deplete(x, y, amount)
    }

    pub fn can_place_cell_at(&self, x: i64, y: i64) -> bool {
        self.cell_at(x, y).is_none()
    }

    pub fn cell_at(&self, x: i64, y: i64) -> Option<CellKey> {
        self.occupancy[self.slot(x, y)]
    }

    pub(crate) fn cell_at_index(&self, idx: usize) -> Option<CellKey> {
        self.occupancy.get(idx).copied().flatten()
    }

    /// Put `cell` into an empty slot and sync its coordinates. Returns `false`
    /// if the slot is taken.
    pub fn place_cell_at(&mut self, key: CellKey, cell: &mut Cell, x: i64, y: i64) -> bool {
        let (cx, cy) = self.wrap(x, y);
        let idx = cy * self.size + cx;
        if self.occupancy[idx].is_some() {
            return false;
        }
        self.occupancy[idx] = Some(key);
        cell.x = cx;
        cell.y = cy;
        true
    }

    /// Relocate `cell` from its current slot into an empty one. Returns `false`
    /// and changes nothing when the target is taken or the source slot does not
    /// hold `key`.
    pub fn move_cell_to(&mut self, key: CellKey, cell: &mut Cell, x: i64, y: i64) -> bool {
        let from = cell.y * self.size + cell.x;
        if self.occupancy.get(from).copied().flatten() != Some(key) {
            return false;
        }
        let (cx, cy) = self.wrap(x, y);
        let to = cy * self.size + cx;
        if self.occupancy[to].is_some() {
            return false;
        }
        self.occupancy[from] = None;
        self.occupancy[to] = Some(key);
        cell.x = cx;
        cell.y = cy;
        true
    }

    pub fn remove_cell_at(&mut self, x: i64, y: i64) -> Option<CellKey> {
        let idx = self.slot(x, y);
        self.occupancy[idx].take()
    }

    /// Rebuild the per-turn signal snapshot from the current fields and the
    /// live occupants.
    pub fn recompute_signal(&mut self, cells: &SlotMap<CellKey, Cell>, weights: &SignalWeights) {
        let light = self.light.data();
        let attractiveness = self.attractiveness.data();
        let inert = self.inert.data();
        let occupancy = &self.occupancy;
        for (idx, out) in self.signal.data_mut().iter_mut().enumerate() {
            let mut value = light[idx] * weights.light
                + attractiveness[idx] * weights.attractiveness
                + inert[idx] * weights.inert;
            if let Some(cell) = occupancy[idx].and_then(|key| cells.get(key)) {
                if cell.alive {
                    value -= cell.traits.resilience * weights.occupant_resilience_penalty;
                    value += cell.traits.light_emission * weights.occupant_emission_bonus;
                }
            }
            *out = value;
        }
    }

    /// Inject `sources` light bursts at random slots, then decay every field.
    pub fn enrich_and_decay<R: Rng + ?Sized>(
        &mut self,
        sources: usize,
        amount: f32,
        decay: FieldDecay,
        rng: &mut R,
    ) {
        for _ in 0..sources {
            let x = rng.random_range(0..self.size) as i64;
            let y = rng.random_range(0..self.size) as i64;
            self.light.add(x, y, amount);
        }
        self.light.decay_all(decay.light);
        self.attractiveness.decay_all(decay.attractiveness);
        self.inert.decay_all(decay.inert);
    }

    fn slot(&self, x: i64, y: i64) -> usize {
        let (cx, cy) = self.wrap(x, y);
        cy * self.size + cx
    }
}

/// Per-turn subtraction applied to each field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDecay {
    pub light: f32,
    pub attractiveness: f32,
    pub inert: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::rng::create_rng;

    fn make_cell(config: &SimConfig) -> Cell {
        let mut rng = create_rng(0);
        Cell::spawn(1, 0, 0, 100.0, config, &mut rng)
    }

    #[test]
    fn move_cell_to_keeps_mirror_in_sync() {
        let config = SimConfig::default();
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let key = cells.insert(make_cell(&config));
        let mut env = Environment::new(10, 1000.0, 100.0);
        assert!(env.place_cell_at(key, &mut cells[key], 9, 4));
        assert!(env.move_cell_to(key, &mut cells[key], 10, 4));
        assert_eq!((cells[key].x, cells[key].y), (0, 4));
        assert_eq!(env.cell_at(0, 4), Some(key));
        assert_eq!(env.cell_at(9, 4), None);
    }

    #[test]
    fn placement_refuses_occupied_slot() {
        let config = SimConfig::default();
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let a = cells.insert(make_cell(&config));
        let b = cells.insert(make_cell(&config));
        let mut env = Environment::new(4, 1000.0, 100.0);
        assert!(env.place_cell_at(a, &mut cells[a], 1, 1));
        assert!(!env.can_place_cell_at(1, 1));
        assert!(!env.place_cell_at(b, &mut cells[b], 5, 5));
        assert!(env.place_cell_at(b, &mut cells[b], 2, 1));
        assert!(!env.move_cell_to(b, &mut cells[b], 1, 1));
        assert_eq!(env.cell_at(2, 1), Some(b));
        assert_eq!(env.remove_cell_at(1, 1), Some(a));
        assert!(env.can_place_cell_at(1, 1));
    }

    #[test]
    fn move_from_foreign_slot_is_rejected() {
        let config = SimConfig::default();
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let key = cells.insert(make_cell(&config));
        let mut env = Environment::new(4, 1000.0, 100.0);
        assert!(!env.move_cell_to(key, &mut cells[key], 1, 0));
        assert_eq!(env.cell_at(1, 0), None);
    }

    #[test]
    fn light_writes_clip_to_ceiling() {
        let mut env = Environment::new(4, 10.0, 5.0);
        assert!(env.add_light(0, 0, 50.0));
        assert_eq!(env.light_at(0, 0), 10.0);
        assert!(!env.deplete_light(0, 0, 20.0));
        assert!(env.add_attractiveness(-1, 0, 9.0));
        assert_eq!(env.attractiveness_at(3, 0), 5.0);
        assert!(env.add_inert(2, 2, 5000.0));
        assert_eq!(env.inert_at(2, 2), 5000.0);
    }

    #[test]
    fn signal_combines_fields_and_live_occupant() {
        let config = SimConfig::default();
        let weights = SignalWeights {
            light: 1.0,
            attractiveness: 0.5,
            inert: 0.2,
            occupant_resilience_penalty: 0.5,
            occupant_emission_bonus: 0.1,
        };
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let key = cells.insert(make_cell(&config));
        cells[key].traits.resilience = 20.0;
        cells[key].traits.light_emission = 10.0;
        let mut env = Environment::new(4, 1000.0, 100.0);
        env.set_light(1, 1, 100.0);
        env.set_attractiveness(1, 1, 10.0);
        env.set_inert(1, 1, 50.0);
        env.set_light(2, 2, 40.0);
        assert!(env.place_cell_at(key, &mut cells[key], 1, 1));

        env.recompute_signal(&cells, &weights);
        assert!((env.signal_at(1, 1) - (100.0 + 5.0 + 10.0 - 10.0 + 1.0)).abs() < 1e-4);
        assert!((env.signal_at(2, 2) - 40.0).abs() < 1e-4);

        cells[key].alive = false;
        env.recompute_signal(&cells, &weights);
        assert!((env.signal_at(1, 1) - 115.0).abs() < 1e-4);
    }

    #[test]
    fn occupant_penalty_can_push_signal_negative() {
        let config = SimConfig::default();
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let key = cells.insert(make_cell(&config));
        cells[key].traits.resilience = 80.0;
        cells[key].traits.light_emission = 0.0;
        let mut env = Environment::new(3, 1000.0, 100.0);
        assert!(env.place_cell_at(key, &mut cells[key], 0, 0));
        env.recompute_signal(&cells, &SignalWeights::default());
        assert!(env.signal_at(0, 0) < 0.0);
    }

    #[test]
    fn enrichment_precedes_decay() {
        let mut env = Environment::new(1, 1000.0, 100.0);
        let mut rng = create_rng(9);
        let decay = FieldDecay {
            light: 0.5,
            attractiveness: 0.5,
            inert: 0.25,
        };
        env.set_inert(0, 0, 1.0);
        env.enrich_and_decay(2, 10.0, decay, &mut rng);
        assert!((env.light_at(0, 0) - 19.5).abs() < 1e-5);
        assert_eq!(env.attractiveness_at(0, 0), 0.0);
        assert!((env.inert_at(0, 0) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn seeded_light_stays_below_ceiling() {
        let mut env = Environment::new(8, 1000.0, 100.0);
        let mut rng = create_rng(4);
        env.seed_light(5.0, &mut rng);
        assert!(env.light().data().iter().all(|v| (0.0..5.0).contains(v)));
    }
}
