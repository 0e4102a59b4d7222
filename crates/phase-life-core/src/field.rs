/// Square toroidal grid of scalar values, one per slot.
///
/// Values never drop below zero. When a ceiling is set, writes are clipped to it.
#[derive(Clone, Debug)]
pub struct ScalarField {
    size: usize,
    data: Vec<f32>,
    ceiling: Option<f32>,
}

impl ScalarField {
    pub fn new(size: usize, ceiling: Option<f32>) -> Self {
        assert!(size > 0, "field size must be positive");
        Self {
            size,
            data: vec![0.0; size * size],
            ceiling,
        }
    }

    /// Get the value at a slot. Coordinates wrap toroidally.
    pub fn get(&self, x: i64, y: i64) -> f32 {
        self.data[self.index(x, y)]
    }

    /// Overwrite the value at a slot, clipped into the field's range.
    pub fn set(&mut self, x: i64, y: i64, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = self.clip(value);
    }

    /// Add `amount` to a slot and return the stored value.
    pub fn add(&mut self, x: i64, y: i64, amount: f32) -> f32 {
        let idx = self.index(x, y);
        self.data[idx] = self.clip(self.data[idx] + amount);
        self.data[idx]
    }

    /// Subtract up to `amount` from a slot. Returns `true` while the slot
    /// still holds a positive value afterwards.
    pub fn deplete(&mut self, x: i64, y: i64, amount: f32) -> bool {
        let idx = self.index(x, y);
        self.data[idx] = (self.data[idx] - amount.max(0.0)).max(0.0);
        self.data[idx] > 0.0
    }

    /// Subtract `amount` from every slot, flooring at zero.
    pub fn decay_all(&mut self, amount: f32) {
        debug_assert!(amount >= 0.0, "decay amount cannot be negative");
        for value in &mut self.data {
            *value = (*value - amount).max(0.0);
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn ceiling(&self) -> Option<f32> {
        self.ceiling
    }

    /// Row-major slot values, `y * size + x`.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn total(&self) -> f64 {
        self.data.iter().map(|v| *v as f64).sum()
    }

    pub fn index(&self, x: i64, y: i64) -> usize {
        let (cx, cy) = wrap_coords(self.size, x, y);
        cy * self.size + cx
    }

    fn clip(&self, value: f32) -> f32 {
        let floored = value.max(0.0);
        match self.ceiling {
            Some(max) => floored.min(max),
            None => floored,
        }
    }
}

/// Map any integer coordinate pair onto `[0, size)` in both axes.
pub fn wrap_coords(size: usize, x: i64, y: i64) -> (usize, usize) {
    let n = size as i64;
    (x.rem_euclid(n) as usize, y.rem_euclid(n) as usize)
}

#[cfg(test)]
mod tests {
    use super::{wrap_coords, ScalarField};

    #[test]
    fn wraps_coordinates_toroidally() {
        let mut field = ScalarField::new(10, None);
        field.set(9, 9, 3.0);
        assert!((field.get(-1, -1) - 3.0).abs() < f32::EPSILON);
        assert!((field.get(19, 19) - 3.0).abs() < f32::EPSILON);
        assert_eq!(wrap_coords(10, 10, 4), (0, 4));
        assert_eq!(wrap_coords(10, -11, 0), (9, 0));
    }

    #[test]
    fn writes_are_clipped_to_ceiling_and_floor() {
        let mut field = ScalarField::new(4, Some(10.0));
        assert!((field.add(1, 1, 25.0) - 10.0).abs() < f32::EPSILON);
        field.set(2, 2, -5.0);
        assert_eq!(field.get(2, 2), 0.0);
    }

    #[test]
    fn deplete_reports_remaining_value() {
        let mut field = ScalarField::new(4, None);
        field.set(0, 0, 1.5);
        assert!(field.deplete(0, 0, 0.5));
        assert!((field.get(0, 0) - 1.0).abs() < f32::EPSILON);
        assert!(!field.deplete(0, 0, 5.0));
        assert_eq!(field.get(0, 0), 0.0);
    }

    #[test]
    fn decay_all_floors_at_zero() {
        let mut field = ScalarField::new(3, None);
        field.set(0, 0, 0.02);
        field.set(1, 0, 1.0);
        field.decay_all(0.05);
        assert_eq!(field.get(0, 0), 0.0);
        assert!((field.get(1, 0) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn total_sums_every_slot() {
        let mut field = ScalarField::new(2, None);
        field.set(0, 0, 1.0);
        field.set(1, 1, 2.5);
        assert!((field.total() - 3.5).abs() < 1e-9);
    }
}
