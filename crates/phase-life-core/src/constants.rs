/// Largest supported grid edge. Keeps `size * size` slot indices well inside `u32`.
pub const MAX_GRID_SIZE: usize = 4096;

/// The four cardinal steps, in the order they are listed before shuffling.
pub const CARDINAL_DIRECTIONS: [(i64, i64); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Offsets a child may be placed at, relative to its parent.
pub const BIRTH_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Share of a disintegration deposit left on the cell's own slot.
pub const DISINTEGRATION_SELF_SHARE: f32 = 0.2;

/// Share of a disintegration deposit left on each cardinal neighbour.
/// The remaining 40% is lost.
pub const DISINTEGRATION_NEIGHBOR_SHARE: f32 = 0.1;

