use crate::cell::{Cell, CellTraits, DeathCause};
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

/// Receives every birth and death exactly once per cell.
///
/// Seeded and force-spawned cells report a birth too, so each death has a
/// matching birth.
pub trait Recorder {
    fn on_birth(&mut self, turn: u64, cell: &Cell);
    fn on_death(&mut self, turn: u64, cell: &Cell, cause: DeathCause);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn on_birth(&mut self, _turn: u64, _cell: &Cell) {}
    fn on_death(&mut self, _turn: u64, _cell: &Cell, _cause: DeathCause) {}
}

/// A cell's visible state at one hook call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitSnapshot {
    pub turn: u64,
    pub x: usize,
    pub y: usize,
    pub energy: f32,
    pub age: f32,
    pub phase: Phase,
    pub traits: CellTraits,
}

impl TraitSnapshot {
    pub fn capture(turn: u64, cell: &Cell) -> Self {
        Self {
            turn,
            x: cell.x,
            y: cell.y,
            energy: cell.energy,
            age: cell.age,
            phase: cell.phase,
            traits: cell.traits.clone(),
        }
    }
}

/// Completed life story of one cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memoir {
    pub cell_id: u64,
    pub parent_id: Option<u64>,
    pub generation: u32,
    pub cause: DeathCause,
    pub birth: TraitSnapshot,
    pub death: TraitSnapshot,
}

#[derive(Clone, Debug)]
struct BirthEntry {
    parent_id: Option<u64>,
    generation: u32,
    snapshot: TraitSnapshot,
}

/// In-memory archive pairing each birth with its death.
#[derive(Debug, Default)]
pub struct MemoirRecorder {
    living: HashMap<u64, BirthEntry>,
    memoirs: Vec<Memoir>,
    orphans: Vec<u64>,
    births: usize,
}

impl MemoirRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished records, in order of death.
    pub fn memoirs(&self) -> &[Memoir] {
        &self.memoirs
    }

    /// Cells whose death arrived without a recorded birth.
    pub fn orphans(&self) -> &[u64] {
        &self.orphans
    }

    pub fn living_count(&self) -> usize {
        self.living.len()
    }

    pub fn birth_count(&self) -> usize {
        self.births
    }

    pub fn birth_snapshot(&self, cell_id: u64) -> Option<&TraitSnapshot> {
        self.living.get(&cell_id).map(|entry| &entry.snapshot)
    }
}

impl Recorder for MemoirRecorder {
    fn on_birth(&mut self, turn: u64, cell: &Cell) {
        self.births += 1;
        self.living.insert(
            cell.id,
            BirthEntry {
                parent_id: cell.parent_id,
                generation: cell.generation,
                snapshot: TraitSnapshot::capture(turn, cell),
            },
        );
    }

    fn on_death(&mut self, turn: u64, cell: &Cell, cause: DeathCause) {
        let Some(entry) = self.living.remove(&cell.id) else {
            warn!(cell_id = cell.id, %cause, "death reported for a cell with no birth record");
            self.orphans.push(cell.id);
            return;
        };
        self.memoirs.push(Memoir {
            cell_id: cell.id,
            parent_id: entry.parent_id,
            generation: entry.generation,
            cause,
            birth: entry.snapshot,
            death: TraitSnapshot::capture(turn, cell),
        });
    }
}

/// Lets a driver keep a handle on a recorder it handed to the world.
impl<R: Recorder> Recorder for Rc<RefCell<R>> {
    fn on_birth(&mut self, turn: u64, cell: &Cell) {
        self.borrow_mut().on_birth(turn, cell);
    }

    fn on_death(&mut self, turn: u64, cell: &Cell, cause: DeathCause) {
        self.borrow_mut().on_death(turn, cell, cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::rng::create_rng;

    #[test]
    fn death_completes_birth_record() {
        let config = SimConfig::default();
        let mut rng = create_rng(1);
        let mut cell = Cell::spawn(7, 2, 3, 120.0, &config, &mut rng);
        let mut recorder = MemoirRecorder::new();
        recorder.on_birth(0, &cell);
        assert_eq!(recorder.living_count(), 1);
        assert_eq!(recorder.birth_snapshot(7).map(|s| s.energy), Some(120.0));

        cell.age = 40.0;
        cell.energy = 0.0;
        cell.alive = false;
        recorder.on_death(40, &cell, DeathCause::Starvation);

        assert_eq!(recorder.living_count(), 0);
        let memoir = &recorder.memoirs()[0];
        assert_eq!(memoir.cell_id, 7);
        assert_eq!(memoir.cause, DeathCause::Starvation);
        assert_eq!(memoir.birth.turn, 0);
        assert_eq!(memoir.death.turn, 40);
        assert_eq!(memoir.death.age, 40.0);
    }

    #[test]
    fn unregistered_death_is_reported_as_orphan() {
        let config = SimConfig::default();
        let mut rng = create_rng(2);
        let cell = Cell::spawn(3, 0, 0, 50.0, &config, &mut rng);
        let mut recorder = MemoirRecorder::new();
        recorder.on_death(5, &cell, DeathCause::Squish);
        assert_eq!(recorder.orphans(), &[3]);
        assert!(recorder.memoirs().is_empty());
    }

    #[test]
    fn memoir_serializes_to_json() {
        let config = SimConfig::default();
        let mut rng = create_rng(3);
        let cell = Cell::spawn(1, 0, 0, 300.0, &config, &mut rng);
        let mut recorder = MemoirRecorder::new();
        recorder.on_birth(0, &cell);
        recorder.on_death(1, &cell, DeathCause::Age);
        let json = serde_json::to_string(&recorder.memoirs()[0]).expect("serialize memoir");
        assert!(json.contains("\"cause\":\"age\""));
        assert!(json.contains("\"phase\":\"plasma\""));
    }
}
