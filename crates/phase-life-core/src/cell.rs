use crate::config::{AttractivenessWeights, SimConfig};
use crate::phase::{Phase, TraitBundle, TraitRange};
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Generational arena handle. A key whose cell has been removed resolves to
    /// `None` instead of aliasing a newer cell.
    pub struct CellKey;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Starvation,
    Age,
    Squish,
    Disintegration,
}

impl DeathCause {
    pub fn as_str(self) -> &'static str {
        match self {
            DeathCause::Starvation => "starvation",
            DeathCause::Age => "age",
            DeathCause::Squish => "squish",
            DeathCause::Disintegration => "disintegration",
        }
    }
}

impl std::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric traits carried by a cell. Seeded from its phase bundle at spawn,
/// inherited with mutation at birth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellTraits {
    pub growth_rate: f32,
    pub resilience: f32,
    pub perception: f32,
    pub speed: f32,
    pub light_emission: f32,
    pub light_absorption: f32,
    pub mutation_rate: f32,
    pub life_expectancy: f32,
    pub life_expectancy_min: f32,
    pub life_expectancy_max: f32,
    pub fertility_rate: f32,
    pub fertility_age_min: f32,
    pub fertility_age_max: f32,
    pub fertility_energy_min: f32,
    pub mass: f32,
    pub height: f32,
    pub luck: f32,
    pub attractiveness: f32,
}

impl CellTraits {
    pub fn sample<R: Rng + ?Sized>(bundle: &TraitBundle, rng: &mut R) -> Self {
        let life_expectancy_min = bundle.life_expectancy.min;
        let life_expectancy_max = bundle.life_expectancy.max;
        Self {
            growth_rate: bundle.growth_rate.sample(rng),
            resilience: bundle.resilience.sample(rng),
            perception: bundle.perception.sample(rng),
            speed: bundle.speed.sample(rng),
            light_emission: bundle.light_emission.sample(rng),
            light_absorption: bundle.light_absorption.sample(rng),
            mutation_rate: bundle.mutation_rate.sample(rng),
            life_expectancy: bundle.life_expectancy.sample(rng),
            life_expectancy_min,
            life_expectancy_max,
            fertility_rate: bundle.fertility_rate.sample(rng),
            fertility_age_min: bundle.fertility_age_start.sample(rng),
            fertility_age_max: bundle.fertility_age_end.sample(rng),
            fertility_energy_min: bundle.fertility_energy_min.sample(rng),
            mass: bundle.mass.sample(rng),
            height: bundle.height.sample(rng),
            luck: bundle.luck.sample(rng),
            attractiveness: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    /// Sequential identity, never reused within a world.
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub energy: f32,
    /// Highest energy held so far. Shrinks with the parent on reproduction.
    pub energy_record: f32,
    pub age: f32,
    pub alive: bool,
    pub phase: Phase,
    pub traits: CellTraits,
    /// Weak link to the parent. Only read while building the child.
    pub parent: Option<CellKey>,
    pub parent_id: Option<u64>,
    pub generation: u32,
    pub death_cause: Option<DeathCause>,
    pub(crate) last_turn: Option<u64>,
    pub(crate) death_recorded: bool,
}

impl Cell {
    /// Fresh cell whose traits come straight from the bundle of the phase its
    /// energy falls into.
    pub fn spawn<R: Rng + ?Sized>(
        id: u64,
        x: usize,
        y: usize,
        energy: f32,
        config: &SimConfig,
        rng: &mut R,
    ) -> Self {
        let energy = energy.max(0.0);
        let phase = config.thresholds.classify(energy);
        let traits = CellTraits::sample(config.phase_traits.bundle(phase), rng);
        let mut cell = Self {
            id,
            x,
            y,
            energy,
            energy_record: energy,
            age: 0.0,
            alive: true,
            phase,
            traits,
            parent: None,
            parent_id: None,
            generation: 0,
            death_cause: None,
            last_turn: None,
            death_recorded: false,
        };
        cell.traits.attractiveness = cell.attractiveness_score(&config.attractiveness_weights);
        cell
    }

    /// Build a child of `parent`. `parent_mass` and `parent_height` are the
    /// parent's values before it paid for the birth.
    #[allow(clippy::too_many_arguments)]
    pub fn offspring<R: Rng + ?Sized>(
        parent: &Cell,
        parent_key: CellKey,
        parent_mass: f32,
        parent_height: f32,
        id: u64,
        x: usize,
        y: usize,
        energy: f32,
        config: &SimConfig,
        rng: &mut R,
    ) -> Self {
        let energy = energy.max(0.0);
        let p = &parent.traits;
        let luck = p.luck / (1.0 + parent.age * config.luck_age_decay);
        let rate = p.mutation_rate;
        let mut mutate = |value: f32| mutate_trait(value, rate, luck, &mut *rng);

        let growth_rate = mutate(p.growth_rate);
        let resilience = mutate(p.resilience);
        let perception = mutate(p.perception);
        let speed = mutate(p.speed);
        let light_emission = mutate(p.light_emission);
        let light_absorption = mutate(p.light_absorption);
        let mutation_rate = mutate(p.mutation_rate);
        let (life_expectancy_min, life_expectancy_max) =
            ordered(mutate(p.life_expectancy_min), mutate(p.life_expectancy_max));
        let fertility_rate = mutate(p.fertility_rate);
        let (fertility_age_min, fertility_age_max) =
            ordered(mutate(p.fertility_age_min), mutate(p.fertility_age_max));
        let fertility_energy_min = mutate(p.fertility_energy_min);
        let life_expectancy =
            TraitRange::new(life_expectancy_min, life_expectancy_max).sample(rng);

        let mut child = Self {
            id,
            x,
            y,
            energy,
            energy_record: energy,
            age: 0.0,
            alive: true,
            phase: config.thresholds.classify(energy),
            traits: CellTraits {
                growth_rate,
                resilience,
                perception,
                speed,
                light_emission,
                light_absorption,
                mutation_rate,
                life_expectancy,
                life_expectancy_min,
                life_expectancy_max,
                fertility_rate,
                fertility_age_min,
                fertility_age_max,
                fertility_energy_min,
                mass: parent_mass * 0.5,
                height: parent_height * 0.5,
                luck,
                attractiveness: 0.0,
            },
            parent: Some(parent_key),
            parent_id: Some(parent.id),
            generation: parent.generation.saturating_add(1),
            death_cause: None,
            last_turn: None,
            death_recorded: false,
        };
        child.traits.attractiveness = child.attractiveness_score(&config.attractiveness_weights);
        child
    }

    /// Normalized weighted sum of the cell's current state.
    pub fn attractiveness_score(&self, w: &AttractivenessWeights) -> f32 {
        let t = &self.traits;
        let sum = self.energy * w.energy
            + self.age * w.age
            + t.growth_rate * w.growth_rate
            + t.resilience * w.resilience
            + t.perception * w.perception
            + t.speed * w.speed
            + t.light_emission * w.light_emission
            + t.mass * w.mass
            + t.height * w.height;
        sum / w.norm
    }

    /// Inside the fertility age window with enough energy to spare.
    pub fn is_fertile(&self) -> bool {
        self.alive
            && self.age >= self.traits.fertility_age_min
            && self.age <= self.traits.fertility_age_max
            && self.energy >= self.traits.fertility_energy_min
    }
}

/// +1 with probability `luck` percent, otherwise -1.
pub fn luck_choice<R: Rng + ?Sized>(luck: f32, rng: &mut R) -> f32 {
    if rng.random_range(0.0f32..100.0) < luck {
        1.0
    } else {
        -1.0
    }
}

/// `value + luck_choice * (value / 100) * rate`, floored at zero.
pub fn mutate_trait<R: Rng + ?Sized>(value: f32, rate: f32, luck: f32, rng: &mut R) -> f32 {
    let direction = luck_choice(luck, rng);
    (value + direction * (value / 100.0) * rate).max(0.0)
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use slotmap::SlotMap;

    #[test]
    fn spawn_draws_traits_from_phase_bundle() {
        let config = SimConfig::default();
        let mut rng = create_rng(7);
        let cell = Cell::spawn(1, 3, 4, 200.0, &config, &mut rng);
        assert_eq!(cell.phase, Phase::Gas);
        let bundle = config.phase_traits.bundle(Phase::Gas);
        assert!(bundle.resilience.contains(cell.traits.resilience));
        assert!(bundle.speed.contains(cell.traits.speed));
        assert!(bundle.light_emission.contains(cell.traits.light_emission));
        assert_eq!(cell.energy_record, 200.0);
        assert!(cell.traits.attractiveness > 0.0);
        assert!(cell.alive);
    }

    #[test]
    fn full_luck_always_mutates_upwards() {
        let mut rng = create_rng(1);
        for _ in 0..100 {
            let v = mutate_trait(50.0, 10.0, 100.0, &mut rng);
            assert!((v - 55.0).abs() < 1e-4);
        }
        for _ in 0..100 {
            let v = mutate_trait(50.0, 10.0, 0.0, &mut rng);
            assert!((v - 45.0).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_mutation_rate_copies_value() {
        let mut rng = create_rng(2);
        assert_eq!(mutate_trait(12.5, 0.0, 50.0, &mut rng), 12.5);
    }

    #[test]
    fn offspring_inherits_perturbed_traits() {
        let config = SimConfig::default();
        let mut rng = create_rng(11);
        let mut arena: SlotMap<CellKey, ()> = SlotMap::with_key();
        let parent_key = arena.insert(());
        let mut parent = Cell::spawn(4, 0, 0, 300.0, &config, &mut rng);
        parent.traits.mutation_rate = 10.0;
        parent.age = 50.0;
        parent.generation = 2;

        let child = Cell::offspring(
            &parent,
            parent_key,
            40.0,
            20.0,
            5,
            1,
            1,
            60.0,
            &config,
            &mut rng,
        );
        assert_eq!(child.parent, Some(parent_key));
        assert_eq!(child.parent_id, Some(4));
        assert_eq!(child.generation, 3);
        assert_eq!(child.traits.mass, 20.0);
        assert_eq!(child.traits.height, 10.0);
        assert_ne!(child.traits.speed, parent.traits.speed);
        assert_ne!(child.traits.resilience, parent.traits.resilience);
        let spread = parent.traits.speed * 0.1 + 1e-3;
        assert!((child.traits.speed - parent.traits.speed).abs() <= spread);
        assert!(child.traits.luck < parent.traits.luck);
        assert!(child.traits.life_expectancy_min <= child.traits.life_expectancy_max);
        assert!(child.traits.fertility_age_min <= child.traits.fertility_age_max);
        assert_eq!(child.phase, config.thresholds.classify(60.0));
    }

    #[test]
    fn fertility_requires_window_and_energy() {
        let config = SimConfig::default();
        let mut rng = create_rng(3);
        let mut cell = Cell::spawn(1, 0, 0, 300.0, &config, &mut rng);
        cell.traits.fertility_age_min = 10.0;
        cell.traits.fertility_age_max = 80.0;
        cell.traits.fertility_energy_min = 200.0;
        cell.age = 50.0;
        assert!(cell.is_fertile());
        cell.age = 81.0;
        assert!(!cell.is_fertile());
        cell.age = 50.0;
        cell.energy = 150.0;
        assert!(!cell.is_fertile());
    }

    #[test]
    fn attractiveness_is_normalized_weighted_sum() {
        let config = SimConfig::default();
        let mut rng = create_rng(5);
        let mut cell = Cell::spawn(1, 0, 0, 0.0, &config, &mut rng);
        cell.energy = 140.0;
        cell.age = 0.0;
        cell.traits = CellTraits {
            growth_rate: 0.0,
            resilience: 0.0,
            perception: 0.0,
            speed: 0.0,
            light_emission: 0.0,
            mass: 0.0,
            height: 0.0,
            ..cell.traits.clone()
        };
        let score = cell.attractiveness_score(&AttractivenessWeights::default());
        assert!((score - 1.0).abs() < 1e-6);
    }
}
