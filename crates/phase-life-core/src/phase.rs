use rand::Rng;
use serde::{Deserialize, Serialize};

/// Energy band a cell currently occupies, from hottest to coldest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Plasma,
    Gas,
    Liquid,
    Mesophase,
    Solid,
    Inert,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Plasma,
        Phase::Gas,
        Phase::Liquid,
        Phase::Mesophase,
        Phase::Solid,
        Phase::Inert,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Plasma => "plasma",
            Phase::Gas => "gas",
            Phase::Liquid => "liquid",
            Phase::Mesophase => "mesophase",
            Phase::Solid => "solid",
            Phase::Inert => "inert",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower (exclusive) energy bound of each band. Inert covers everything at or
/// below `solid`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    pub plasma: f32,
    pub gas: f32,
    pub liquid: f32,
    pub mesophase: f32,
    pub solid: f32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            plasma: 250.0,
            gas: 160.0,
            liquid: 60.0,
            mesophase: 25.0,
            solid: 10.0,
        }
    }
}

impl PhaseThresholds {
    /// Map an energy level onto its band. Bands are `lower < energy <= upper`;
    /// the plasma band is open above.
    pub fn classify(&self, energy: f32) -> Phase {
        if energy > self.plasma {
            Phase::Plasma
        } else if energy > self.gas {
            Phase::Gas
        } else if energy > self.liquid {
            Phase::Liquid
        } else if energy > self.mesophase {
            Phase::Mesophase
        } else if energy > self.solid {
            Phase::Solid
        } else {
            Phase::Inert
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        let ordered = [self.plasma, self.gas, self.liquid, self.mesophase, self.solid];
        ordered.iter().all(|t| t.is_finite())
            && self.solid >= 0.0
            && ordered.windows(2).all(|w| w[0] > w[1])
    }
}

/// Closed interval a trait is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitRange {
    pub min: f32,
    pub max: f32,
}

impl TraitRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Trait ranges seeded into a freshly spawned cell of one phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitBundle {
    pub growth_rate: TraitRange,
    pub resilience: TraitRange,
    pub perception: TraitRange,
    pub speed: TraitRange,
    pub light_emission: TraitRange,
    pub light_absorption: TraitRange,
    /// Percentage applied when children inherit traits.
    pub mutation_rate: TraitRange,
    pub life_expectancy: TraitRange,
    /// Percentage chance per turn of attempting reproduction.
    pub fertility_rate: TraitRange,
    pub fertility_age_start: TraitRange,
    pub fertility_age_end: TraitRange,
    pub fertility_energy_min: TraitRange,
    pub mass: TraitRange,
    pub height: TraitRange,
    /// Percentage chance that a mutation pushes a trait upwards.
    pub luck: TraitRange,
}

impl TraitBundle {
    /// Name of the first degenerate range, if any.
    pub(crate) fn first_invalid(&self) -> Option<&'static str> {
        let named = [
            ("growth_rate", &self.growth_rate),
            ("resilience", &self.resilience),
            ("perception", &self.perception),
            ("speed", &self.speed),
            ("light_emission", &self.light_emission),
            ("light_absorption", &self.light_absorption),
            ("mutation_rate", &self.mutation_rate),
            ("life_expectancy", &self.life_expectancy),
            ("fertility_rate", &self.fertility_rate),
            ("fertility_age_start", &self.fertility_age_start),
            ("fertility_age_end", &self.fertility_age_end),
            ("fertility_energy_min", &self.fertility_energy_min),
            ("mass", &self.mass),
            ("height", &self.height),
            ("luck", &self.luck),
        ];
        named
            .into_iter()
            .find(|(_, range)| !range.is_valid())
            .map(|(name, _)| name)
            .or_else(|| (self.luck.max > 100.0).then_some("luck"))
    }
}

const fn r(min: f32, max: f32) -> TraitRange {
    TraitRange::new(min, max)
}

/// One trait bundle per phase, queried at spawn time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTable {
    pub plasma: TraitBundle,
    pub gas: TraitBundle,
    pub liquid: TraitBundle,
    pub mesophase: TraitBundle,
    pub solid: TraitBundle,
    pub inert: TraitBundle,
}

impl PhaseTable {
    pub fn bundle(&self, phase: Phase) -> &TraitBundle {
        match phase {
            Phase::Plasma => &self.plasma,
            Phase::Gas => &self.gas,
            Phase::Liquid => &self.liquid,
            Phase::Mesophase => &self.mesophase,
            Phase::Solid => &self.solid,
            Phase::Inert => &self.inert,
        }
    }

    pub(crate) fn first_invalid(&self) -> Option<(Phase, &'static str)> {
        Phase::ALL
            .into_iter()
            .find_map(|phase| self.bundle(phase).first_invalid().map(|name| (phase, name)))
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        // Columns shared by every phase.
        let life_expectancy = r(320.0, 2000.0);
        let fertility_age_start = r(8.0, 320.0);
        let fertility_age_end = r(320.0, 2000.0);
        let fertility_rate = r(50.0, 150.0);
        let mutation_rate = r(0.0, 10.0);
        let mass = r(10.0, 50.0);
        let height = r(10.0, 50.0);
        let luck = r(40.0, 60.0);
        Self {
            plasma: TraitBundle {
                growth_rate: r(0.07, 0.10),
                resilience: r(50.0, 70.0),
                perception: r(60.0, 90.0),
                speed: r(90.0, 100.0),
                light_emission: r(280.0, 400.0),
                light_absorption: r(80.0, 160.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start,
                fertility_age_end,
                fertility_energy_min: r(200.0, 4000.0),
                mass,
                height,
                luck,
            },
            gas: TraitBundle {
                growth_rate: r(0.02, 0.05),
                resilience: r(10.0, 30.0),
                perception: r(50.0, 80.0),
                speed: r(80.0, 100.0),
                light_emission: r(80.0, 240.0),
                light_absorption: r(160.0, 240.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start,
                fertility_age_end,
                fertility_energy_min: r(180.0, 2300.0),
                mass,
                height,
                luck,
            },
            liquid: TraitBundle {
                growth_rate: r(0.06, 0.09),
                resilience: r(30.0, 50.0),
                perception: r(40.0, 70.0),
                speed: r(50.0, 100.0),
                light_emission: r(20.0, 120.0),
                light_absorption: r(200.0, 280.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start,
                fertility_age_end,
                fertility_energy_min: r(110.0, 1600.0),
                mass,
                height,
                luck,
            },
            mesophase: TraitBundle {
                growth_rate: r(0.04, 0.07),
                resilience: r(40.0, 60.0),
                perception: r(80.0, 100.0),
                speed: r(20.0, 70.0),
                light_emission: r(0.0, 280.0),
                light_absorption: r(0.0, 400.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start,
                fertility_age_end,
                fertility_energy_min: r(40.0, 950.0),
                mass,
                height,
                luck,
            },
            solid: TraitBundle {
                growth_rate: r(0.01, 0.04),
                resilience: r(60.0, 100.0),
                perception: r(5.0, 15.0),
                speed: r(10.0, 25.0),
                light_emission: r(0.0, 80.0),
                light_absorption: r(80.0, 160.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start: r(10.0, 320.0),
                fertility_age_end,
                fertility_energy_min: r(15.0, 700.0),
                mass,
                height,
                luck,
            },
            inert: TraitBundle {
                growth_rate: r(0.0, 0.001),
                resilience: r(80.0, 100.0),
                perception: r(0.0, 5.0),
                speed: r(0.0, 10.0),
                light_emission: r(0.0, 40.0),
                light_absorption: r(0.0, 40.0),
                mutation_rate,
                life_expectancy,
                fertility_rate,
                fertility_age_start: r(20.0, 320.0),
                fertility_age_end,
                fertility_energy_min: r(5.0, 500.0),
                mass,
                height,
                luck,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    #[test]
    fn band_edges_are_upper_inclusive() {
        let t = PhaseThresholds::default();
        assert_eq!(t.classify(160.0), Phase::Liquid);
        assert_eq!(t.classify(160.01), Phase::Gas);
        assert_eq!(t.classify(250.0), Phase::Gas);
        assert_eq!(t.classify(250.5), Phase::Plasma);
        assert_eq!(t.classify(60.0), Phase::Mesophase);
        assert_eq!(t.classify(25.0), Phase::Solid);
        assert_eq!(t.classify(10.0), Phase::Inert);
        assert_eq!(t.classify(0.0), Phase::Inert);
        assert_eq!(t.classify(-3.0), Phase::Inert);
    }

    #[test]
    fn thresholds_must_strictly_decrease() {
        let ok = PhaseThresholds::default();
        assert!(ok.is_valid());
        let tied = PhaseThresholds {
            gas: 60.0,
            ..PhaseThresholds::default()
        };
        assert!(!tied.is_valid());
        let negative = PhaseThresholds {
            solid: -1.0,
            ..PhaseThresholds::default()
        };
        assert!(!negative.is_valid());
    }

    #[test]
    fn sampled_traits_stay_in_range() {
        let mut rng = create_rng(3);
        let range = TraitRange::new(2.0, 4.0);
        for _ in 0..200 {
            assert!(range.contains(range.sample(&mut rng)));
        }
        let point = TraitRange::new(5.0, 5.0);
        assert_eq!(point.sample(&mut rng), 5.0);
    }

    #[test]
    fn default_table_is_well_formed() {
        assert_eq!(PhaseTable::default().first_invalid(), None);
    }

    #[test]
    fn inverted_range_is_reported_with_its_phase() {
        let mut table = PhaseTable::default();
        table.solid.speed = TraitRange::new(30.0, 10.0);
        assert_eq!(table.first_invalid(), Some((Phase::Solid, "speed")));
    }
}
