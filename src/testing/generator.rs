use std::io::{Error, ErrorKind};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{Dataset, LabeledSample, Potability, WaterSample};

/// Synthetic water measurements with a known potability concept.
///
/// A sample is potable when `ph >= 6.5` and `Sulfate <= 400`; every other
/// feature is drawn from a plausible range and carries no signal. A percentage
/// of labels can be flipped to add noise.
#[derive(Debug)]
pub struct WaterSampleGenerator {
    seed: u64,
    rng: StdRng,
    noise_percentage: u32,
    produced: usize,
}

impl WaterSampleGenerator {
    pub fn new(noise_percentage: u32, seed: u64) -> Result<Self, Error> {
        if noise_percentage > 100 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Noise percentage must be in [0, 100]",
            ));
        }
        Ok(Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            noise_percentage,
            produced: 0,
        })
    }

    /// Noise-free generator with the given seed.
    pub fn clean(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            noise_percentage: 0,
            produced: 0,
        }
    }

    pub fn concept(sample: &WaterSample) -> Potability {
        if sample.ph >= 6.5 && sample.sulfate <= 400.0 {
            Potability::Potable
        } else {
            Potability::NotPotable
        }
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn restart(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.produced = 0;
    }

    pub fn next_sample(&mut self) -> LabeledSample {
        let sample = WaterSample {
            ph: self.rng.random_range(4.0..10.0),
            hardness: self.rng.random_range(100.0..300.0),
            solids: self.rng.random_range(5_000.0..40_000.0),
            chloramines: self.rng.random_range(4.0..10.0),
            sulfate: self.rng.random_range(200.0..500.0),
            conductivity: self.rng.random_range(300.0..600.0),
            organic_carbon: self.rng.random_range(5.0..20.0),
            trihalomethanes: self.rng.random_range(30.0..110.0),
            turbidity: self.rng.random_range(2.0..6.0),
        };
        let mut label = Self::concept(&sample);
        let roll: u32 = self.rng.random_range(1..=100);
        if roll <= self.noise_percentage {
            label = match label {
                Potability::Potable => Potability::NotPotable,
                Potability::NotPotable => Potability::Potable,
            };
        }
        self.produced += 1;
        LabeledSample::new(sample, label)
    }

    pub fn dataset(&mut self, rows: usize) -> Dataset {
        let mut data = Dataset::new();
        for _ in 0..rows {
            data.push_sample(&self.next_sample());
        }
        data
    }
}
