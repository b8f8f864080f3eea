use crate::field::{Bounds, Goal, Point};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Reasons a configuration is rejected before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field width and height must be positive (got {width}x{height})")]
    EmptyField { width: u32, height: u32 },
    #[error("pop_size must be positive")]
    EmptyPopulation,
    #[error("num_steps must be positive")]
    NoSteps,
    #[error("max_step {0} does not fit a signed 32-bit step")]
    StepTooLarge(u32),
    #[error("{name} must lie in [0, 1] (got {value})")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("duplication ({duplication}) + first_shot ({first_shot}) exceeds 1.0")]
    FractionsExceedOne { duplication: f64, first_shot: f64 },
    #[error("start ({}, {}) lies outside the field", .0.x, .0.y)]
    StartOutOfBounds(Point),
    #[error("goal square around ({}, {}) with radius {} is not inside the field", .0.center.x, .0.center.y, .0.radius)]
    GoalOutOfBounds(Goal),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Field dimensions.
    pub bounds: Bounds,
    /// Agents per generation.
    pub pop_size: usize,
    /// Probability that a single step is replaced when a genome is mutated.
    pub mut_rate: f64,
    /// Ticks per generation, and genome length.
    pub num_steps: usize,
    /// Largest absolute value of either step component.
    pub max_step: u32,
    /// Fraction of the population cloned unmutated from the top of the ranking.
    pub duplication: f64,
    /// Fraction of the population given a guaranteed mutated offspring.
    pub first_shot: f64,
    /// Where every agent starts.
    pub start: Point,
    /// Target region.
    pub goal: Goal,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Acceptance scans over the ranking before filling falls back to uniform picks.
    pub max_fill_scans: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(600, 600),
            pop_size: 1_000,
            mut_rate: 0.05,
            num_steps: 100,
            max_step: 20,
            duplication: 0.5,
            first_shot: 0.5,
            start: Point::new(15, 15),
            goal: Goal::new(550, 550, 10),
            rng_seed: None,
            max_fill_scans: 10_000,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bounds.width == 0 || self.bounds.height == 0 {
            return Err(ConfigError::EmptyField {
                width: self.bounds.width,
                height: self.bounds.height,
            });
        }
        if self.pop_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.num_steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if i32::try_from(self.max_step).is_err() {
            return Err(ConfigError::StepTooLarge(self.max_step));
        }
        for (name, value) in [
            ("mut_rate", self.mut_rate),
            ("duplication", self.duplication),
            ("first_shot", self.first_shot),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }
        if self.duplication + self.first_shot > 1.0 {
            return Err(ConfigError::FractionsExceedOne {
                duplication: self.duplication,
                first_shot: self.first_shot,
            });
        }
        if self.bounds.out_of_bounds(self.start) {
            return Err(ConfigError::StartOutOfBounds(self.start));
        }
        if !self.goal.fits_within(&self.bounds) {
            return Err(ConfigError::GoalOutOfBounds(self.goal));
        }
        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of top-ranked genomes cloned verbatim.
    pub fn elite_count(&self) -> usize {
        (self.duplication * self.pop_size as f64).floor() as usize
    }

    /// Number of top-ranked genomes given one mutated offspring each.
    pub fn first_shot_count(&self) -> usize {
        (self.first_shot * self.pop_size as f64).floor() as usize
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    pub fn seeded_rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
