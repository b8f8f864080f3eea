use rand::Rng;
use serde::{Deserialize, Serialize};

/// One movement vector, each component in `[-max_step, max_step]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub dx: i32,
    pub dy: i32,
}

impl Step {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Sample both components uniformly from `[-max_step, max_step]`
    pub fn random(max_step: u32, rng: &mut impl Rng) -> Self {
        let m = max_step as i32;
        Self {
            dx: rng.gen_range(-m..=m),
            dy: rng.gen_range(-m..=m),
        }
    }

    pub fn length(self) -> f64 {
        f64::from(self.dx).hypot(f64::from(self.dy))
    }
}

/// A dot's entire planned path: one step per tick of a generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub steps: Vec<Step>,
}

impl Genome {
    /// Create a random genome of `num_steps` vectors
    pub fn random(num_steps: usize, max_step: u32, rng: &mut impl Rng) -> Self {
        let steps = (0..num_steps).map(|_| Step::random(max_step, rng)).collect();
        Self { steps }
    }

    /// Return a copy where each step is independently replaced by a fresh
    /// random step with probability `mut_rate`.
    pub fn mutated(&self, mut_rate: f64, max_step: u32, rng: &mut impl Rng) -> Self {
        let steps = self
            .steps
            .iter()
            .map(|&step| {
                if rng.gen::<f64>() < mut_rate {
                    Step::random(max_step, rng)
                } else {
                    step
                }
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Step> {
        self.steps.get(index).copied()
    }

    /// Total travel of the path: sum of step magnitudes
    pub fn path_length(&self) -> f64 {
        self.steps.iter().map(|s| s.length()).sum()
    }
}
