//! Evolutionary path search: a population of dots, each carrying a fixed
//! list of step vectors, walks from a start point toward a goal square.
//! Every generation is ranked and bred into the next one by elitism,
//! guaranteed offspring for the best, and stochastic acceptance sampling.

pub mod agent;
pub mod config;
pub mod field;
pub mod fitness;
pub mod genome;
pub mod observer;
pub mod population;

pub use agent::{Agent, Standing, StepOutcome};
pub use config::{ConfigError, SimConfig};
pub use field::{Bounds, Goal, Point};
pub use fitness::{Evaluation, FitnessEvaluator, RankedEntry};
pub use genome::{Genome, Step};
pub use observer::{NullObserver, PopulationObserver, TraceObserver, ViewHandle};
pub use population::{GenerationEnd, GenerationStats, Population, PopulationError, TickOutcome};
