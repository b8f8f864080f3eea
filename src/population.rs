use crate::agent::{Agent, StepOutcome};
use crate::config::{ConfigError, SimConfig};
use crate::fitness::{Evaluation, FitnessEvaluator, RankedEntry};
use crate::genome::Genome;
use crate::observer::{NullObserver, PopulationObserver, ViewHandle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a generation stopped simulating
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationEnd {
    /// Every genome step was played out
    StepsExhausted,
    /// Every agent left the field before the steps ran out
    AllDead,
}

/// Result of a single `tick()` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// One timestep was simulated and the generation continues
    Advanced { deaths: usize },
    /// The generation is over; evaluate and breed before ticking again
    Ended(GenerationEnd),
}

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("generation is not finished (tick {tick} of {num_steps})")]
    GenerationInProgress { tick: usize, num_steps: usize },
    #[error("generation has not been evaluated")]
    NotEvaluated,
    #[error("seed genomes must be {expected_agents} genomes of {expected_steps} steps")]
    SeedMismatch {
        expected_agents: usize,
        expected_steps: usize,
    },
}

/// Summary of one finished generation
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationStats {
    pub generation: u64,
    pub end: GenerationEnd,
    pub finishers: usize,
    pub failed: usize,
    pub dead: usize,
    pub best_path_length: Option<f64>,
    pub closest_distance: Option<f64>,
}

impl fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gen {:>4} | Reached: {:>5} | Failed: {:>5} | Died: {:>5}",
            self.generation, self.finishers, self.failed, self.dead,
        )?;
        if let Some(len) = self.best_path_length {
            write!(f, " | Shortest path: {len:.1}")?;
        }
        if let Some(dist) = self.closest_distance {
            write!(f, " | Closest: {dist:.1}")?;
        }
        Ok(())
    }
}

/// The evolving set of dots and the generation state machine
pub struct Population {
    config: SimConfig,
    agents: Vec<Agent>,
    handles: Vec<ViewHandle>,
    ranking: Vec<RankedEntry>,
    tick: usize,
    ended: Option<GenerationEnd>,
    generation: u64,
    rng: StdRng,
    observer: Box<dyn PopulationObserver>,
}

impl Population {
    /// Create a random first generation with no presentation layer attached.
    pub fn new(config: SimConfig) -> Result<Self, PopulationError> {
        Self::with_observer(config, Box::new(NullObserver))
    }

    pub fn with_observer(
        config: SimConfig,
        observer: Box<dyn PopulationObserver>,
    ) -> Result<Self, PopulationError> {
        config.validate()?;
        let rng = config.seeded_rng();
        Self::with_rng(config, observer, rng)
    }

    /// Create a random first generation drawing from the supplied RNG.
    pub fn with_rng(
        config: SimConfig,
        observer: Box<dyn PopulationObserver>,
        mut rng: StdRng,
    ) -> Result<Self, PopulationError> {
        config.validate()?;
        let genomes = (0..config.pop_size)
            .map(|_| Genome::random(config.num_steps, config.max_step, &mut rng))
            .collect();
        Self::from_genomes(config, genomes, observer, rng)
    }

    /// Create a first generation from explicit genomes.
    pub fn from_genomes(
        config: SimConfig,
        genomes: Vec<Genome>,
        observer: Box<dyn PopulationObserver>,
        rng: StdRng,
    ) -> Result<Self, PopulationError> {
        config.validate()?;
        if genomes.len() != config.pop_size || genomes.iter().any(|g| g.len() != config.num_steps)
        {
            return Err(PopulationError::SeedMismatch {
                expected_agents: config.pop_size,
                expected_steps: config.num_steps,
            });
        }

        let mut population = Self {
            config,
            agents: Vec::new(),
            handles: Vec::new(),
            ranking: Vec::new(),
            tick: 0,
            ended: None,
            generation: 1,
            rng,
            observer,
        };
        population.spawn(genomes);
        info!(
            width = population.config.bounds.width,
            height = population.config.bounds.height,
            pop_size = population.config.pop_size,
            goal_x = population.config.goal.center.x,
            goal_y = population.config.goal.center.y,
            goal_radius = population.config.goal.radius,
            "Created field"
        );
        Ok(population)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Ranking used for breeding; empty until the generation is evaluated
    pub fn ranking(&self) -> &[RankedEntry] {
        &self.ranking
    }

    pub fn tick_count(&self) -> usize {
        self.tick
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn end_reason(&self) -> Option<GenerationEnd> {
        self.ended
    }

    pub fn is_finished(&self) -> bool {
        self.ended.is_some()
    }

    /// Advance every agent by one genome step.
    ///
    /// Once the generation has ended this is a no-op that keeps returning
    /// the same `Ended` outcome until `breed()` starts a new generation.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(end) = self.ended {
            return TickOutcome::Ended(end);
        }

        let t = self.tick;
        let bounds = self.config.bounds;
        let goal = self.config.goal;
        let outcomes: Vec<StepOutcome> = self
            .agents
            .par_iter_mut()
            .map(|agent| agent.step(t, &bounds, &goal))
            .collect();

        let mut deaths = 0;
        for (outcome, &handle) in outcomes.iter().zip(&self.handles) {
            match *outcome {
                StepOutcome::Moved(delta) => self.observer.on_move(handle, delta),
                StepOutcome::Died(_) => {
                    deaths += 1;
                    self.observer.on_death(handle);
                }
                StepOutcome::Idle => {}
            }
        }
        if deaths > 0 {
            debug!(tick = t, deaths, "Agents left the field");
        }

        if self.agents.iter().all(|a| !a.alive) {
            info!(pop_size = self.config.pop_size, tick = t, "All agents have died");
            self.tick = self.config.num_steps;
            self.ended = Some(GenerationEnd::AllDead);
            return TickOutcome::Ended(GenerationEnd::AllDead);
        }

        self.tick += 1;
        if self.tick == self.config.num_steps {
            self.ended = Some(GenerationEnd::StepsExhausted);
            return TickOutcome::Ended(GenerationEnd::StepsExhausted);
        }
        TickOutcome::Advanced { deaths }
    }

    /// Rank the finished generation and assign fitness.
    pub fn evaluate(&mut self) -> Result<GenerationStats, PopulationError> {
        let Some(end) = self.ended else {
            return Err(self.in_progress());
        };

        let evaluator = FitnessEvaluator::new(self.config.goal, self.config.pop_size);
        let Evaluation {
            ranking,
            finishers,
            failed,
            dead,
            best_path_length,
            closest_distance,
        } = evaluator.evaluate(&mut self.agents);
        self.ranking = ranking;

        let stats = GenerationStats {
            generation: self.generation,
            end,
            finishers,
            failed,
            dead,
            best_path_length,
            closest_distance,
        };
        info!(
            generation = stats.generation,
            finishers = stats.finishers,
            failed = stats.failed,
            dead = stats.dead,
            "Evaluated generation"
        );
        Ok(stats)
    }

    /// Build the next generation from the ranking: elite clones, one mutated
    /// offspring for each top performer, then stochastic acceptance sampling
    /// until the population is full.
    pub fn breed(&mut self) -> Result<(), PopulationError> {
        if self.ended.is_none() {
            return Err(self.in_progress());
        }
        if self.ranking.is_empty() {
            return Err(PopulationError::NotEvaluated);
        }

        let pop_size = self.config.pop_size;
        let mut_rate = self.config.mut_rate;
        let max_step = self.config.max_step;
        let mut next: Vec<Genome> = Vec::with_capacity(pop_size);

        // Elites survive unmutated
        for entry in self.ranking.iter().take(self.config.elite_count()) {
            next.push(self.agents[entry.agent].genome.clone());
        }

        for entry in self.ranking.iter().take(self.config.first_shot_count()) {
            let parent = &self.agents[entry.agent].genome;
            next.push(parent.mutated(mut_rate, max_step, &mut self.rng));
        }
        next.truncate(pop_size);

        let mut scans = 0u32;
        'fill: while next.len() < pop_size {
            if scans >= self.config.max_fill_scans {
                warn!(
                    scans,
                    missing = pop_size - next.len(),
                    "Acceptance sampling exhausted, filling uniformly"
                );
                while next.len() < pop_size {
                    let Some(entry) = self.ranking.choose(&mut self.rng) else {
                        break 'fill;
                    };
                    let parent = &self.agents[entry.agent].genome;
                    next.push(parent.mutated(mut_rate, max_step, &mut self.rng));
                }
                break;
            }
            scans += 1;
            for entry in &self.ranking {
                if self.rng.gen::<f64>() < entry.fitness {
                    let parent = &self.agents[entry.agent].genome;
                    next.push(parent.mutated(mut_rate, max_step, &mut self.rng));
                }
                if next.len() == pop_size {
                    break 'fill;
                }
            }
        }
        debug!(scans, generation = self.generation, "Bred next generation");

        for &handle in &self.handles {
            self.observer.on_cleanup(handle);
        }
        self.spawn(next);
        self.ranking.clear();
        self.tick = 0;
        self.ended = None;
        self.generation += 1;
        Ok(())
    }

    /// Simulate the current generation to its end, evaluate it, and breed.
    pub fn run_generation(&mut self) -> Result<GenerationStats, PopulationError> {
        while let TickOutcome::Advanced { .. } = self.tick() {}
        let stats = self.evaluate()?;
        self.breed()?;
        Ok(stats)
    }

    fn spawn(&mut self, genomes: Vec<Genome>) {
        let start = self.config.start;
        self.agents = genomes
            .into_iter()
            .map(|genome| Agent::new(start, genome))
            .collect();
        let observer = &mut self.observer;
        self.handles = (0..self.agents.len())
            .map(|_| observer.on_spawn(start))
            .collect();
    }

    fn in_progress(&self) -> PopulationError {
        PopulationError::GenerationInProgress {
            tick: self.tick,
            num_steps: self.config.num_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Bounds, Goal, Point};
    use crate::genome::Step;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(123)
    }

    fn small_config() -> SimConfig {
        SimConfig {
            bounds: Bounds::new(600, 600),
            pop_size: 20,
            mut_rate: 0.1,
            num_steps: 10,
            max_step: 5,
            duplication: 0.25,
            first_shot: 0.25,
            start: Point::new(300, 300),
            goal: Goal::new(550, 550, 10),
            rng_seed: Some(42),
            max_fill_scans: 10_000,
        }
    }

    #[derive(Debug, Default)]
    struct Counts {
        spawned: usize,
        moved: usize,
        died: usize,
        cleaned: usize,
    }

    struct CountingObserver(Arc<Mutex<Counts>>);

    impl PopulationObserver for CountingObserver {
        fn on_spawn(&mut self, _start: Point) -> ViewHandle {
            let mut c = self.0.lock().unwrap();
            c.spawned += 1;
            ViewHandle(c.spawned as u64)
        }
        fn on_move(&mut self, _handle: ViewHandle, _delta: Step) {
            self.0.lock().unwrap().moved += 1;
        }
        fn on_death(&mut self, _handle: ViewHandle) {
            self.0.lock().unwrap().died += 1;
        }
        fn on_cleanup(&mut self, _handle: ViewHandle) {
            self.0.lock().unwrap().cleaned += 1;
        }
    }

    // --- Construction ---

    #[test]
    fn population_has_correct_size() {
        let pop = Population::new(small_config()).unwrap();
        assert_eq!(pop.agents().len(), 20);
        assert_eq!(pop.tick_count(), 0);
        assert_eq!(pop.generation(), 1);
        assert!(pop.ranking().is_empty());
    }

    #[test]
    fn all_genomes_have_num_steps() {
        let pop = Population::new(small_config()).unwrap();
        for agent in pop.agents() {
            assert_eq!(agent.genome.len(), 10);
            assert_eq!(agent.position, Point::new(300, 300));
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SimConfig {
            duplication: 0.7,
            first_shot: 0.7,
            ..small_config()
        };
        assert!(matches!(
            Population::new(config),
            Err(PopulationError::Config(ConfigError::FractionsExceedOne { .. }))
        ));
    }

    #[test]
    fn seed_genomes_must_match_shape() {
        let genomes = vec![Genome::random(3, 5, &mut seeded_rng()); 20];
        let result =
            Population::from_genomes(small_config(), genomes, Box::new(NullObserver), seeded_rng());
        assert!(matches!(result, Err(PopulationError::SeedMismatch { .. })));
    }

    // --- Tick ---

    #[test]
    fn ticks_until_steps_exhausted() {
        let mut pop = Population::new(small_config()).unwrap();
        for _ in 0..9 {
            assert!(matches!(pop.tick(), TickOutcome::Advanced { .. }));
        }
        assert_eq!(pop.tick(), TickOutcome::Ended(GenerationEnd::StepsExhausted));
        assert_eq!(pop.tick_count(), 10);
    }

    #[test]
    fn tick_after_end_is_idempotent() {
        let mut pop = Population::new(small_config()).unwrap();
        while let TickOutcome::Advanced { .. } = pop.tick() {}
        let positions: Vec<Point> = pop.agents().iter().map(|a| a.position).collect();
        for _ in 0..5 {
            assert_eq!(pop.tick(), TickOutcome::Ended(GenerationEnd::StepsExhausted));
        }
        let after: Vec<Point> = pop.agents().iter().map(|a| a.position).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn all_dead_ends_generation_early() {
        let config = SimConfig {
            pop_size: 4,
            start: Point::new(2, 2),
            ..small_config()
        };
        let genomes = vec![
            Genome {
                steps: vec![Step::new(-5, 0); 10],
            };
            4
        ];
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut pop = Population::from_genomes(
            config,
            genomes,
            Box::new(CountingObserver(Arc::clone(&counts))),
            seeded_rng(),
        )
        .unwrap();

        assert_eq!(pop.tick(), TickOutcome::Ended(GenerationEnd::AllDead));
        assert_eq!(pop.tick_count(), 10);
        assert_eq!(pop.tick(), TickOutcome::Ended(GenerationEnd::AllDead));

        let stats = pop.evaluate().unwrap();
        assert_eq!(stats.dead, 4);
        assert_eq!(stats.end, GenerationEnd::AllDead);
        assert_eq!(counts.lock().unwrap().died, 4);
        assert_eq!(counts.lock().unwrap().moved, 0);
    }

    // --- Evaluate / breed preconditions ---

    #[test]
    fn breed_before_end_is_rejected_without_change() {
        let mut pop = Population::new(small_config()).unwrap();
        pop.tick();
        let genomes: Vec<Genome> = pop.agents().iter().map(|a| a.genome.clone()).collect();
        assert!(matches!(
            pop.breed(),
            Err(PopulationError::GenerationInProgress { tick: 1, num_steps: 10 })
        ));
        assert!(matches!(
            pop.evaluate(),
            Err(PopulationError::GenerationInProgress { .. })
        ));
        assert_eq!(pop.tick_count(), 1);
        let after: Vec<Genome> = pop.agents().iter().map(|a| a.genome.clone()).collect();
        assert_eq!(genomes, after);
    }

    #[test]
    fn breed_without_evaluation_is_rejected() {
        let mut pop = Population::new(small_config()).unwrap();
        while let TickOutcome::Advanced { .. } = pop.tick() {}
        assert!(matches!(pop.breed(), Err(PopulationError::NotEvaluated)));
        assert!(pop.is_finished());
    }

    // --- Breed ---

    #[test]
    fn breed_preserves_population_size_and_resets() {
        let mut pop = Population::new(small_config()).unwrap();
        for _ in 0..5 {
            pop.run_generation().unwrap();
            assert_eq!(pop.agents().len(), 20);
            assert_eq!(pop.tick_count(), 0);
            assert!(pop.ranking().is_empty());
            assert!(!pop.is_finished());
            for agent in pop.agents() {
                assert_eq!(agent.genome.len(), 10);
                assert_eq!(agent.fitness, 0.0);
                assert!(agent.alive);
            }
        }
        assert_eq!(pop.generation(), 6);
    }

    #[test]
    fn breed_keeps_elites_in_ranking_order() {
        let mut pop = Population::new(small_config()).unwrap();
        while let TickOutcome::Advanced { .. } = pop.tick() {}
        pop.evaluate().unwrap();
        let elites: Vec<Genome> = pop
            .ranking()
            .iter()
            .take(5)
            .map(|e| pop.agents()[e.agent].genome.clone())
            .collect();
        pop.breed().unwrap();
        for (i, genome) in elites.iter().enumerate() {
            assert_eq!(&pop.agents()[i].genome, genome);
        }
    }

    #[test]
    fn zero_fill_scans_falls_back_to_uniform() {
        let config = SimConfig {
            max_fill_scans: 0,
            duplication: 0.0,
            first_shot: 0.0,
            ..small_config()
        };
        let mut pop = Population::new(config).unwrap();
        pop.run_generation().unwrap();
        assert_eq!(pop.agents().len(), 20);
    }

    #[test]
    fn observer_sees_spawn_and_cleanup_per_agent() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut pop = Population::with_observer(
            small_config(),
            Box::new(CountingObserver(Arc::clone(&counts))),
        )
        .unwrap();
        assert_eq!(counts.lock().unwrap().spawned, 20);
        pop.run_generation().unwrap();
        let c = counts.lock().unwrap();
        assert_eq!(c.cleaned, 20);
        assert_eq!(c.spawned, 40);
    }

    #[test]
    fn same_seed_same_evolution() {
        let mut a = Population::new(small_config()).unwrap();
        let mut b = Population::new(small_config()).unwrap();
        for _ in 0..3 {
            assert_eq!(a.run_generation().unwrap(), b.run_generation().unwrap());
        }
        let ga: Vec<&Genome> = a.agents().iter().map(|x| &x.genome).collect();
        let gb: Vec<&Genome> = b.agents().iter().map(|x| &x.genome).collect();
        assert_eq!(ga, gb);
    }

    #[test]
    fn stats_display_mentions_counts() {
        let stats = GenerationStats {
            generation: 3,
            end: GenerationEnd::StepsExhausted,
            finishers: 2,
            failed: 5,
            dead: 1,
            best_path_length: Some(120.5),
            closest_distance: Some(3.0),
        };
        let text = stats.to_string();
        assert!(text.contains("Gen    3"));
        assert!(text.contains("Reached:     2"));
        assert!(text.contains("Shortest path: 120.5"));
    }
}
