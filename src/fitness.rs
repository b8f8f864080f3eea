//! Ranking and fitness assignment at the end of a generation.
//!
//! Finishers rank by shortest path, failed agents by closest distance to the
//! goal, and dead agents last. Once any agent finishes, the ranking handed to
//! breeding consists of finishers only, cycled best-first up to the
//! population size.

use crate::agent::{Agent, Standing};
use crate::field::Goal;

/// One slot in the breeding ranking
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedEntry {
    /// Index into the population's agent vector
    pub agent: usize,
    /// Rank-derived fitness in `[0, 1]`
    pub fitness: f64,
}

/// Result of ranking one generation
#[derive(Clone, Debug, Default)]
pub struct Evaluation {
    pub ranking: Vec<RankedEntry>,
    pub finishers: usize,
    pub failed: usize,
    pub dead: usize,
    /// Shortest path among finishers
    pub best_path_length: Option<f64>,
    /// Closest approach among agents that neither finished nor died
    pub closest_distance: Option<f64>,
}

pub struct FitnessEvaluator {
    goal: Goal,
    pop_size: usize,
}

impl FitnessEvaluator {
    pub fn new(goal: Goal, pop_size: usize) -> Self {
        Self { goal, pop_size }
    }

    /// Rank `agents` and write fitness onto every agent that appears in the
    /// ranking. Agents left out of the ranking keep their previous fitness.
    pub fn evaluate(&self, agents: &mut [Agent]) -> Evaluation {
        let mut finishers = Vec::new();
        let mut failed = Vec::new();
        let mut dead = Vec::new();
        for (i, agent) in agents.iter().enumerate() {
            match agent.standing(&self.goal) {
                Standing::Finished => finishers.push(i),
                Standing::Failed => failed.push(i),
                Standing::Dead => dead.push(i),
            }
        }

        // Stable sorts: ties keep construction order
        let path: Vec<f64> = agents.iter().map(Agent::path_length).collect();
        finishers.sort_by(|&a, &b| path[a].total_cmp(&path[b]));
        let dist: Vec<f64> = agents
            .iter()
            .map(|a| a.distance_from_goal(&self.goal))
            .collect();
        failed.sort_by(|&a, &b| dist[a].total_cmp(&dist[b]));

        let order: Vec<usize> = if finishers.is_empty() {
            failed.iter().chain(dead.iter()).copied().collect()
        } else {
            finishers
                .iter()
                .copied()
                .cycle()
                .take(self.pop_size.max(finishers.len()))
                .collect()
        };

        let ranking = self.assign(agents, &order);

        Evaluation {
            ranking,
            finishers: finishers.len(),
            failed: failed.len(),
            dead: dead.len(),
            best_path_length: finishers.first().map(|&i| path[i]),
            closest_distance: failed.first().map(|&i| dist[i]),
        }
    }

    /// Linear rank fitness: 1.0 for the first slot, minus `1 / pop_size` per slot
    fn assign(&self, agents: &mut [Agent], order: &[usize]) -> Vec<RankedEntry> {
        let decrement = 1.0 / self.pop_size.max(1) as f64;
        let mut seen = vec![false; agents.len()];
        order
            .iter()
            .enumerate()
            .map(|(rank, &agent)| {
                let fitness = (1.0 - rank as f64 * decrement).clamp(0.0, 1.0);
                if !seen[agent] {
                    seen[agent] = true;
                    agents[agent].fitness = fitness;
                }
                RankedEntry { agent, fitness }
            })
            .collect()
    }
}
