use crate::field::{Bounds, Goal, Point};
use crate::genome::{Genome, Step};

/// What happened to a single agent during one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Already dead, already in the goal, or no step left: nothing moved
    Idle,
    /// Moved by the given step and is still on the field
    Moved(Step),
    /// Moved by the given step and left the field
    Died(Step),
}

/// Where an agent stands once its generation has finished simulating
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Standing {
    Finished,
    Failed,
    Dead,
}

/// One candidate path: a genome plus its live simulation state
#[derive(Clone, Debug)]
pub struct Agent {
    pub genome: Genome,
    pub position: Point,
    pub alive: bool,
    pub fitness: f64,
}

impl Agent {
    pub fn new(start: Point, genome: Genome) -> Self {
        Self {
            genome,
            position: start,
            alive: true,
            fitness: 0.0,
        }
    }

    /// Apply step `t` of the genome. Death on leaving the field is permanent.
    pub fn step(&mut self, t: usize, bounds: &Bounds, goal: &Goal) -> StepOutcome {
        if !self.alive || self.in_goal(goal) {
            return StepOutcome::Idle;
        }
        let Some(step) = self.genome.get(t) else {
            return StepOutcome::Idle;
        };

        self.position = Point::new(
            self.position.x.saturating_add(step.dx),
            self.position.y.saturating_add(step.dy),
        );

        if bounds.out_of_bounds(self.position) {
            self.alive = false;
            StepOutcome::Died(step)
        } else {
            StepOutcome::Moved(step)
        }
    }

    pub fn in_goal(&self, goal: &Goal) -> bool {
        goal.contains(self.position)
    }

    pub fn path_length(&self) -> f64 {
        self.genome.path_length()
    }

    pub fn distance_from_goal(&self, goal: &Goal) -> f64 {
        goal.distance_from(self.position)
    }

    pub fn standing(&self, goal: &Goal) -> Standing {
        if !self.alive {
            Standing::Dead
        } else if self.in_goal(goal) {
            Standing::Finished
        } else {
            Standing::Failed
        }
    }
}
