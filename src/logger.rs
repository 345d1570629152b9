//! Per-step observers: loggers decide early termination, renderers draw.

use ndarray::Array2;
use tracing::info;

use crate::environment::{fraction_in_goal, Environment};
use crate::population::Population;
use crate::PopulationId;

/// Read-only snapshot handed to loggers and renderers before each step.
#[derive(Debug, Clone, Copy)]
pub struct SimulationView<'a> {
    pub step: u64,
    pub time: f64,
    pub populations: &'a [Population],
    pub environment: &'a dyn Environment,
}

/// Records step data and may ask the simulation to stop.
pub trait Logger: Send {
    /// Clears recorded data at the start of an episode.
    fn reset(&mut self) {}

    /// Observes the pre-step state. Returns `true` to terminate after
    /// this step.
    fn log(&mut self, view: &SimulationView<'_>) -> bool;

    /// Called once when a batch simulation ends.
    fn close(&mut self, _view: &SimulationView<'_>) {}
}

/// Draws the current state. Has no effect on the simulation.
pub trait Renderer: Send {
    fn render(&mut self, view: &SimulationView<'_>);
}

/// Tracks the fraction of targets inside the goal and stops the run once
/// it reaches `threshold`.
#[derive(Debug, Clone)]
pub struct ShepherdingLogger {
    targets: PopulationId,
    threshold: f64,
    fractions: Vec<f64>,
    done_at: Option<u64>,
}

impl ShepherdingLogger {
    pub fn new(targets: PopulationId, threshold: f64) -> Self {
        Self {
            targets,
            threshold,
            fractions: Vec::new(),
            done_at: None,
        }
    }

    /// Fraction of targets in the goal at every logged step.
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// First step at which the threshold was reached.
    pub fn done_at(&self) -> Option<u64> {
        self.done_at
    }
}

impl Logger for ShepherdingLogger {
    fn reset(&mut self) {
        self.fractions.clear();
        self.done_at = None;
    }

    fn log(&mut self, view: &SimulationView<'_>) -> bool {
        let fraction = match (view.populations.get(self.targets), view.environment.goal()) {
            (Some(targets), Some(goal)) => fraction_in_goal(targets.state().view(), &goal),
            _ => 0.0,
        };
        self.fractions.push(fraction);
        let done = fraction >= self.threshold;
        if done && self.done_at.is_none() {
            self.done_at = Some(view.step);
            info!(step = view.step, time = view.time, fraction, "shepherding goal reached");
        }
        done
    }

    fn close(&mut self, view: &SimulationView<'_>) {
        info!(
            steps = self.fractions.len(),
            final_fraction = self.fractions.last().copied().unwrap_or(0.0),
            done_at = ?self.done_at,
            time = view.time,
            "shepherding run finished"
        );
    }
}

/// One recorded frame of a [`TrajectoryLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: u64,
    pub time: f64,
    /// State of every population, in simulator order.
    pub states: Vec<Array2<f64>>,
}

/// Stores population states every `every` steps. Never terminates a run.
#[derive(Debug, Clone)]
pub struct TrajectoryLogger {
    every: u64,
    frames: Vec<Frame>,
}

impl TrajectoryLogger {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl Default for TrajectoryLogger {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Logger for TrajectoryLogger {
    fn reset(&mut self) {
        self.frames.clear();
    }

    fn log(&mut self, view: &SimulationView<'_>) -> bool {
        if view.step % self.every == 0 {
            self.frames.push(Frame {
                step: view.step,
                time: view.time,
                states: view.populations.iter().map(|p| p.state().clone()).collect(),
            });
        }
        false
    }
}
