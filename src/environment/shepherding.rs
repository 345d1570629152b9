//! Shepherding arena with a (possibly moving) goal region.

use std::collections::BTreeMap;

use ndarray::ArrayView2;
use serde::Deserialize;

use super::{default_dimensions, Environment, GoalRegion};

fn default_goal_radius() -> f64 {
    5.0
}

fn default_num_steps() -> u64 {
    2000
}

fn default_start_delay() -> u64 {
    1000
}

/// Settings of a [`ShepherdingEnvironment`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShepherdingEnvironmentConfig {
    #[serde(default = "default_dimensions")]
    pub dimensions: (f64, f64),
    #[serde(default = "default_goal_radius")]
    pub goal_radius: f64,
    /// Goal center at the start of an episode.
    #[serde(default)]
    pub goal_pos: [f64; 2],
    /// Where the goal ends up; stationary when absent.
    #[serde(default)]
    pub final_goal_pos: Option<[f64; 2]>,
    /// Number of steps the goal takes to travel.
    #[serde(default = "default_num_steps")]
    pub num_steps: u64,
    /// Steps before the goal starts moving.
    #[serde(default = "default_start_delay")]
    pub start_delay: u64,
}

impl Default for ShepherdingEnvironmentConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            goal_radius: default_goal_radius(),
            goal_pos: [0.0, 0.0],
            final_goal_pos: None,
            num_steps: default_num_steps(),
            start_delay: default_start_delay(),
        }
    }
}

/// Goal moves linearly from `goal_pos` to `final_goal_pos` in `num_steps`
/// equal increments, starting `start_delay` steps into the episode.
#[derive(Debug, Clone)]
pub struct ShepherdingEnvironment {
    config: ShepherdingEnvironmentConfig,
    goal_pos: [f64; 2],
    step: u64,
}

impl ShepherdingEnvironment {
    pub fn new(config: ShepherdingEnvironmentConfig) -> Self {
        let goal_pos = config.goal_pos;
        Self {
            config,
            goal_pos,
            step: 0,
        }
    }

    /// Steps taken since the last reset.
    pub fn steps(&self) -> u64 {
        self.step
    }

    fn goal_at(&self, step: u64) -> [f64; 2] {
        let start = self.config.goal_pos;
        let end = match self.config.final_goal_pos {
            Some(end) if self.config.num_steps > 0 => end,
            _ => return start,
        };
        let moved = step.saturating_sub(self.config.start_delay).min(self.config.num_steps);
        let progress = moved as f64 / self.config.num_steps as f64;
        [
            start[0] + progress * (end[0] - start[0]),
            start[1] + progress * (end[1] - start[1]),
        ]
    }
}

impl Environment for ShepherdingEnvironment {
    fn name(&self) -> &str {
        "ShepherdingEnvironment"
    }

    fn dimensions(&self) -> (f64, f64) {
        self.config.dimensions
    }

    fn goal(&self) -> Option<GoalRegion> {
        Some(GoalRegion {
            center: self.goal_pos,
            radius: self.config.goal_radius,
        })
    }

    fn reset(&mut self) {
        self.step = 0;
        self.goal_pos = self.config.goal_pos;
    }

    fn update(&mut self) {
        self.step += 1;
        self.goal_pos = self.goal_at(self.step);
    }

    fn info(&self) -> BTreeMap<String, f64> {
        let mut info = BTreeMap::new();
        info.insert("goal_x".to_string(), self.goal_pos[0]);
        info.insert("goal_y".to_string(), self.goal_pos[1]);
        info.insert("goal_radius".to_string(), self.config.goal_radius);
        info
    }
}

/// Fraction of targets (rows, first two columns as position) inside `goal`.
///
/// An empty target set counts as not done.
pub fn fraction_in_goal(targets: ArrayView2<'_, f64>, goal: &GoalRegion) -> f64 {
    let m = targets.nrows();
    if m == 0 || targets.ncols() < 2 {
        return 0.0;
    }
    let inside = targets
        .rows()
        .into_iter()
        .filter(|t| goal.contains(t[0], t[1]))
        .count();
    inside as f64 / m as f64
}

/// Whether at least `threshold` of the targets are inside `goal`.
pub fn shepherding_done(targets: ArrayView2<'_, f64>, goal: &GoalRegion, threshold: f64) -> bool {
    fraction_in_goal(targets, goal) >= threshold
}
