//! Herder control law of Lama and di Bernardo (2024).
//!
//! The goal is assumed to sit at the origin. Each target is owned by its
//! closest herder; a herder chases the owned target, within sensing radius
//! `xi`, that is farthest from the origin, and otherwise heads home.

use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;
use tracing::trace;

use super::Controller;
use crate::environment::Environment;
use crate::error::{ConfigError, SimError};
use crate::population::Population;
use crate::spatial::{norm, pairwise, MIN_DISTANCE};
use crate::{Id, PopulationId};

/// Gains of the shepherding law.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShepherdingGains {
    /// Sensing radius.
    pub xi: f64,
    /// Speed when returning home.
    pub v_h: f64,
    /// Proportional gain towards the standoff point.
    pub alpha: f64,
    /// Standoff distance behind the target.
    pub delta: f64,
    /// Home radius around the origin.
    pub rho_g: f64,
}

impl Default for ShepherdingGains {
    fn default() -> Self {
        Self {
            xi: 15.0,
            v_h: 12.0,
            alpha: 3.0,
            delta: 1.25,
            rho_g: 10.0,
        }
    }
}

/// Target selected by each herder, if any.
///
/// A target belongs to its closest herder (lowest index on ties). A
/// herder is eligible for its own targets closer than `xi` and picks the
/// one farthest from the origin, lowest index on ties.
pub fn assign_targets(
    herders: ArrayView2<'_, f64>,
    targets: ArrayView2<'_, f64>,
    xi: f64,
) -> Vec<Option<usize>> {
    let n = herders.nrows();
    let geometry = pairwise(herders, targets);
    let distances = &geometry.distances;

    let mut owned: Vec<Option<(usize, f64)>> = vec![None; n];
    for (j, target) in targets.rows().into_iter().enumerate() {
        let mut closest: Option<(usize, f64)> = None;
        for i in 0..n {
            let d = distances[[i, j]];
            if closest.map_or(true, |(_, best)| d < best) {
                closest = Some((i, d));
            }
        }
        let (i, d) = match closest {
            Some(c) => c,
            None => continue,
        };
        if d >= xi {
            continue;
        }
        let radius = norm(target);
        if owned[i].map_or(true, |(_, best)| radius > best) {
            owned[i] = Some((j, radius));
        }
    }
    owned.into_iter().map(|o| o.map(|(j, _)| j)).collect()
}

fn unit(v: ArrayView1<'_, f64>) -> [f64; 2] {
    let r = norm(v).max(MIN_DISTANCE);
    [v[0] / r, v[1] / r]
}

/// Velocity command for every herder, shape `N × 2`.
///
/// Positions are the first two columns of `herders` and `targets`; both
/// must have at least two columns.
pub fn shepherding_action(
    herders: ArrayView2<'_, f64>,
    targets: ArrayView2<'_, f64>,
    gains: &ShepherdingGains,
) -> Array2<f64> {
    let herders = herders.slice(s![.., ..2]);
    let targets = targets.slice(s![.., ..2]);
    let assignment = assign_targets(herders, targets, gains.xi);

    let mut action = Array2::<f64>::zeros((herders.nrows(), 2));
    for (i, selected) in assignment.into_iter().enumerate() {
        let h = herders.row(i);
        let command = match selected {
            Some(j) => {
                let t = targets.row(j);
                let dir = unit(t);
                [
                    -gains.alpha * (h[0] - (t[0] + gains.delta * dir[0])),
                    -gains.alpha * (h[1] - (t[1] + gains.delta * dir[1])),
                ]
            }
            None if norm(h) < gains.rho_g => [0.0, 0.0],
            None => {
                let dir = unit(h);
                [-gains.v_h * dir[0], -gains.v_h * dir[1]]
            }
        };
        action[[i, 0]] = command[0];
        action[[i, 1]] = command[1];
    }
    action
}

/// Drives a herder population to push a target population to the origin.
#[derive(Debug, Clone)]
pub struct ShepherdingController {
    name: Id,
    herders: PopulationId,
    targets: PopulationId,
    gains: ShepherdingGains,
    dt: Option<f64>,
}

impl ShepherdingController {
    pub fn new(herders: PopulationId, targets: PopulationId, gains: ShepherdingGains) -> Self {
        Self {
            name: "ShepherdingController".to_string(),
            herders,
            targets,
            gains,
            dt: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the sampling period; `None` fires every step.
    pub fn with_dt(mut self, dt: Option<f64>) -> Result<Self, ConfigError> {
        if let Some(dt) = dt {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    name: format!("{}.dt", self.name),
                    reason: format!("sampling period must be positive, got {}", dt),
                });
            }
        }
        self.dt = dt;
        Ok(self)
    }

    pub fn gains(&self) -> &ShepherdingGains {
        &self.gains
    }

    pub fn targets(&self) -> PopulationId {
        self.targets
    }
}

impl Controller for ShepherdingController {
    fn name(&self) -> &str {
        &self.name
    }

    fn population(&self) -> PopulationId {
        self.herders
    }

    fn dt(&self) -> Option<f64> {
        self.dt
    }

    fn action(
        &mut self,
        populations: &[Population],
        _environment: &dyn Environment,
    ) -> Result<Array2<f64>, SimError> {
        let herders = populations
            .get(self.herders)
            .ok_or(SimError::UnknownPopulation(self.herders))?;
        let targets = populations
            .get(self.targets)
            .ok_or(SimError::UnknownPopulation(self.targets))?;
        let planar = |population: &Population, width: usize| {
            if width < 2 {
                return Err(SimError::ShapeMismatch {
                    population: population.name().to_string(),
                    what: "planar position",
                    expected: (population.n(), 2),
                    found: (population.n(), width),
                });
            }
            Ok(())
        };
        planar(herders, herders.state_dim().min(herders.input_dim()))?;
        planar(targets, targets.state_dim())?;

        let velocity = shepherding_action(herders.state().view(), targets.state().view(), &self.gains);
        let mut u = Array2::<f64>::zeros((herders.n(), herders.input_dim()));
        u.slice_mut(s![.., ..2]).assign(&velocity);
        trace!(controller = %self.name, herders = herders.n(), targets = targets.n(), "shepherding action");
        Ok(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn herder_picks_farthest_owned_target() {
        let herders = array![[10.0, 0.0], [-10.0, 0.0]];
        let targets = array![[12.0, 0.0], [14.0, 3.0], [-12.0, 0.0]];
        let gains = ShepherdingGains::default();
        assert_eq!(
            assign_targets(herders.view(), targets.view(), gains.xi),
            vec![Some(1), Some(2)]
        );

        let action = shepherding_action(herders.view(), targets.view(), &gains);
        let r = (14.0f64 * 14.0 + 9.0).sqrt();
        let goal_x = 14.0 + 1.25 * 14.0 / r;
        let goal_y = 3.0 + 1.25 * 3.0 / r;
        assert!(close(action[[0, 0]], -3.0 * (10.0 - goal_x)));
        assert!(close(action[[0, 1]], -3.0 * (0.0 - goal_y)));
        assert!(close(action[[1, 0]], -3.0 * (-10.0 - (-12.0 - 1.25))));
        assert!(close(action[[1, 1]], 0.0));
    }

    #[test]
    fn targets_owned_by_another_herder_are_ignored() {
        // Target 0 is within xi of herder 0 but closer to herder 1.
        let herders = array![[0.0, 20.0], [0.0, 30.0]];
        let targets = array![[0.0, 27.0]];
        assert_eq!(
            assign_targets(herders.view(), targets.view(), 15.0),
            vec![None, Some(0)]
        );
    }

    #[test]
    fn equidistant_targets_pick_lowest_index() {
        let herders = array![[20.0, 0.0]];
        let targets = array![[0.0, 25.0], [25.0, 0.0], [15.0, 20.0]];
        assert_eq!(
            assign_targets(herders.view(), targets.view(), 40.0),
            vec![Some(0)]
        );
    }

    #[test]
    fn idle_inside_home_radius() {
        let herders = array![[1.0, 1.0]];
        let targets = array![[100.0, 0.0]];
        let action = shepherding_action(herders.view(), targets.view(), &ShepherdingGains::default());
        assert_eq!(action, array![[0.0, 0.0]]);
    }

    #[test]
    fn returns_home_at_fixed_speed() {
        let herders = array![[30.0, 40.0]];
        let targets = array![[-100.0, 0.0]];
        let action = shepherding_action(herders.view(), targets.view(), &ShepherdingGains::default());
        assert!(close(action[[0, 0]], -7.2));
        assert!(close(action[[0, 1]], -9.6));
    }

    #[test]
    fn degenerate_origin_positions_stay_finite() {
        let gains = ShepherdingGains {
            rho_g: 0.0,
            ..Default::default()
        };
        let herders = array![[0.0, 0.0], [50.0, 50.0]];
        let targets = array![[0.0, 0.0]];
        let action = shepherding_action(herders.view(), targets.view(), &gains);
        assert!(action.iter().all(|v| v.is_finite()));
        assert_eq!(action.row(0).to_vec(), vec![0.0, 0.0]);

        let alone = array![[0.0, 0.0]];
        let none: Array2<f64> = Array2::zeros((0, 2));
        let action = shepherding_action(alone.view(), none.view(), &gains);
        assert!(action.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn gains_fill_missing_fields_from_defaults() {
        let gains: ShepherdingGains = toml::from_str("xi = 5.0").unwrap();
        assert_eq!(gains.xi, 5.0);
        assert_eq!(gains.v_h, 12.0);
        assert_eq!(gains.rho_g, 10.0);
    }
}
