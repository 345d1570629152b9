//! Initial agent states.

use std::f64::consts::TAU;
use std::path::PathBuf;

use ndarray::Array2;
use rand::Rng;
use serde::Deserialize;

use crate::config::files;
use crate::error::ConfigError;

/// How the initial state `x0` of a population is produced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InitialConditions {
    /// One row per agent, given inline.
    Explicit { states: Vec<Vec<f64>> },
    /// Uniform in the hyper-rectangle `[lower_bounds, upper_bounds]`.
    #[serde(rename = "box")]
    Uniform {
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
    },
    /// Uniform (in area) over an annulus for the first two dimensions,
    /// uniform in the given bounds for the rest (zero when absent).
    #[serde(rename = "circle")]
    Disc {
        #[serde(default)]
        min_radius: f64,
        max_radius: f64,
        #[serde(default)]
        lower_bounds_other_states: Option<Vec<f64>>,
        #[serde(default)]
        upper_bounds_other_states: Option<Vec<f64>>,
    },
    /// Rows loaded from a `.csv` or `.json` file.
    File { file_path: PathBuf },
}

fn check_len(name: &str, values: &[f64], expected: usize) -> Result<(), ConfigError> {
    if values.len() != expected {
        return Err(ConfigError::ShapeMismatch {
            name: name.to_string(),
            expected: format!("{} values", expected),
            found: format!("{} values", values.len()),
        });
    }
    Ok(())
}

fn uniform_between<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if low < high {
        rng.gen_range(low..high)
    } else {
        low
    }
}

fn check_ordered(name: &str, lower: &[f64], upper: &[f64]) -> Result<(), ConfigError> {
    if lower.iter().zip(upper).any(|(l, u)| !(l <= u)) {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "lower bound exceeds upper bound".to_string(),
        });
    }
    Ok(())
}

impl InitialConditions {
    /// Loads data-backed states. The row count is whatever the data holds.
    ///
    /// Returns `Ok(None)` for sampled initial conditions.
    pub fn load(&self, state_dim: usize) -> Result<Option<Array2<f64>>, ConfigError> {
        let rows = match self {
            InitialConditions::Explicit { states } => states.clone(),
            InitialConditions::File { file_path } => files::read_states(file_path)?,
            _ => return Ok(None),
        };
        for row in &rows {
            check_len("initial_conditions.states", row, state_dim)?;
        }
        let n = rows.len();
        Ok(Some(Array2::from_shape_fn((n, state_dim), |(i, k)| {
            rows[i][k]
        })))
    }

    /// Produces an `n × state_dim` initial state.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        state_dim: usize,
        rng: &mut R,
    ) -> Result<Array2<f64>, ConfigError> {
        match self {
            InitialConditions::Explicit { .. } | InitialConditions::File { .. } => {
                Ok(self.load(state_dim)?.unwrap_or_else(|| Array2::zeros((0, state_dim))))
            }
            InitialConditions::Uniform {
                lower_bounds,
                upper_bounds,
            } => {
                check_len("lower_bounds", lower_bounds, state_dim)?;
                check_len("upper_bounds", upper_bounds, state_dim)?;
                check_ordered("initial_conditions", lower_bounds, upper_bounds)?;
                let mut x = Array2::zeros((n, state_dim));
                for mut row in x.rows_mut() {
                    for (k, v) in row.iter_mut().enumerate() {
                        *v = uniform_between(rng, lower_bounds[k], upper_bounds[k]);
                    }
                }
                Ok(x)
            }
            InitialConditions::Disc {
                min_radius,
                max_radius,
                lower_bounds_other_states,
                upper_bounds_other_states,
            } => {
                if state_dim < 2 {
                    return Err(ConfigError::InvalidValue {
                        name: "initial_conditions".to_string(),
                        reason: "circle sampling needs state_dim >= 2".to_string(),
                    });
                }
                if !(0.0 <= *min_radius && min_radius <= max_radius) {
                    return Err(ConfigError::InvalidValue {
                        name: "max_radius".to_string(),
                        reason: format!(
                            "expected 0 <= min_radius ({}) <= max_radius ({})",
                            min_radius, max_radius
                        ),
                    });
                }
                let extra = state_dim - 2;
                let zeros = vec![0.0; extra];
                let lower = lower_bounds_other_states.as_deref().unwrap_or(&zeros);
                let upper = upper_bounds_other_states.as_deref().unwrap_or(&zeros);
                check_len("lower_bounds_other_states", lower, extra)?;
                check_len("upper_bounds_other_states", upper, extra)?;
                check_ordered("initial_conditions", lower, upper)?;

                let mut x = Array2::zeros((n, state_dim));
                for mut row in x.rows_mut() {
                    let theta = rng.gen_range(0.0..TAU);
                    let r2 = uniform_between(rng, min_radius * min_radius, max_radius * max_radius);
                    let r = r2.sqrt();
                    row[0] = r * theta.cos();
                    row[1] = r * theta.sin();
                    for k in 0..extra {
                        row[k + 2] = uniform_between(rng, lower[k], upper[k]);
                    }
                }
                Ok(x)
            }
        }
    }
}
