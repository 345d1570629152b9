//! The state-update law of a population.

use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, ArrayViewMut2};

use crate::error::{ConfigError, SimError};
use crate::params::{ParamShape, Parameters};

/// Read-only view of everything drift and diffusion may depend on.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    /// Agent state, `N × state_dim`.
    pub x: ArrayView2<'a, f64>,
    /// Control input, `N × input_dim`.
    pub u: ArrayView2<'a, f64>,
    /// Input in effect during the previous integration step.
    pub u_prev: ArrayView2<'a, f64>,
    /// Accumulated external force, `N × input_dim`.
    pub f: ArrayView2<'a, f64>,
    /// Per-agent parameters fixed at reset.
    pub params: &'a Parameters,
}

/// Noise amplitude returned by [`Dynamics::diffusion`].
#[derive(Debug, Clone, PartialEq)]
pub enum Diffusion {
    /// Deterministic dynamics.
    None,
    /// Independent noise per dimension, `N × state_dim`.
    Diagonal(Array2<f64>),
    /// Correlated noise, one `state_dim × state_dim` matrix per agent.
    Correlated(Array3<f64>),
}

/// A drift/diffusion law.
///
/// Implementations are pure functions of a [`StateView`]; they keep no
/// state between calls.
pub trait Dynamics: fmt::Debug + Send + Sync {
    /// Returns a human-readable name for this law.
    fn name(&self) -> &str;

    /// Validates the state and input dimensions at construction.
    fn check_dims(&self, _state_dim: usize, _input_dim: usize) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Parameters this law reads, with their per-agent shapes.
    fn parameter_shapes(&self, _state_dim: usize, _input_dim: usize) -> Vec<(&'static str, ParamShape)> {
        Vec::new()
    }

    /// Deterministic part of the SDE, `N × state_dim`.
    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError>;

    /// Noise amplitude of the SDE.
    fn diffusion(&self, state: &StateView<'_>) -> Result<Diffusion, SimError>;

    /// Brings a freshly integrated state back to canonical form, e.g.
    /// wrapping angles. Runs after clamping.
    fn normalize_state(&self, _x: ArrayViewMut2<'_, f64>) {}
}

/// Rejects laws that add inputs straight onto the state.
pub(crate) fn require_matching_dims(
    model: &str,
    state_dim: usize,
    input_dim: usize,
) -> Result<(), ConfigError> {
    if state_dim != input_dim {
        return Err(ConfigError::InvalidValue {
            name: "input_dim".to_string(),
            reason: format!(
                "{} needs input_dim == state_dim, got {} and {}",
                model, input_dim, state_dim
            ),
        });
    }
    Ok(())
}

/// Stacks a `d × d` matrix parameter into `N × d × d`.
pub(crate) fn stack_matrices(values: ArrayView2<'_, f64>, d: usize) -> Array3<f64> {
    Array3::from_shape_fn((values.nrows(), d, d), |(i, a, b)| values[[i, a * d + b]])
}
