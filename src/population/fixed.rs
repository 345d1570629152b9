//! Agents that only move when driven.

use ndarray::{s, Array2};

use super::dynamics::{Diffusion, Dynamics, StateView};
use crate::error::SimError;

/// `dx = u dt`; static when no controller drives it.
///
/// Forces are ignored. Inputs narrower than the state drive the leading
/// state dimensions.
#[derive(Debug, Clone, Default)]
pub struct FixedPopulation;

impl Dynamics for FixedPopulation {
    fn name(&self) -> &str {
        "FixedPopulation"
    }

    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError> {
        let k = state.x.ncols().min(state.u.ncols());
        let mut drift = Array2::<f64>::zeros(state.x.raw_dim());
        drift.slice_mut(s![.., ..k]).assign(&state.u.slice(s![.., ..k]));
        Ok(drift)
    }

    fn diffusion(&self, _state: &StateView<'_>) -> Result<Diffusion, SimError> {
        Ok(Diffusion::None)
    }
}
