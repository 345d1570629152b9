//! Agent populations: state, inputs, forces and their update law.

pub mod brownian_motion;
pub mod double_integrators;
pub mod dynamics;
pub mod fixed;
pub mod initial;
pub mod persistent_turning_walker;
pub mod simple_integrators;

use ndarray::{s, Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, SimError};
use crate::params::{ParameterSpec, Parameters};
use crate::Id;

pub use brownian_motion::BrownianMotion;
pub use double_integrators::DampedDoubleIntegrators;
pub use dynamics::{Diffusion, Dynamics, StateView};
pub use fixed::FixedPopulation;
pub use initial::InitialConditions;
pub use persistent_turning_walker::PersistentTurningWalker;
pub use simple_integrators::SimpleIntegrators;

fn unbounded() -> f64 {
    f64::INFINITY
}

/// Which built-in law a population follows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    BrownianMotion {
        #[serde(default)]
        correlated: bool,
    },
    SimpleIntegrators {
        #[serde(default = "unbounded")]
        v_max: f64,
        #[serde(default)]
        noisy: bool,
    },
    DampedDoubleIntegrators,
    /// `dt` is the interval of the stimulus derivative.
    PersistentTurningWalker {
        dt: f64,
    },
    Fixed,
}

impl ModelConfig {
    /// Instantiates the law.
    pub fn build(&self) -> Box<dyn Dynamics> {
        match *self {
            ModelConfig::BrownianMotion { correlated } => Box::new(BrownianMotion::new(correlated)),
            ModelConfig::SimpleIntegrators { v_max, noisy } => {
                Box::new(SimpleIntegrators::new(v_max, noisy))
            }
            ModelConfig::DampedDoubleIntegrators => Box::new(DampedDoubleIntegrators),
            ModelConfig::PersistentTurningWalker { dt } => Box::new(PersistentTurningWalker::new(dt)),
            ModelConfig::Fixed => Box::new(FixedPopulation),
        }
    }
}

/// Configuration of one population.
///
/// ```toml
/// [[populations]]
/// name = "targets"
/// N = 20
/// state_dim = 2
/// model = { kind = "brownian_motion" }
/// initial_conditions = { mode = "circle", max_radius = 40.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Unique name; a UUID is generated when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Configured agent count. Data-backed initial conditions override it.
    #[serde(rename = "N", alias = "n")]
    pub n: usize,
    pub state_dim: usize,
    /// Defaults to `state_dim`.
    #[serde(default)]
    pub input_dim: Option<usize>,
    /// Lower clamp bound, one value per dimension or one for all.
    #[serde(default)]
    pub lim_i: Option<Vec<f64>>,
    /// Upper clamp bound, one value per dimension or one for all.
    #[serde(default)]
    pub lim_s: Option<Vec<f64>>,
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub parameters: Option<ParameterSpec>,
    pub model: ModelConfig,
    /// Seed for initial conditions and parameters; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PopulationConfig {
    /// Minimal configuration for `n` agents starting at explicit states.
    pub fn explicit(name: &str, states: Vec<Vec<f64>>, model: ModelConfig) -> Self {
        let state_dim = states.first().map_or(0, Vec::len);
        Self {
            name: Some(name.to_string()),
            n: states.len(),
            state_dim,
            input_dim: None,
            lim_i: None,
            lim_s: None,
            initial_conditions: InitialConditions::Explicit { states },
            parameters: None,
            model,
            seed: None,
        }
    }
}

fn bounds(name: &str, values: Option<&[f64]>, dims: usize, default: f64) -> Result<Array1<f64>, ConfigError> {
    match values {
        None | Some([]) => Ok(Array1::from_elem(dims, default)),
        Some([v]) => Ok(Array1::from_elem(dims, *v)),
        Some(v) if v.len() == dims => Ok(Array1::from(v.to_vec())),
        Some(v) => Err(ConfigError::ShapeMismatch {
            name: name.to_string(),
            expected: format!("1 or {} values", dims),
            found: format!("{} values", v.len()),
        }),
    }
}

/// A group of agents sharing one update law.
///
/// # Lifecycle
///
/// 1. [`Population::new`] validates the configuration.
/// 2. [`Population::reset`] samples initial state and parameters.
/// 3. The simulator sets `u`, adds forces into `f`, and the integrator
///    updates `x` once per step.
#[derive(Debug)]
pub struct Population {
    name: Id,
    n: usize,
    state_dim: usize,
    input_dim: usize,
    x: Array2<f64>,
    u: Array2<f64>,
    u_prev: Array2<f64>,
    f: Array2<f64>,
    params: Parameters,
    lim_i: Array1<f64>,
    lim_s: Array1<f64>,
    initial: InitialConditions,
    /// States loaded once from explicit/file initial conditions.
    fixed_initial: Option<Array2<f64>>,
    param_spec: Option<ParameterSpec>,
    dynamics: Box<dyn Dynamics>,
    rng: StdRng,
    ready: bool,
}

impl Population {
    /// Builds a population with one of the built-in laws.
    pub fn new(config: PopulationConfig) -> Result<Self, ConfigError> {
        let dynamics = config.model.build();
        Self::with_dynamics(config, dynamics)
    }

    /// Builds a population with a caller-supplied law.
    pub fn with_dynamics(config: PopulationConfig, dynamics: Box<dyn Dynamics>) -> Result<Self, ConfigError> {
        let name = config.name.unwrap_or_else(crate::generate_id);
        let state_dim = config.state_dim;
        if state_dim == 0 {
            return Err(ConfigError::InvalidValue {
                name: format!("{}.state_dim", name),
                reason: "must be at least 1".to_string(),
            });
        }
        let input_dim = config.input_dim.unwrap_or(state_dim);
        dynamics.check_dims(state_dim, input_dim)?;

        let lim_i = bounds("lim_i", config.lim_i.as_deref(), state_dim, f64::NEG_INFINITY)?;
        let lim_s = bounds("lim_s", config.lim_s.as_deref(), state_dim, f64::INFINITY)?;
        if lim_i.iter().zip(lim_s.iter()).any(|(lo, hi)| lo > hi) {
            return Err(ConfigError::InvalidValue {
                name: format!("{}.lim_i", name),
                reason: "lower clamp bound exceeds upper bound".to_string(),
            });
        }

        let mut n = config.n;
        let fixed_initial = config.initial_conditions.load(state_dim)?;
        if let Some(states) = &fixed_initial {
            if states.nrows() != n {
                warn!(
                    population = %name,
                    configured = n,
                    loaded = states.nrows(),
                    "initial conditions disagree with N, adjusting population size"
                );
                n = states.nrows();
            }
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            name,
            n,
            state_dim,
            input_dim,
            x: Array2::zeros((n, state_dim)),
            u: Array2::zeros((n, input_dim)),
            u_prev: Array2::zeros((n, input_dim)),
            f: Array2::zeros((n, input_dim)),
            params: Parameters::new(),
            lim_i,
            lim_s,
            initial: config.initial_conditions,
            fixed_initial,
            param_spec: config.parameters,
            dynamics,
            rng,
            ready: false,
        })
    }

    /// Restores the initial state, redraws parameters and zeroes `u` and `f`.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let shapes = self.dynamics.parameter_shapes(self.state_dim, self.input_dim);
        self.params = match &self.param_spec {
            Some(spec) => spec.resolve(&self.name, &shapes, self.n, &mut self.rng)?,
            None => match shapes.first() {
                Some((missing, _)) => {
                    return Err(ConfigError::MissingParameter {
                        owner: self.name.clone(),
                        name: missing.to_string(),
                    })
                }
                None => Parameters::new(),
            },
        };

        self.x = match &self.fixed_initial {
            Some(states) => states.clone(),
            None => self.initial.sample(self.n, self.state_dim, &mut self.rng)?,
        };
        self.u = Array2::zeros((self.n, self.input_dim));
        self.u_prev = Array2::zeros((self.n, self.input_dim));
        self.f = Array2::zeros((self.n, self.input_dim));
        self.ready = true;

        debug!(
            population = %self.name,
            model = self.dynamics.name(),
            n = self.n,
            state_dim = self.state_dim,
            params = self.params.len(),
            "population reset"
        );
        Ok(())
    }

    fn view(&self) -> Result<StateView<'_>, SimError> {
        if !self.ready {
            return Err(SimError::NotReset(self.name.clone()));
        }
        Ok(StateView {
            x: self.x.view(),
            u: self.u.view(),
            u_prev: self.u_prev.view(),
            f: self.f.view(),
            params: &self.params,
        })
    }

    /// Deterministic part of the SDE, `N × state_dim`.
    pub fn drift(&self) -> Result<Array2<f64>, SimError> {
        let drift = self.dynamics.drift(&self.view()?)?;
        self.check_shape("drift", drift.dim(), (self.n, self.state_dim))?;
        Ok(drift)
    }

    /// Noise amplitude of the SDE.
    pub fn diffusion(&self) -> Result<Diffusion, SimError> {
        self.dynamics.diffusion(&self.view()?)
    }

    fn check_shape(&self, what: &'static str, found: (usize, usize), expected: (usize, usize)) -> Result<(), SimError> {
        if found != expected {
            return Err(SimError::ShapeMismatch {
                population: self.name.clone(),
                what,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Replaces the control input.
    pub fn set_input(&mut self, u: Array2<f64>) -> Result<(), SimError> {
        self.check_shape("input", u.dim(), (self.n, self.input_dim))?;
        self.u = u;
        Ok(())
    }

    /// Adds an external force contribution into `f`.
    pub fn add_force(&mut self, force: &Array2<f64>) -> Result<(), SimError> {
        self.check_shape("force", force.dim(), (self.n, self.input_dim))?;
        self.f += force;
        Ok(())
    }

    /// Zeroes the force accumulator.
    pub fn clear_force(&mut self) {
        self.f.fill(0.0);
    }

    /// Overwrites the state, e.g. after an integration step.
    pub fn set_state(&mut self, x: Array2<f64>) -> Result<(), SimError> {
        self.check_shape("state", x.dim(), (self.n, self.state_dim))?;
        self.x = x;
        Ok(())
    }

    /// Clamps every component of `x` into `[lim_i, lim_s]`, then lets the
    /// model normalize the state.
    pub fn clamp_state(&mut self) {
        for mut row in self.x.rows_mut() {
            for (k, v) in row.iter_mut().enumerate() {
                *v = v.max(self.lim_i[k]).min(self.lim_s[k]);
            }
        }
        self.dynamics.normalize_state(self.x.view_mut());
    }

    /// Records the current input as the one in effect for the step just
    /// integrated. Integrators call this once per step.
    pub fn latch_input(&mut self) {
        self.u_prev.assign(&self.u);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn state(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn input(&self) -> &Array2<f64> {
        &self.u
    }

    /// Input of the previous step.
    pub fn previous_input(&self) -> &Array2<f64> {
        &self.u_prev
    }

    pub fn force(&self) -> &Array2<f64> {
        &self.f
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Lower and upper clamp bounds.
    pub fn bounds(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.lim_i, &self.lim_s)
    }

    pub fn model_name(&self) -> &str {
        self.dynamics.name()
    }

    /// The first `dims` state columns (positions for most models).
    pub fn positions(&self, dims: usize) -> ArrayView2<'_, f64> {
        let dims = dims.min(self.state_dim);
        self.x.slice(s![.., ..dims])
    }
}
