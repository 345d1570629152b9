//! herdsim - stochastic multi-agent swarm simulation
//!
//! Populations of point agents evolve under coupled stochastic differential
//! equations. Pairwise force laws couple populations, an Euler–Maruyama
//! integrator advances them, and controllers (such as the shepherding
//! assignment law) close the loop at their own sampling rates.

pub mod config;
pub mod controllers;
pub mod environment;
pub mod error;
pub mod integrators;
pub mod interactions;
pub mod logger;
pub mod params;
pub mod population;
pub mod simulator;
mod spatial;

pub use config::SimulationConfig;
pub use controllers::{
    Controller, GaussianField, GaussianRepulsion, SampleClock, ShepherdingController, ShepherdingGains,
};
pub use environment::{EmptyEnvironment, Environment, GoalRegion, ShepherdingEnvironment};
pub use error::{ConfigError, SimError};
pub use integrators::{EulerMaruyama, Integrator};
pub use interactions::{
    HarmonicRepulsion, Interaction, Kernel, LennardJones, PairwiseInteraction,
    PowerLawInteraction, PowerLawRepulsion,
};
pub use logger::{Logger, Renderer, ShepherdingLogger, SimulationView, TrajectoryLogger};
pub use params::{ParamShape, ParameterSpec, Parameters, Sampler};
pub use population::{
    Diffusion, Dynamics, InitialConditions, ModelConfig, PersistentTurningWalker, Population,
    PopulationConfig,
};
pub use simulator::{SimulationOutcome, Simulator, StepResult};

/// Identifier type used for populations, interactions and controllers.
pub type Id = String;

/// Index of a population inside a [`Simulator`].
pub type PopulationId = usize;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}

/// Installs a `tracing` subscriber writing to stderr.
///
/// `level` is an env-filter directive such as `"info"` or
/// `"herdsim=debug"`; defaults to `"info"`. Calling this more than once is
/// harmless.
pub fn setup_logging(level: Option<&str>) {
    let filter = level.unwrap_or("info").to_string();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
