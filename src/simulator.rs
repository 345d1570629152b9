//! The per-step driver.
//!
//! Each step, in order: the logger observes the pre-step state and may
//! request termination, the renderer draws, due controllers set their
//! population's input, every interaction's force is summed per target,
//! the integrator advances all populations, forces are cleared, and the
//! environment advances.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{LoggerConfig, SimulationConfig};
use crate::controllers::{Controller, SampleClock};
use crate::environment::{EmptyEnvironment, Environment};
use crate::error::{ConfigError, SimError};
use crate::integrators::{EulerMaruyama, Integrator};
use crate::interactions::Interaction;
use crate::logger::{Logger, Renderer, ShepherdingLogger, SimulationView, TrajectoryLogger};
use crate::population::Population;
use crate::PopulationId;

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// Steps actually executed.
    pub steps: u64,
    /// Steps a full run would execute.
    pub planned_steps: u64,
    /// Whether the logger stopped the run.
    pub early_terminated: bool,
    /// Simulated time at the end of the run.
    pub final_time: f64,
}

/// Result of a single externally driven step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Steps taken since reset, including this one.
    pub time_step: u64,
    /// Simulated time after the step.
    pub time: f64,
    /// State of every population after the step, in simulator order.
    pub states: Vec<Array2<f64>>,
    /// Logger termination flag, or the planned duration was reached.
    pub done: bool,
}

/// Owns populations, interactions, controllers, the integrator and the
/// environment, and advances them together.
///
/// # Lifecycle
///
/// 1. Build with [`Simulator::new`] and the `add_*` methods, or
///    [`Simulator::from_config`].
/// 2. Either call [`Simulator::simulate`] for a batch run, or
///    [`Simulator::reset`] followed by repeated
///    [`Simulator::step_with_action`].
pub struct Simulator {
    populations: Vec<Population>,
    interactions: Vec<Box<dyn Interaction>>,
    controllers: Vec<(Box<dyn Controller>, SampleClock)>,
    integrator: Box<dyn Integrator>,
    environment: Box<dyn Environment>,
    logger: Option<Box<dyn Logger>>,
    renderer: Option<Box<dyn Renderer>>,
    duration: f64,
    step: u64,
    ready: bool,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("populations", &self.populations.len())
            .field("interactions", &self.interactions.len())
            .field("controllers", &self.controllers.len())
            .field("integrator", &self.integrator.name())
            .field("environment", &self.environment.name())
            .field("duration", &self.duration)
            .field("step", &self.step)
            .finish()
    }
}

impl Simulator {
    /// Creates an empty simulator running for `duration` time units.
    pub fn new(integrator: Box<dyn Integrator>, duration: f64) -> Self {
        Self {
            populations: Vec::new(),
            interactions: Vec::new(),
            controllers: Vec::new(),
            integrator,
            environment: Box::new(EmptyEnvironment::default()),
            logger: None,
            renderer: None,
            duration,
            step: 0,
            ready: false,
        }
    }

    /// Builds everything described by `config`.
    ///
    /// Populations, interactions and the integrator without their own seed
    /// get one derived from the master seed, so a seeded configuration is
    /// fully reproducible.
    pub fn from_config(config: SimulationConfig) -> Result<Self, SimError> {
        let mut seeder = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let integrator = EulerMaruyama::new(config.integrator.dt, Some(seeder.gen()))?;
        let mut simulator = Simulator::new(Box::new(integrator), config.simulator.duration)
            .with_environment(config.environment.build());

        for mut population in config.populations {
            population.seed = population.seed.or_else(|| Some(seeder.gen()));
            simulator.add_population(Population::new(population)?)?;
        }
        for mut interaction in config.interactions {
            interaction.seed = interaction.seed.or_else(|| Some(seeder.gen()));
            let target = simulator.population_id(&interaction.target)?;
            let source = simulator.population_id(&interaction.source)?;
            simulator.add_interaction(interaction.build(target, source))?;
        }
        for controller in &config.controllers {
            let controller = controller.build(|name| simulator.population_id(name))?;
            simulator.add_controller(controller)?;
        }
        if let Some(logger) = &config.logger {
            let logger: Box<dyn Logger> = match logger {
                LoggerConfig::Shepherding { targets, threshold } => Box::new(ShepherdingLogger::new(
                    simulator.population_id(targets)?,
                    *threshold,
                )),
                LoggerConfig::Trajectory { every } => Box::new(TrajectoryLogger::new(*every)),
            };
            simulator = simulator.with_logger(logger);
        }

        info!(
            populations = simulator.populations.len(),
            interactions = simulator.interactions.len(),
            controllers = simulator.controllers.len(),
            dt = simulator.dt(),
            duration = simulator.duration,
            "simulator built"
        );
        Ok(simulator)
    }

    pub fn with_environment(mut self, environment: Box<dyn Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Adds a population; names must be unique.
    pub fn add_population(&mut self, population: Population) -> Result<PopulationId, ConfigError> {
        if self.populations.iter().any(|p| p.name() == population.name()) {
            return Err(ConfigError::DuplicatePopulation(population.name().to_string()));
        }
        self.populations.push(population);
        self.ready = false;
        Ok(self.populations.len() - 1)
    }

    /// Index of the population called `name`.
    pub fn population_id(&self, name: &str) -> Result<PopulationId, ConfigError> {
        self.populations
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| ConfigError::UnknownPopulation(name.to_string()))
    }

    fn check_id(&self, id: PopulationId) -> Result<(), SimError> {
        if id >= self.populations.len() {
            return Err(SimError::UnknownPopulation(id));
        }
        Ok(())
    }

    pub fn add_interaction(&mut self, interaction: Box<dyn Interaction>) -> Result<(), SimError> {
        self.check_id(interaction.target())?;
        self.check_id(interaction.source())?;
        self.interactions.push(interaction);
        self.ready = false;
        Ok(())
    }

    pub fn add_controller(&mut self, controller: Box<dyn Controller>) -> Result<(), SimError> {
        self.check_id(controller.population())?;
        let clock = SampleClock::new(controller.dt());
        self.controllers.push((controller, clock));
        self.ready = false;
        Ok(())
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn population(&self, id: PopulationId) -> Option<&Population> {
        self.populations.get(id)
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    pub fn dt(&self) -> f64 {
        self.integrator.dt()
    }

    /// Steps taken since the last reset.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> f64 {
        self.step as f64 * self.dt()
    }

    /// `floor(T / dt)`, tolerant to rounding in the division.
    pub fn planned_steps(&self) -> u64 {
        let ratio = self.duration / self.dt();
        if !(ratio > 0.0) {
            return 0;
        }
        (ratio + 1e-9).floor() as u64
    }

    /// Starts a new episode: every component returns to its initial state.
    pub fn reset(&mut self) -> Result<(), SimError> {
        for population in &mut self.populations {
            population.reset()?;
        }
        for interaction in &mut self.interactions {
            let target = &self.populations[interaction.target()];
            interaction.reset(target)?;
        }
        for (_, clock) in &mut self.controllers {
            clock.reset();
        }
        self.environment.reset();
        if let Some(logger) = self.logger.as_mut() {
            logger.reset();
        }
        self.step = 0;
        self.ready = true;
        debug!(populations = self.populations.len(), "simulator reset");
        Ok(())
    }

    /// Sum of every interaction's force on each population, in interaction
    /// order. Reads only the current states.
    pub fn interaction_forces(&self) -> Result<Vec<Array2<f64>>, SimError> {
        let mut forces: Vec<Array2<f64>> = self
            .populations
            .iter()
            .map(|p| Array2::zeros((p.n(), p.input_dim())))
            .collect();
        for interaction in &self.interactions {
            let target = &self.populations[interaction.target()];
            let source = &self.populations[interaction.source()];
            let force = interaction.compute(target, source)?;
            if force.dim() != forces[interaction.target()].dim() {
                return Err(SimError::ShapeMismatch {
                    population: target.name().to_string(),
                    what: "interaction force",
                    expected: forces[interaction.target()].dim(),
                    found: force.dim(),
                });
            }
            forces[interaction.target()] += &force;
        }
        Ok(forces)
    }

    /// Runs one step; `action` overrides the input of one population after
    /// the controllers. Returns the logger's termination flag.
    fn advance(&mut self, action: Option<(PopulationId, Array2<f64>)>) -> Result<bool, SimError> {
        let dt = self.dt();
        let time = self.time();
        let view = SimulationView {
            step: self.step,
            time,
            populations: &self.populations,
            environment: self.environment.as_ref(),
        };
        let done = match self.logger.as_mut() {
            Some(logger) => logger.log(&view),
            None => false,
        };
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&view);
        }

        for (controller, clock) in &mut self.controllers {
            if !clock.tick(time, dt) {
                continue;
            }
            let u = controller.action(&self.populations, self.environment.as_ref())?;
            let id = controller.population();
            self.populations
                .get_mut(id)
                .ok_or(SimError::UnknownPopulation(id))?
                .set_input(u)?;
        }
        if let Some((id, u)) = action {
            self.populations
                .get_mut(id)
                .ok_or(SimError::UnknownPopulation(id))?
                .set_input(u)?;
        }

        let forces = self.interaction_forces()?;
        for (population, force) in self.populations.iter_mut().zip(&forces) {
            population.add_force(force)?;
        }

        self.integrator.step(&mut self.populations)?;

        for population in &mut self.populations {
            population.clear_force();
        }
        self.environment.update();
        self.step += 1;
        Ok(done)
    }

    /// Runs a full episode of `floor(T / dt)` steps, stopping early when
    /// the logger asks to.
    pub fn simulate(&mut self) -> Result<SimulationOutcome, SimError> {
        self.reset()?;
        let planned_steps = self.planned_steps();
        info!(steps = planned_steps, dt = self.dt(), "simulation started");

        let mut early_terminated = false;
        while self.step < planned_steps {
            if self.advance(None)? {
                early_terminated = true;
                info!(step = self.step, time = self.time(), "simulation terminated early");
                break;
            }
        }

        let final_time = self.time();
        if let Some(logger) = self.logger.as_mut() {
            let view = SimulationView {
                step: self.step,
                time: final_time,
                populations: &self.populations,
                environment: self.environment.as_ref(),
            };
            logger.close(&view);
        }
        info!(steps = self.step, time = final_time, early_terminated, "simulation finished");

        Ok(SimulationOutcome {
            steps: self.step,
            planned_steps,
            early_terminated,
            final_time,
        })
    }

    /// Advances one step with `action` as the input of `population`.
    ///
    /// Controllers still run; the action is applied after them.
    pub fn step_with_action(
        &mut self,
        population: PopulationId,
        action: Array2<f64>,
    ) -> Result<StepResult, SimError> {
        if !self.ready {
            return Err(SimError::NotReset("simulator".to_string()));
        }
        self.check_id(population)?;
        let terminated = self.advance(Some((population, action)))?;
        Ok(StepResult {
            time_step: self.step,
            time: self.time(),
            states: self.populations.iter().map(|p| p.state().clone()).collect(),
            done: terminated || self.step >= self.planned_steps(),
        })
    }
}
