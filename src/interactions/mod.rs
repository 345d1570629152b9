//! Pairwise force laws between populations.
//!
//! Every law follows the same skeleton: offsets `x_target[i] − x_source[j]`
//! over the positional dimensions, distances floored at `1e-6`, a scalar
//! kernel per pair, and the force on target agent `i` as the
//! kernel-weighted sum of offsets.
//! A positive kernel pushes the target away from the source.

pub mod harmonic;
pub mod lennard_jones;
pub mod power_law;
pub mod power_law_repulsion;

use std::fmt;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, SimError};
use crate::params::{ParamShape, ParameterSpec, Parameters};
use crate::population::Population;
use crate::spatial::{pairwise, MIN_DISTANCE};
use crate::{Id, PopulationId};

pub use harmonic::HarmonicRepulsion;
pub use lennard_jones::LennardJones;
pub use power_law::{PowerLawInteraction, PowerLawShape};
pub use power_law_repulsion::PowerLawRepulsion;

/// Upper cap on power-law kernel values.
pub const MAX_KERNEL: f64 = 1000.0;

/// A force law from a source population onto a target population.
///
/// Implementations read both populations and return the target's force
/// contribution; they never write into a population.
pub trait Interaction: fmt::Debug + Send + Sync {
    /// Returns a human-readable name for this interaction.
    fn name(&self) -> &str;

    /// Population receiving the force.
    fn target(&self) -> PopulationId;

    /// Population exerting the force. May equal [`Interaction::target`].
    fn source(&self) -> PopulationId;

    /// Draws the per-target-agent parameters.
    fn reset(&mut self, target: &Population) -> Result<(), ConfigError>;

    /// Force on every target agent, shape `N_target × input_dim`.
    fn compute(&self, target: &Population, source: &Population) -> Result<Array2<f64>, SimError>;
}

/// Scalar pair kernel of a [`PairwiseInteraction`].
pub trait Kernel: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Per-target parameters the kernel reads.
    fn parameter_shapes(&self) -> Vec<(&'static str, ParamShape)>;

    /// Weight applied to the offset `x_target[i] − x_source[j]` at
    /// (floored) `distance`.
    fn coefficient(&self, params: &Parameters, i: usize, distance: f64) -> f64;
}

/// Dense `N × M` interaction driven by a [`Kernel`].
#[derive(Debug)]
pub struct PairwiseInteraction<K: Kernel> {
    name: Id,
    target: PopulationId,
    source: PopulationId,
    spatial_dims: usize,
    exclude_self: bool,
    spec: ParameterSpec,
    params: Parameters,
    kernel: K,
    rng: StdRng,
    ready: bool,
}

impl<K: Kernel> PairwiseInteraction<K> {
    pub fn new(kernel: K, target: PopulationId, source: PopulationId, spec: ParameterSpec) -> Self {
        Self {
            name: kernel.name().to_string(),
            target,
            source,
            spatial_dims: 2,
            exclude_self: false,
            spec,
            params: Parameters::new(),
            kernel,
            rng: StdRng::from_entropy(),
            ready: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of leading state columns treated as position.
    pub fn with_spatial_dims(mut self, dims: usize) -> Self {
        self.spatial_dims = dims;
        self
    }

    /// Skips the `i == j` pair when target and source coincide.
    pub fn with_exclude_self(mut self, exclude: bool) -> Self {
        self.exclude_self = exclude;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }
}

impl<K: Kernel> Interaction for PairwiseInteraction<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> PopulationId {
        self.target
    }

    fn source(&self) -> PopulationId {
        self.source
    }

    fn reset(&mut self, target: &Population) -> Result<(), ConfigError> {
        let shapes = self.kernel.parameter_shapes();
        self.params = self.spec.resolve(&self.name, &shapes, target.n(), &mut self.rng)?;
        self.ready = true;
        debug!(interaction = %self.name, law = self.kernel.name(), n = target.n(), "interaction reset");
        Ok(())
    }

    fn compute(&self, target: &Population, source: &Population) -> Result<Array2<f64>, SimError> {
        if !self.ready {
            return Err(SimError::NotReset(self.name.clone()));
        }
        let dims = self
            .spatial_dims
            .min(target.state_dim())
            .min(source.state_dim())
            .min(target.input_dim());
        let geometry = pairwise(target.positions(dims), source.positions(dims));
        let same = self.target == self.source;

        let mut force = Array2::<f64>::zeros((target.n(), target.input_dim()));
        for ((i, j), &d) in geometry.distances.indexed_iter() {
            if same && self.exclude_self && i == j {
                continue;
            }
            let c = self.kernel.coefficient(&self.params, i, d.max(MIN_DISTANCE));
            if c == 0.0 {
                continue;
            }
            for k in 0..dims {
                force[[i, k]] += c * geometry.offsets[[i, j, k]];
            }
        }
        Ok(force)
    }
}

fn default_spatial_dims() -> usize {
    2
}

fn attractive() -> bool {
    true
}

/// Kernel selection, keyed by `law`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum InteractionLaw {
    HarmonicRepulsion,
    PowerLawRepulsion {
        p: f64,
    },
    PowerLawInteraction {
        p_rep: f64,
        p_attr: f64,
        #[serde(default = "attractive")]
        is_attractive: bool,
        #[serde(default)]
        use_cutoff: bool,
    },
    LennardJones,
}

/// Configuration of one interaction.
///
/// ```toml
/// [[interactions]]
/// law = "harmonic_repulsion"
/// target = "targets"
/// source = "herders"
/// parameters = { mode = "generate", generate = { strength = 1.0, cutoff = 10.0 } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractionConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Name of the population receiving the force.
    pub target: String,
    /// Name of the population exerting the force.
    pub source: String,
    #[serde(default = "default_spatial_dims")]
    pub spatial_dims: usize,
    #[serde(default)]
    pub exclude_self: bool,
    pub parameters: ParameterSpec,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub law: InteractionLaw,
}

impl InteractionConfig {
    /// Instantiates the interaction between resolved population indices.
    pub fn build(&self, target: PopulationId, source: PopulationId) -> Box<dyn Interaction> {
        match self.law {
            InteractionLaw::HarmonicRepulsion => self.finish(HarmonicRepulsion, target, source),
            InteractionLaw::PowerLawRepulsion { p } => {
                self.finish(PowerLawRepulsion::new(p), target, source)
            }
            InteractionLaw::PowerLawInteraction {
                p_rep,
                p_attr,
                is_attractive,
                use_cutoff,
            } => self.finish(
                PowerLawInteraction::new(
                    PowerLawShape {
                        p_rep,
                        p_attr,
                        is_attractive,
                    },
                    use_cutoff,
                ),
                target,
                source,
            ),
            InteractionLaw::LennardJones => self.finish(LennardJones, target, source),
        }
    }

    fn finish<K: Kernel + 'static>(
        &self,
        kernel: K,
        target: PopulationId,
        source: PopulationId,
    ) -> Box<dyn Interaction> {
        let mut interaction = PairwiseInteraction::new(kernel, target, source, self.parameters.clone())
            .with_spatial_dims(self.spatial_dims)
            .with_exclude_self(self.exclude_self);
        if let Some(name) = &self.name {
            interaction = interaction.with_name(name.clone());
        }
        if let Some(seed) = self.seed {
            interaction = interaction.with_seed(seed);
        }
        Box::new(interaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{ModelConfig, PopulationConfig};

    fn population(name: &str, states: Vec<Vec<f64>>) -> Population {
        let mut pop =
            Population::new(PopulationConfig::explicit(name, states, ModelConfig::Fixed)).unwrap();
        pop.reset().unwrap();
        pop
    }

    fn harmonic(target: usize, source: usize) -> PairwiseInteraction<HarmonicRepulsion> {
        PairwiseInteraction::new(
            HarmonicRepulsion,
            target,
            source,
            ParameterSpec::constants([("strength", 1.0), ("cutoff", 10.0)]),
        )
    }

    #[test]
    fn harmonic_pushes_apart() {
        let pop = population("pair", vec![vec![0.0, 0.0], vec![5.0, 0.0]]);
        let mut interaction = harmonic(0, 0);
        interaction.reset(&pop).unwrap();
        let force = interaction.compute(&pop, &pop).unwrap();
        assert!((force[[0, 0]] + 5.0).abs() < 1e-9);
        assert!((force[[1, 0]] - 5.0).abs() < 1e-9);
        assert_eq!(force[[0, 1]], 0.0);
    }

    #[test]
    fn out_of_range_sources_contribute_nothing() {
        let target = population("t", vec![vec![0.0, 0.0]]);
        let source = population("s", vec![vec![30.0, 0.0], vec![0.0, -10.0]]);
        let mut interaction = harmonic(0, 1);
        interaction.reset(&target).unwrap();
        let force = interaction.compute(&target, &source).unwrap();
        assert_eq!(force, Array2::<f64>::zeros((1, 2)));
    }

    #[test]
    fn self_pair_is_capped_or_excluded() {
        let pop = population("single", vec![vec![1.0, 1.0]]);
        let mut interaction = PairwiseInteraction::new(
            PowerLawRepulsion::new(2.0),
            0,
            0,
            ParameterSpec::constants([("strength", 1.0), ("cutoff", 5.0)]),
        );
        interaction.reset(&pop).unwrap();
        // Zero offset times a capped kernel is still zero.
        assert_eq!(interaction.compute(&pop, &pop).unwrap(), Array2::<f64>::zeros((1, 2)));

        let mut excluded = interaction.with_exclude_self(true);
        excluded.reset(&pop).unwrap();
        assert_eq!(excluded.compute(&pop, &pop).unwrap(), Array2::<f64>::zeros((1, 2)));
    }

    #[test]
    fn compute_before_reset_fails() {
        let pop = population("pair", vec![vec![0.0, 0.0], vec![5.0, 0.0]]);
        let interaction = harmonic(0, 0);
        assert!(matches!(
            interaction.compute(&pop, &pop),
            Err(SimError::NotReset(_))
        ));
    }

    #[test]
    fn missing_parameter_is_a_config_error() {
        let pop = population("pair", vec![vec![0.0, 0.0]]);
        let mut interaction = PairwiseInteraction::new(
            LennardJones,
            0,
            0,
            ParameterSpec::constants([("epsilon", 1.0)]),
        );
        assert!(matches!(
            interaction.reset(&pop),
            Err(ConfigError::MissingParameter { .. })
        ));
    }

    #[test]
    fn force_only_fills_spatial_columns() {
        let mut config = PopulationConfig::explicit(
            "inertial",
            vec![vec![0.0, 0.0, 9.0, 9.0], vec![2.0, 0.0, -9.0, -9.0]],
            ModelConfig::Fixed,
        );
        config.input_dim = Some(4);
        let mut pop = Population::new(config).unwrap();
        pop.reset().unwrap();
        let mut interaction = harmonic(0, 0);
        interaction.reset(&pop).unwrap();
        let force = interaction.compute(&pop, &pop).unwrap();
        assert_eq!(force.dim(), (2, 4));
        assert!(force[[0, 0]] < 0.0);
        assert_eq!(force[[0, 2]], 0.0);
        assert_eq!(force[[1, 3]], 0.0);
    }

    #[test]
    fn config_parses_flattened_law() {
        let config: InteractionConfig = toml::from_str(
            r#"
            law = "power_law_interaction"
            target = "a"
            source = "b"
            p_rep = 4.0
            p_attr = 2.0
            use_cutoff = true
            parameters = { mode = "generate", generate = { strength_rep = 1.0, strength_attr = 0.5, cutoff = 3.0 } }
            "#,
        )
        .unwrap();
        assert_eq!(config.spatial_dims, 2);
        assert!(!config.exclude_self);
        assert_eq!(
            config.law,
            InteractionLaw::PowerLawInteraction {
                p_rep: 4.0,
                p_attr: 2.0,
                is_attractive: true,
                use_cutoff: true,
            }
        );
        let interaction = config.build(0, 1);
        assert_eq!(interaction.name(), "PowerLawInteraction");
        assert_eq!(interaction.source(), 1);
    }
}
