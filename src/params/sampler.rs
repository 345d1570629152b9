//! Named random distributions for per-agent parameters.

use rand::Rng;
use rand_distr::{Beta, Distribution, Exp, Gamma, LogNormal, Normal, Triangular, Weibull};
use serde::Deserialize;

use crate::error::ConfigError;

/// A closed set of distributions a parameter can be drawn from.
///
/// Selected in configuration by the `sampler` key, e.g.
/// `{ sampler = "normal", mean = 1.0, std_dev = 0.1 }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "sampler", rename_all = "snake_case")]
pub enum Sampler {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mean: f64, std_dev: f64 },
    Exponential { lambda: f64 },
    /// Shape `k`, scale `theta`.
    Gamma { k: f64, theta: f64 },
    Beta { alpha: f64, beta: f64 },
    /// Scale `lambda`, shape `k`.
    Weibull { lambda: f64, k: f64 },
    Triangular { min: f64, max: f64, mode: f64 },
}

fn draw<D, R>(dist: D, rng: &mut R, n: usize) -> Vec<f64>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    (0..n).map(|_| dist.sample(rng)).collect()
}

fn invalid(sampler: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidSampler {
        sampler,
        reason: reason.to_string(),
    }
}

impl Sampler {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Sampler::Uniform { .. } => "uniform",
            Sampler::Normal { .. } => "normal",
            Sampler::LogNormal { .. } => "log_normal",
            Sampler::Exponential { .. } => "exponential",
            Sampler::Gamma { .. } => "gamma",
            Sampler::Beta { .. } => "beta",
            Sampler::Weibull { .. } => "weibull",
            Sampler::Triangular { .. } => "triangular",
        }
    }

    /// Draws `n` independent values.
    ///
    /// Distribution arguments are validated here, so a bad configuration is
    /// reported before any agent is created.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<f64>, ConfigError> {
        let name = self.name();
        let values = match *self {
            Sampler::Uniform { low, high } => {
                if !(low <= high) {
                    return Err(invalid(name, format!("low ({}) > high ({})", low, high)));
                }
                if low == high {
                    vec![low; n]
                } else {
                    (0..n).map(|_| rng.gen_range(low..high)).collect()
                }
            }
            Sampler::Normal { mean, std_dev } => {
                draw(Normal::new(mean, std_dev).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::LogNormal { mean, std_dev } => {
                draw(LogNormal::new(mean, std_dev).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::Exponential { lambda } => {
                draw(Exp::new(lambda).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::Gamma { k, theta } => {
                draw(Gamma::new(k, theta).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::Beta { alpha, beta } => {
                draw(Beta::new(alpha, beta).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::Weibull { lambda, k } => {
                draw(Weibull::new(lambda, k).map_err(|e| invalid(name, e))?, rng, n)
            }
            Sampler::Triangular { min, max, mode } => {
                draw(Triangular::new(min, max, mode).map_err(|e| invalid(name, e))?, rng, n)
            }
        };
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = Sampler::Uniform { low: 2.0, high: 3.0 }
            .sample_n(&mut rng, 200)
            .unwrap();
        assert_eq!(values.len(), 200);
        assert!(values.iter().all(|v| (2.0..3.0).contains(v)));
    }

    #[test]
    fn degenerate_uniform_is_constant() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = Sampler::Uniform { low: 1.5, high: 1.5 }
            .sample_n(&mut rng, 3)
            .unwrap();
        assert_eq!(values, vec![1.5; 3]);
    }

    #[test]
    fn inverted_uniform_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = Sampler::Uniform { low: 3.0, high: 1.0 }
            .sample_n(&mut rng, 3)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampler { sampler: "uniform", .. }));
    }

    #[test]
    fn negative_std_dev_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = Sampler::Normal {
            mean: 0.0,
            std_dev: -1.0,
        }
        .sample_n(&mut rng, 3)
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampler { sampler: "normal", .. }));
    }

    #[test]
    fn same_seed_same_draws() {
        let sampler = Sampler::Gamma { k: 2.0, theta: 0.5 };
        let a = sampler.sample_n(&mut StdRng::seed_from_u64(3), 10).unwrap();
        let b = sampler.sample_n(&mut StdRng::seed_from_u64(3), 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn deserializes_from_tagged_map() {
        let s: Sampler =
            serde_json::from_str(r#"{"sampler": "normal", "mean": 1.0, "std_dev": 0.1}"#).unwrap();
        assert_eq!(
            s,
            Sampler::Normal {
                mean: 1.0,
                std_dev: 0.1
            }
        );
    }
}
