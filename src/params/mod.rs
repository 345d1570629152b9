//! Per-agent named parameters.
//!
//! Parameters are fixed at `reset()` and never depend on the agent state.
//! Each one is stored as an `N × k` array together with its per-agent
//! [`ParamShape`], so scalars, vectors and square matrices share one layout.

pub mod sampler;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::config::files::{self, Column};
use crate::error::ConfigError;

pub use sampler::Sampler;

/// Shape of one agent's value of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Scalar,
    Vector(usize),
    /// Square `d × d` matrix.
    Matrix(usize),
}

impl ParamShape {
    /// Number of stored values per agent.
    pub fn len(&self) -> usize {
        match *self {
            ParamShape::Scalar => 1,
            ParamShape::Vector(d) => d,
            ParamShape::Matrix(d) => d * d,
        }
    }

    fn describe(&self) -> String {
        match *self {
            ParamShape::Scalar => "scalar".to_string(),
            ParamShape::Vector(d) => format!("[{}]", d),
            ParamShape::Matrix(d) => format!("[{}, {}]", d, d),
        }
    }
}

/// Values of one parameter for every agent of a population.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamArray {
    shape: ParamShape,
    data: Array2<f64>,
}

impl ParamArray {
    pub fn shape(&self) -> ParamShape {
        self.shape
    }

    pub fn n_agents(&self) -> usize {
        self.data.nrows()
    }

    /// Scalar value of agent `i` (first stored component for non-scalars).
    pub fn scalar(&self, i: usize) -> f64 {
        self.data[[i, 0]]
    }

    /// All agents' flattened values, shape `N × k`.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Flattened value of agent `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Value of agent `i` as a `d × d` matrix. Scalars become `1 × 1`.
    pub fn matrix(&self, i: usize) -> Array2<f64> {
        let d = match self.shape {
            ParamShape::Matrix(d) => d,
            ParamShape::Vector(_) | ParamShape::Scalar => 1,
        };
        Array2::from_shape_fn((d, d), |(a, b)| self.data[[i, a * d + b]])
    }

    /// Builds a parameter from raw per-agent values, reshaping to `shape`.
    ///
    /// A raw scalar broadcasts to a vector or becomes the diagonal of a
    /// matrix; non-scalars must already have the requested shape.
    fn from_raw(name: &str, raw: &Column, shape: ParamShape) -> Result<Self, ConfigError> {
        let n = raw.rows.len();
        let mismatch = || ConfigError::ShapeMismatch {
            name: name.to_string(),
            expected: shape.describe(),
            found: format!("{:?}", raw.shape),
        };

        if raw.shape.is_empty() {
            let data = match shape {
                ParamShape::Scalar => Array2::from_shape_fn((n, 1), |(i, _)| raw.rows[i][0]),
                ParamShape::Vector(d) => Array2::from_shape_fn((n, d), |(i, _)| raw.rows[i][0]),
                ParamShape::Matrix(d) => Array2::from_shape_fn((n, d * d), |(i, k)| {
                    if k / d == k % d {
                        raw.rows[i][0]
                    } else {
                        0.0
                    }
                }),
            };
            return Ok(Self { shape, data });
        }

        let matches = match shape {
            ParamShape::Scalar => false,
            ParamShape::Vector(d) => raw.shape == [d],
            ParamShape::Matrix(d) => raw.shape == [d, d],
        };
        if !matches {
            return Err(mismatch());
        }
        let data = Array2::from_shape_fn((n, shape.len()), |(i, k)| raw.rows[i][k]);
        Ok(Self { shape, data })
    }
}

/// Named parameters of a population or interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, ParamArray>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamArray> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamArray) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks up a parameter that `owner` cannot work without.
    pub fn require(&self, owner: &str, name: &str) -> Result<&ParamArray, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::MissingParameter {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Scalar of agent `i`, or `default` when the parameter is absent.
    pub fn scalar_or(&self, name: &str, i: usize, default: f64) -> f64 {
        self.get(name).map_or(default, |p| p.scalar(i))
    }
}

/// A constant parameter value, repeated for every agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

/// A parameter drawn from a named distribution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampledParam {
    #[serde(flatten)]
    pub sampler: Sampler,
    /// Per-agent shape of the drawn value (`[]` for a scalar).
    #[serde(default)]
    pub shape: Vec<usize>,
    /// Draw once and share the value across all agents.
    #[serde(default)]
    pub homogeneous: bool,
}

/// How one parameter is produced in `generate` mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamSource {
    Constant(ConstantValue),
    Sampled(SampledParam),
}

/// Where the parameters of a population (or interaction) come from.
///
/// ```toml
/// [populations.parameters]
/// mode = "generate"
/// [populations.parameters.generate]
/// damping = 0.5
/// D = { sampler = "uniform", low = 0.1, high = 0.2 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ParameterSpec {
    Generate {
        generate: BTreeMap<String, ParamSource>,
    },
    File {
        file_path: PathBuf,
    },
}

impl ParameterSpec {
    /// Generate-mode spec of scalar constants, mostly for programmatic setup.
    pub fn constants<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        ParameterSpec::Generate {
            generate: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), ParamSource::Constant(ConstantValue::Scalar(v))))
                .collect(),
        }
    }

    /// Produces the parameters listed in `shapes` for `n` agents.
    ///
    /// # Arguments
    ///
    /// * `owner` - Name used in error messages
    /// * `shapes` - Required parameter names with their per-agent shapes
    /// * `n` - Number of agents
    /// * `rng` - Generator used for sampling and for row repetition in file mode
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        owner: &str,
        shapes: &[(&str, ParamShape)],
        n: usize,
        rng: &mut R,
    ) -> Result<Parameters, ConfigError> {
        let raw = match self {
            ParameterSpec::Generate { generate } => generate
                .iter()
                .map(|(name, source)| generate_column(name, source, n, rng))
                .collect::<Result<Vec<_>, _>>()?,
            ParameterSpec::File { file_path } => {
                let mut columns = files::read_columns(file_path)?;
                check_file_rows(file_path, &columns)?;
                match_rows(&mut columns, n, rng);
                columns
            }
        };

        let mut params = Parameters::new();
        for (name, shape) in shapes {
            let column = raw.iter().find(|c| c.name == *name).ok_or_else(|| {
                ConfigError::MissingParameter {
                    owner: owner.to_string(),
                    name: name.to_string(),
                }
            })?;
            let value = ParamArray::from_raw(name, column, *shape)?;
            if value.n_agents() != n {
                return Err(ConfigError::ShapeMismatch {
                    name: name.to_string(),
                    expected: format!("{} rows", n),
                    found: format!("{} rows", value.n_agents()),
                });
            }
            params.insert(*name, value);
        }
        Ok(params)
    }
}

fn generate_column<R: Rng + ?Sized>(
    name: &str,
    source: &ParamSource,
    n: usize,
    rng: &mut R,
) -> Result<Column, ConfigError> {
    let (shape, rows) = match source {
        ParamSource::Constant(ConstantValue::Scalar(v)) => (Vec::new(), vec![vec![*v]; n]),
        ParamSource::Constant(ConstantValue::Vector(v)) => (vec![v.len()], vec![v.clone(); n]),
        ParamSource::Constant(ConstantValue::Matrix(m)) => {
            let cols = m.first().map_or(0, Vec::len);
            if m.iter().any(|r| r.len() != cols) {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    reason: "matrix rows have different lengths".to_string(),
                });
            }
            let flat: Vec<f64> = m.iter().flatten().copied().collect();
            (vec![m.len(), cols], vec![flat; n])
        }
        ParamSource::Sampled(p) => {
            let per_agent: usize = p.shape.iter().product();
            if p.homogeneous {
                let value = p.sampler.sample_n(rng, per_agent)?;
                (p.shape.clone(), vec![value; n])
            } else {
                let values = p.sampler.sample_n(rng, n * per_agent)?;
                let rows = if per_agent == 0 {
                    vec![Vec::new(); n]
                } else {
                    values.chunks(per_agent).map(<[f64]>::to_vec).collect()
                };
                (p.shape.clone(), rows)
            }
        }
    };
    Ok(Column {
        name: name.to_string(),
        shape,
        rows,
    })
}

/// A parameter file needs at least one data row, and every column the
/// same number of rows.
fn check_file_rows(path: &Path, columns: &[Column]) -> Result<(), ConfigError> {
    let rows = columns.first().map_or(0, |c| c.rows.len());
    if rows == 0 {
        return Err(ConfigError::Parse {
            path: path.to_path_buf(),
            reason: "parameter file has no data rows".to_string(),
        });
    }
    if let Some(ragged) = columns.iter().find(|c| c.rows.len() != rows) {
        return Err(ConfigError::ShapeMismatch {
            name: ragged.name.clone(),
            expected: format!("{} rows", rows),
            found: format!("{} rows", ragged.rows.len()),
        });
    }
    Ok(())
}

/// Adjusts file-loaded columns to exactly `n` rows.
///
/// Missing rows are filled by repeating randomly chosen existing rows,
/// surplus rows are dropped.
fn match_rows<R: Rng + ?Sized>(columns: &mut [Column], n: usize, rng: &mut R) {
    let available = columns.first().map_or(0, |c| c.rows.len());
    if available == n || available == 0 {
        return;
    }
    if available < n {
        warn!(
            available,
            n, "parameter file has fewer rows than agents; repeating rows"
        );
        let picks: Vec<usize> = (0..n - available)
            .map(|_| rng.gen_range(0..available))
            .collect();
        for column in columns.iter_mut() {
            let extra: Vec<Vec<f64>> = picks.iter().map(|&i| column.rows[i].clone()).collect();
            column.rows.extend(extra);
        }
    } else {
        warn!(
            available,
            n, "parameter file has more rows than agents; truncating"
        );
        for column in columns.iter_mut() {
            column.rows.truncate(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn constant_scalar_broadcasts_to_every_agent() {
        let spec = ParameterSpec::constants([("damping", 0.5)]);
        let params = spec
            .resolve("pop", &[("damping", ParamShape::Scalar)], 4, &mut rng())
            .unwrap();
        let damping = params.get("damping").unwrap();
        assert_eq!(damping.n_agents(), 4);
        assert!((0..4).all(|i| damping.scalar(i) == 0.5));
    }

    #[test]
    fn scalar_becomes_matrix_diagonal() {
        let spec = ParameterSpec::constants([("D", 2.0)]);
        let params = spec
            .resolve("pop", &[("D", ParamShape::Matrix(2))], 3, &mut rng())
            .unwrap();
        let m = params.get("D").unwrap().matrix(1);
        assert_eq!(m, ndarray::array![[2.0, 0.0], [0.0, 2.0]]);
    }

    #[test]
    fn scalar_broadcasts_to_vector() {
        let spec = ParameterSpec::constants([("mu", 1.5)]);
        let params = spec
            .resolve("pop", &[("mu", ParamShape::Vector(3))], 2, &mut rng())
            .unwrap();
        assert_eq!(params.get("mu").unwrap().row(1).to_vec(), vec![1.5; 3]);
    }

    #[test]
    fn wrong_vector_length_is_rejected() {
        let spec: ParameterSpec = serde_json::from_str(
            r#"{"mode": "generate", "generate": {"mu": [1.0, 2.0, 3.0]}}"#,
        )
        .unwrap();
        let err = spec
            .resolve("pop", &[("mu", ParamShape::Vector(2))], 2, &mut rng())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ShapeMismatch { .. }));
    }

    #[test]
    fn missing_parameter_is_reported() {
        let spec = ParameterSpec::constants([("strength", 1.0)]);
        let err = spec
            .resolve(
                "repulsion",
                &[("strength", ParamShape::Scalar), ("cutoff", ParamShape::Scalar)],
                2,
                &mut rng(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParameter {
                owner: "repulsion".to_string(),
                name: "cutoff".to_string()
            }
        );
    }

    #[test]
    fn homogeneous_sample_is_shared() {
        let spec: ParameterSpec = serde_json::from_str(
            r#"{"mode": "generate", "generate": {
                "k": {"sampler": "uniform", "low": 0.0, "high": 1.0, "homogeneous": true}
            }}"#,
        )
        .unwrap();
        let params = spec
            .resolve("pop", &[("k", ParamShape::Scalar)], 5, &mut rng())
            .unwrap();
        let k = params.get("k").unwrap();
        assert!((1..5).all(|i| k.scalar(i) == k.scalar(0)));
    }

    #[test]
    fn heterogeneous_vector_sample_has_shape() {
        let spec: ParameterSpec = serde_json::from_str(
            r#"{"mode": "generate", "generate": {
                "mu": {"sampler": "normal", "mean": 0.0, "std_dev": 1.0, "shape": [2]}
            }}"#,
        )
        .unwrap();
        let params = spec
            .resolve("pop", &[("mu", ParamShape::Vector(2))], 6, &mut rng())
            .unwrap();
        let mu = params.get("mu").unwrap();
        assert_eq!(mu.n_agents(), 6);
        assert_ne!(mu.row(0), mu.row(1));
    }

    #[test]
    fn file_rows_are_repeated_or_truncated() {
        let mut columns = vec![Column {
            name: "a".to_string(),
            shape: Vec::new(),
            rows: vec![vec![1.0], vec![2.0]],
        }];
        match_rows(&mut columns, 5, &mut rng());
        assert_eq!(columns[0].rows.len(), 5);
        assert!(columns[0].rows.iter().all(|r| r[0] == 1.0 || r[0] == 2.0));

        match_rows(&mut columns, 1, &mut rng());
        assert_eq!(columns[0].rows, vec![vec![1.0]]);
    }

    fn param_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("herdsim-{}-{}", crate::generate_id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const DAMPED: [(&str, ParamShape); 2] = [("damping", ParamShape::Scalar), ("D", ParamShape::Scalar)];

    #[test]
    fn header_only_file_is_rejected() {
        let spec = ParameterSpec::File {
            file_path: param_file("params.csv", "damping,D\n"),
        };
        let err = spec.resolve("pop", &DAMPED, 2, &mut rng()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn ragged_columns_are_rejected_in_either_order() {
        for contents in [
            r#"{"D": [0.1, 0.1], "damping": [0.5]}"#,
            r#"{"damping": [0.5, 0.5], "D": [0.1]}"#,
        ] {
            let spec = ParameterSpec::File {
                file_path: param_file("params.json", contents),
            };
            let err = spec.resolve("pop", &DAMPED, 2, &mut rng()).unwrap_err();
            assert!(matches!(err, ConfigError::ShapeMismatch { .. }), "{:?}", err);
        }
    }

    #[test]
    fn short_file_is_padded_to_agent_count() {
        let spec = ParameterSpec::File {
            file_path: param_file("params.csv", "damping,D\n0.5,0.1\n"),
        };
        let params = spec.resolve("pop", &DAMPED, 3, &mut rng()).unwrap();
        assert_eq!(params.get("damping").unwrap().n_agents(), 3);
        assert_eq!(params.get("D").unwrap().scalar(2), 0.1);
    }
}
