use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning configuration into simulation objects.
///
/// All of these are fatal at construction time; nothing is partially
/// initialized.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required parameter '{name}' for {owner}")]
    MissingParameter { owner: String, name: String },

    #[error("Malformed shape for '{name}': expected {expected}, got {found}")]
    ShapeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Invalid {sampler} sampler: {reason}")]
    InvalidSampler {
        sampler: &'static str,
        reason: String,
    },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type '{extension}' for {path} (expected .csv or .json)")]
    UnsupportedFile { path: PathBuf, extension: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unknown population '{0}'")]
    UnknownPopulation(String),

    #[error("Duplicate population name '{0}'")]
    DuplicatePopulation(String),
}

/// Errors raised while stepping a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Population '{0}' was used before reset()")]
    NotReset(String),

    #[error("Shape mismatch for {what} of population '{population}': expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        population: String,
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Population index {0} out of range")]
    UnknownPopulation(usize),

    #[error("Timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_display() {
        let e = ConfigError::MissingParameter {
            owner: "herders".to_string(),
            name: "damping".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Missing required parameter 'damping' for herders"
        );
    }

    #[test]
    fn config_error_converts_into_sim_error() {
        let e: SimError = ConfigError::UnknownPopulation("sheep".to_string()).into();
        assert_eq!(e.to_string(), "Unknown population 'sheep'");
    }

    #[test]
    fn not_reset_display() {
        let e = SimError::NotReset("targets".to_string());
        assert!(e.to_string().contains("before reset()"));
    }
}
