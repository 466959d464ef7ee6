//! Error types for metrosim

use std::path::PathBuf;
use thiserror::Error;

/// Result type for metrosim operations
pub type Result<T> = std::result::Result<T, MetroError>;

/// Core error type for metrosim operations
#[derive(Error, Debug)]
pub enum MetroError {
    /// Transition table failed validation at load time
    #[error("Malformed transition table '{source_name}': {reason}")]
    MalformedTable { source_name: String, reason: String },

    /// Station is not part of the table's state space
    #[error("Unknown station '{station}' ({context})")]
    UnknownStation { station: String, context: String },

    /// A trajectory needs at least one step (the start station)
    #[error("Invalid step count {0}: at least 1 step is required")]
    InvalidStepCount(usize),

    /// Crime category / policy combination outside the six known scenarios
    #[error("Unknown scenario: category '{category}', policy '{policy}'")]
    UnknownScenario { category: String, policy: String },

    /// Damping left a row with no probability mass to renormalize.
    /// `step` is the trajectory position being sampled (0 outside a walk).
    #[error("Degenerate distribution at station '{station}' (step {step}): row sum underflowed to zero")]
    DegenerateDistribution { station: String, step: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetroError {
    /// Create a malformed-table error
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown-station error
    pub fn unknown_station(station: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownStation {
            station: station.into(),
            context: context.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
