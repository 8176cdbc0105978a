//! Run configuration, threaded explicitly through the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchematizeError};
use crate::orientation::DirectionSet;

/// How the allowed edge orientations are specified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directions {
    /// `n` orientations, i.e. the `2n` directions `i·π/n`.
    Count(usize),
    /// Explicit directions in radians.
    Angles(Vec<f64>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub directions: Directions,
    /// Maximum edge length before classification, as a fraction of the
    /// bounding box diagonal.
    pub lambda: f64,
    /// Fraction of an aligned-deviating edge kept as its final straight step.
    pub staircase_epsilon: f64,
    /// Number of area-preserving edge-move pairs performed while simplifying.
    pub max_edge_moves: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directions: Directions::Count(2),
            lambda: 0.1,
            staircase_epsilon: 0.1,
            max_edge_moves: 0,
        }
    }
}

impl Config {
    /// Parse a JSON configuration object; missing fields take defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(bytes)
            .map_err(|e| SchematizeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lambda > 0.0) {
            return Err(SchematizeError::Config(format!("lambda must be positive, got {}", self.lambda)));
        }
        if !(self.staircase_epsilon > 0.0 && self.staircase_epsilon < 1.0) {
            return Err(SchematizeError::Config(format!(
                "staircase_epsilon must lie in (0, 1), got {}", self.staircase_epsilon
            )));
        }
        self.direction_set().map(|_| ())
    }

    pub fn direction_set(&self) -> Result<DirectionSet> {
        match &self.directions {
            Directions::Count(n) => DirectionSet::regular(*n),
            Directions::Angles(angles) => DirectionSet::new(angles.clone()),
        }
    }
}
