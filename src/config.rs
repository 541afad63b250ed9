//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Parameters of a simulation run.
///
/// ```
/// use qsim::SimulationConfig;
///
/// let config = SimulationConfig::from_json(r#"{"seed": 42, "end_time": 1000.0}"#).unwrap();
/// assert_eq!(config.seed, 42);
/// assert_eq!(config.end_time, Some(1000.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the simulation-wide random number generator.
    pub seed: u64,
    /// Time at which the simulation stops. `None` runs until there are no pending requests.
    pub end_time: Option<f64>,
}

impl SimulationConfig {
    /// Parses a config from a JSON document. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the effective end time of the run.
    pub fn end_time(&self) -> f64 {
        self.end_time.unwrap_or(f64::INFINITY)
    }
}
