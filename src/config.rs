//! Configuration of the sampling engines, the independence tests and the random network
//! generator. Every configuration has sensible defaults and can be loaded from JSON, where
//! missing fields take their default value.

use crate::util::{CtbnError, Result};

use serde::{Deserialize, Serialize};


/// Parameters of a forward sampling run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {

    /// The length of every sampled trajectory
    pub time_horizon: f64,

    /// The number of transitions discarded before recording
    pub burn_in: usize,

    /// The base seed of the random source. Drawn from entropy when absent.
    pub seed: Option<u64>,

    /// The size of the worker pool of parallel inference. Rayon decides when absent.
    pub workers: Option<usize>

}


impl Default for SamplingConfig {

    fn default() -> Self {
        SamplingConfig { time_horizon: 5000.0, burn_in: 100, seed: None, workers: None }
    }

}


impl SamplingConfig {

    /// # Errors
    /// * `CtbnError::InvalidArgument` for a non-positive horizon or an empty worker pool
    pub fn validate(&self) -> Result<()> {
        if ! (self.time_horizon.is_finite() && self.time_horizon > 0.0) {
            return Err(CtbnError::InvalidArgument(format!("invalid time horizon {}", self.time_horizon)));
        }

        if self.workers == Some(0) {
            return Err(CtbnError::InvalidArgument(String::from("at least one worker is needed")));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SamplingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

}


/// Parameters of the independence tests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {

    /// The significance level
    pub alpha: f64

}


impl Default for TestConfig {

    fn default() -> Self {
        TestConfig { alpha: 0.05 }
    }

}


impl TestConfig {

    /// # Errors
    /// * `CtbnError::InvalidArgument` unless ```0 < alpha < 1```
    pub fn validate(&self) -> Result<()> {
        if self.alpha > 0.0 && self.alpha < 1.0 {
            Ok(())
        } else {
            Err(CtbnError::InvalidArgument(format!("significance level {} outside (0, 1)", self.alpha)))
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: TestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

}


/// Parameters of the random network generator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {

    /// The number of variables
    pub variables: usize,

    /// The maximum number of parents of a variable
    pub max_parents: usize,

    /// The number of states of every variable
    pub modalities: usize,

    /// The range of the transition rates
    pub rate_range: (f64, f64)

}


impl Default for GeneratorConfig {

    fn default() -> Self {
        GeneratorConfig { variables: 4, max_parents: 2, modalities: 2, rate_range: (1.0, 100.0) }
    }

}


impl GeneratorConfig {

    pub fn validate(&self) -> Result<()> {
        if self.modalities < 2 {
            return Err(CtbnError::InvalidArgument(String::from("a variable needs at least two states")));
        }

        let (low, high) = self.rate_range;
        if ! (low >= 0.0 && low < high && high.is_finite()) {
            return Err(CtbnError::InvalidArgument(format!("invalid rate range [{}, {})", low, high)));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

}
