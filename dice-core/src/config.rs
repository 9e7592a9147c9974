//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a [`RollPipeline`](crate::pipeline::RollPipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for alternate-face sampling. `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    /// Turn number of the first roll.
    pub starting_turn: u32,

    /// Samples drawn when looking for an alternate face before falling back.
    pub resample_attempts: u32,

    /// Prompt shown for keep-or-reroll decisions.
    pub destiny_prompt: String,

    /// Prompt shown for one-step adjustment decisions.
    pub nudge_prompt: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            starting_turn: 1,
            resample_attempts: 16,
            destiny_prompt: "Destiny stirs. Keep your roll or take another?".to_string(),
            nudge_prompt: "Fortune allows a small push. Adjust your roll?".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed seed so alternates are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_starting_turn(mut self, turn: u32) -> Self {
        self.starting_turn = turn;
        self
    }

    pub fn with_resample_attempts(mut self, attempts: u32) -> Self {
        self.resample_attempts = attempts;
        self
    }

    pub fn with_destiny_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.destiny_prompt = prompt.into();
        self
    }

    pub fn with_nudge_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.nudge_prompt = prompt.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_turn == 0 {
            return Err(ConfigError::Invalid("starting_turn must be at least 1".into()));
        }
        if self.resample_attempts == 0 {
            return Err(ConfigError::Invalid(
                "resample_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}
