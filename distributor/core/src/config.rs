// Copyright (c) 2024 The Botho Foundation

//! Distributor configuration types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    coefficients::{CoefficientsV1, MigrationParams},
    error::DistributorError,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] DistributorError),
}

/// Main distributor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Coefficients installed when a distributor is deployed
    #[serde(default)]
    pub genesis: CoefficientsV1,

    /// Burn splits installed by the V2 migration
    #[serde(default)]
    pub migration: MigrationParams,

    /// Operator tool settings
    #[serde(default)]
    pub cli: CliSettings,
}

/// Operator tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    /// Where the runtime state is persisted between invocations
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("distributor-state.json")
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

impl DistributorConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn validate(&self) -> Result<(), DistributorError> {
        self.genesis.validate()?;
        self.migration.validate()
    }
}

impl std::str::FromStr for DistributorConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: DistributorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
