use std::path::Path;

use anyhow::{Context, Result};
use docmodel::{ExportOptions, ParseConfig, SchemaPolicy, Strategy};
use serde::{Deserialize, Serialize};

/// Defaults read from `--config FILE`; command-line flags win over these
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parse: ParseConfig,
    pub export: ExportOptions,
    pub schema: SchemaPolicy,
    pub sample: SampleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    pub strategy: Strategy,
    pub max_items: usize,
    /// Fixed seed for reproducible selections
    pub seed: Option<u64>,
    /// Hard budget on the exported size of the selection
    pub max_bytes: Option<usize>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Diverse,
            max_items: 20,
            seed: None,
            max_bytes: None,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in config file {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}
