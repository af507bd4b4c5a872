//! TOML run configuration.
//!
//! ```toml
//! [engine]
//! starting_cash = 100000.0
//! mode = "target"
//! atr_len = 14
//!
//! [walk_forward]
//! selection_metric = "Sharpe_annualized"
//! window = { kind = "anchored", min_train_bars = 252, test_window_bars = 63 }
//!
//! [strategy]
//! name = "sma_cross"
//!
//! [grid]
//! fast = [5, 10]
//! slow = [30, 50]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use anchorlab_core::{EngineConfig, EngineError, ParamValue};

use crate::grid::ParamGrid;
use crate::walk_forward::WalkForwardConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which strategy the grid is applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub name: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "flat".to_string(),
        }
    }
}

/// Everything needed to reproduce a backtest or walk-forward run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub walk_forward: WalkForwardConfig,
    pub strategy: StrategyConfig,
    /// Parameter name → candidate values.
    pub grid: BTreeMap<String, Vec<ParamValue>>,
}

impl RunConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.walk_forward
            .window
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some((name, _)) = self.grid.iter().find(|(_, values)| values.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "grid axis '{name}' has no values"
            )));
        }
        if self.strategy.name.trim().is_empty() {
            return Err(ConfigError::Invalid("strategy name is empty".into()));
        }
        Ok(())
    }

    pub fn param_grid(&self) -> ParamGrid {
        ParamGrid::from_table(&self.grid)
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two configs with identical settings share a fingerprint regardless of
    /// key order in the source file.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
