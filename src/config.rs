//! Run configuration, loadable from a TOML file.
//!
//! Every field has a default, so a config file only needs to state what
//! it overrides. Strategy sub-tables are independent; only the one for
//! the strategy being run matters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::StrikeSelectorConfig;
use crate::backtest::EngineConfig;
use crate::risk::PositionSizerConfig;
use crate::strategy::{CoveredCallConfig, IronCondorConfig, PutSellingConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub engine: EngineConfig,
    pub selector: StrikeSelectorConfig,
    pub sizer: PositionSizerConfig,
    pub put_selling: PutSellingConfig,
    pub iron_condor: IronCondorConfig,
    pub covered_call: CoveredCallConfig,
}

impl BacktestConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.engine.risk_free_rate, 0.02);
        assert_eq!(config.put_selling.ma_period, 20);
        assert_eq!(config.iron_condor.loss_stop, 2.0);
        assert_eq!(config.covered_call.call_delta, 0.30);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: BacktestConfig = toml::from_str(
            r#"
            [engine]
            risk_free_rate = 0.05

            [put_selling]
            put_delta = 0.20
            risk_fraction = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.risk_free_rate, 0.05);
        assert_eq!(config.put_selling.put_delta, 0.20);
        assert_eq!(config.put_selling.risk_fraction, 0.25);
        // Untouched sections keep defaults.
        assert_eq!(config.put_selling.ma_period, 20);
        assert_eq!(config.iron_condor.put_width, 0.10);
    }

    #[test]
    fn test_missing_file() {
        let err = BacktestConfig::from_file("/nonexistent/backtest.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
