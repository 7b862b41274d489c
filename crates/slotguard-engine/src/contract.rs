//! Contract descriptions loaded from JSON.
//!
//! ```json
//! { "kind": "threshold", "required": 3, "admins": 5 }
//! { "kind": "arithmetic", "guard": "non_strict", "balance": "0" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checker::CheckError;
use crate::config::{ConfigError, EngineOptions};
use crate::domains::{ArithmeticConfig, ArithmeticModel, GuardKind, ThresholdConfig, ThresholdModel};
use crate::report::CheckCase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractSpec {
    Threshold(ThresholdConfig),
    Arithmetic(ArithmeticConfig),
}

impl ContractSpec {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build every check this contract carries.
    pub fn cases(&self, options: &EngineOptions) -> Result<Vec<CheckCase>, CheckError> {
        let cases = match self {
            ContractSpec::Threshold(cfg) => ThresholdModel::new(cfg.clone(), options.depth)?.cases()?,
            ContractSpec::Arithmetic(cfg) => ArithmeticModel::new(cfg.clone())?.cases()?,
        };
        Ok(cases)
    }
}

/// The built-in contracts: the multi-signature gate and the withdrawal
/// under both guard readings.
pub fn demo_contracts() -> Vec<ContractSpec> {
    vec![
        ContractSpec::Threshold(ThresholdConfig::default()),
        ContractSpec::Arithmetic(ArithmeticConfig::default()),
        ContractSpec::Arithmetic(ArithmeticConfig::default().with_guard(GuardKind::NonStrict)),
    ]
}
