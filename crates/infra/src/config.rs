//! Ledger configuration, read from the environment.

use core::str::FromStr;

use thiserror::Error;

/// Environment variable selecting the [`BalanceMode`].
pub const BALANCE_MODE_VAR: &str = "STOCKBOOK_BALANCE_MODE";
/// Environment variable bounding optimistic-concurrency retries.
pub const MAX_CONFLICT_RETRIES_VAR: &str = "STOCKBOOK_MAX_CONFLICT_RETRIES";

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// How the ledger derives a product balance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BalanceMode {
    /// Rescan the full movement stream on every read and write.
    #[default]
    Recompute,
    /// Keep a per-product running total, trusted only while its version
    /// matches the stream version.
    RunningTotal,
}

impl FromStr for BalanceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recompute" => Ok(BalanceMode::Recompute),
            "running-total" | "running_total" => Ok(BalanceMode::RunningTotal),
            _ => Err(ConfigError::Invalid {
                var: BALANCE_MODE_VAR,
                value: s.to_string(),
                reason: "expected one of: recompute, running-total".to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings of a [`crate::ledger::StockLedger`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub balance_mode: BalanceMode,
    /// Reload-and-retry attempts after a concurrent append to the same product.
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_mode: BalanceMode::default(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl LedgerConfig {
    /// Load from process environment; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match lookup(BALANCE_MODE_VAR) {
            Some(raw) => config.balance_mode = raw.parse()?,
            None => tracing::debug!("{BALANCE_MODE_VAR} not set; using {:?}", config.balance_mode),
        }

        if let Some(raw) = lookup(MAX_CONFLICT_RETRIES_VAR) {
            config.max_conflict_retries =
                raw.trim().parse().map_err(|e: core::num::ParseIntError| ConfigError::Invalid {
                    var: MAX_CONFLICT_RETRIES_VAR,
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }
}
