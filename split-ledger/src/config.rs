//! Configuration for the ledger

use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Double-entry enforcement
    pub double_entry: DoubleEntryConfig,

    /// Query defaults
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// What a commit does about a non-zero imbalance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoubleEntryPolicy {
    /// Leave the residual visible through `imbalance()`
    None,
    /// Create or resize a split in the imbalance account
    #[default]
    AutoBalance,
    /// Route orphaned splits to a lost-and-found account (reserved, not enforced)
    RouteOrphans,
}

impl DoubleEntryPolicy {
    /// Legacy numeric code
    pub fn code(&self) -> u8 {
        match self {
            DoubleEntryPolicy::None => 0,
            DoubleEntryPolicy::AutoBalance => 1,
            DoubleEntryPolicy::RouteOrphans => 2,
        }
    }
}

impl TryFrom<u8> for DoubleEntryPolicy {
    type Error = crate::Error;

    fn try_from(code: u8) -> crate::Result<Self> {
        match code {
            0 => Ok(DoubleEntryPolicy::None),
            1 => Ok(DoubleEntryPolicy::AutoBalance),
            2 => Ok(DoubleEntryPolicy::RouteOrphans),
            other => Err(crate::Error::Config(format!(
                "Unknown double-entry policy: {}",
                other
            ))),
        }
    }
}

/// Double-entry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleEntryConfig {
    /// Enforcement policy applied at commit
    pub policy: DoubleEntryPolicy,

    /// Name prefix of balancing accounts ("Imbalance-USD")
    pub imbalance_prefix: String,

    /// Name prefix of accounts receiving account-less splits ("Orphan-USD")
    pub orphan_prefix: String,
}

impl Default for DoubleEntryConfig {
    fn default() -> Self {
        Self {
            policy: DoubleEntryPolicy::AutoBalance,
            imbalance_prefix: "Imbalance".to_string(),
            orphan_prefix: "Orphan".to_string(),
        }
    }
}

/// Which splits survive when a query result exceeds its cap. Survivors are
/// chosen by posted date and keep their place in the sorted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Keep the latest-dated splits
    #[default]
    KeepLatest,
    /// Keep the earliest-dated splits
    KeepEarliest,
}

/// Query defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Result cap for new queries, `None` for unlimited
    pub default_max_results: Option<usize>,

    /// Truncation applied when the cap is exceeded
    pub truncation: Truncation,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_results: None,
            truncation: Truncation::KeepLatest,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(policy) = std::env::var("LEDGER_DOUBLE_ENTRY_POLICY") {
            let code: u8 = policy
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid policy {:?}: {}", policy, e)))?;
            config.double_entry.policy = DoubleEntryPolicy::try_from(code)?;
        }

        if let Ok(prefix) = std::env::var("LEDGER_IMBALANCE_PREFIX") {
            config.double_entry.imbalance_prefix = prefix;
        }

        if let Ok(max) = std::env::var("LEDGER_QUERY_MAX_RESULTS") {
            let max: usize = max
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid max results {:?}: {}", max, e)))?;
            config.query.default_max_results = Some(max);
        }

        if let Ok(filter) = std::env::var("LEDGER_LOG_FILTER") {
            config.logging.filter = filter;
        }

        Ok(config)
    }
}
