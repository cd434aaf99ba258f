//! Environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use labnorm_loader::{CatalogConfig, DEFAULT_TTL};
use thiserror::Error;

/// Directory of catalog exports used when `LABNORM_CATALOG_PATH` is unset.
pub const DEFAULT_CATALOG_PATH: &str = "./catalog";

/// Background refresh check interval used when `LABNORM_REFRESH_INTERVAL_SECS` is unset.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Errors raised while reading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something that is not a whole number of seconds,
    /// or to zero where a positive interval is required.
    #[error("Invalid value for {var}: '{value}' (expected seconds)")]
    InvalidSeconds {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the catalog exports.
    pub catalog_path: PathBuf,
    /// How long a loaded catalog stays fresh.
    pub catalog_ttl: Duration,
    /// How often the background refresher checks for staleness.
    pub refresh_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            catalog_ttl: DEFAULT_TTL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Reads `LABNORM_CATALOG_PATH`, `LABNORM_CATALOG_TTL_SECS` and
    /// `LABNORM_REFRESH_INTERVAL_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let catalog_path = lookup("LABNORM_CATALOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        Ok(Self {
            catalog_path,
            catalog_ttl: seconds(&lookup, "LABNORM_CATALOG_TTL_SECS")?.unwrap_or(defaults.catalog_ttl),
            refresh_interval: positive_seconds(&lookup, "LABNORM_REFRESH_INTERVAL_SECS")?
                .unwrap_or(defaults.refresh_interval),
        })
    }

    /// Returns the loader configuration.
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::default().with_ttl(self.catalog_ttl)
    }
}

fn seconds<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| ConfigError::InvalidSeconds { var, value }),
    }
}

fn positive_seconds<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match seconds(lookup, var)? {
        Some(d) if d.is_zero() => Err(ConfigError::InvalidSeconds {
            var,
            value: lookup(var).unwrap_or_default(),
        }),
        other => Ok(other),
    }
}
