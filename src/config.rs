//! Environment-driven settings.
//!
//! Values are read after `dotenvy::dotenv()` has populated the process
//! environment, so a `.env` file next to the binary works too:
//!
//! ```text
//! COVID_DAILY_SOURCE=data/WHO-COVID-19-global-daily-data.csv
//! COVID_WEEKLY_SOURCE=https://example.org/WHO-COVID-19-global-data.csv
//! COVID_CACHE_TTL_SECS=3600
//! ```

use std::time::Duration;

use crate::error::{Result, SeriesError};
use crate::record::Granularity;

pub const DEFAULT_DAILY_SOURCE: &str = "WHO-COVID-19-global-daily-data.csv";
pub const DEFAULT_WEEKLY_SOURCE: &str = "WHO-COVID-19-global-data.csv";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub daily_source: String,
    pub weekly_source: String,
    pub cache_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_source: DEFAULT_DAILY_SOURCE.to_string(),
            weekly_source: DEFAULT_WEEKLY_SOURCE.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Settings {
    /// Builds settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_ttl = match lookup("COVID_CACHE_TTL_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| SeriesError::Config {
                    name: "COVID_CACHE_TTL_SECS".into(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.cache_ttl,
        };

        Ok(Self {
            daily_source: lookup("COVID_DAILY_SOURCE").unwrap_or(defaults.daily_source),
            weekly_source: lookup("COVID_WEEKLY_SOURCE").unwrap_or(defaults.weekly_source),
            cache_ttl,
        })
    }

    /// Returns the configured source for `granularity`.
    pub fn source_for(&self, granularity: Granularity) -> &str {
        match granularity {
            Granularity::Daily => &self.daily_source,
            Granularity::Weekly => &self.weekly_source,
        }
    }
}
