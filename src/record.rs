//! Row types flowing through the derivation pipeline.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::SeriesError;

/// Region assigned to rows whose `WHO_region` is empty.
pub const OTHER_REGION: &str = "OTHER";

/// Country assigned to rows whose `Country` is empty.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Native time resolution of a raw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Granularity {
    /// One row per country per day; weekly deltas are re-aggregated.
    Daily,
    /// One row per country per week; weekly deltas are the first difference.
    Weekly,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "daily"),
            Granularity::Weekly => write!(f, "weekly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "fine" => Ok(Granularity::Daily),
            "weekly" | "coarse" => Ok(Granularity::Weekly),
            other => Err(SeriesError::Config {
                name: "granularity".into(),
                value: other.into(),
                reason: "expected `daily` or `weekly`".into(),
            }),
        }
    }
}

/// One validated input row. Country and region may still be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub cumulative_cases: u64,
    pub cumulative_deaths: u64,
}

/// One output row: the raw counters plus calendar fields, deltas and the
/// mortality rate. `country` and `region` are never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    #[serde(rename = "Date_reported")]
    pub date: NaiveDate,
    #[serde(rename = "Country_code")]
    pub country_code: Option<String>,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "WHO_region")]
    pub region: String,
    #[serde(rename = "Cumulative_cases")]
    pub cumulative_cases: u64,
    #[serde(rename = "Cumulative_deaths")]
    pub cumulative_deaths: u64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month_label: String,
    #[serde(rename = "Week")]
    pub week_of_year: u32,
    #[serde(rename = "New_daily_cases")]
    pub new_cases: u64,
    #[serde(rename = "New_daily_deaths")]
    pub new_deaths: u64,
    #[serde(rename = "New_weekly_cases")]
    pub new_weekly_cases: Option<u64>,
    #[serde(rename = "New_weekly_deaths")]
    pub new_weekly_deaths: Option<u64>,
    #[serde(rename = "Mortality_rate")]
    pub mortality_rate: f64,
}

impl DerivedRecord {
    /// True when this row carries its week's aggregated deltas.
    pub fn is_week_representative(&self) -> bool {
        self.new_weekly_cases.is_some()
    }
}
