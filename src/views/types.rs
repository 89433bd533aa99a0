//! Data types produced by the dashboard views.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use crate::record::{DerivedRecord, Granularity};

/// A numeric column of the derived table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    CumulativeCases,
    CumulativeDeaths,
    NewDailyCases,
    NewDailyDeaths,
    NewWeeklyCases,
    NewWeeklyDeaths,
    MortalityRate,
}

impl Metric {
    /// Column name used in CSV output.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::CumulativeCases => "Cumulative_cases",
            Metric::CumulativeDeaths => "Cumulative_deaths",
            Metric::NewDailyCases => "New_daily_cases",
            Metric::NewDailyDeaths => "New_daily_deaths",
            Metric::NewWeeklyCases => "New_weekly_cases",
            Metric::NewWeeklyDeaths => "New_weekly_deaths",
            Metric::MortalityRate => "Mortality_rate",
        }
    }

    /// Value of this metric on `record`. Weekly deltas are `None` on rows
    /// that do not close their week.
    pub fn value(&self, record: &DerivedRecord) -> Option<f64> {
        match self {
            Metric::CumulativeCases => Some(record.cumulative_cases as f64),
            Metric::CumulativeDeaths => Some(record.cumulative_deaths as f64),
            Metric::NewDailyCases => Some(record.new_cases as f64),
            Metric::NewDailyDeaths => Some(record.new_deaths as f64),
            Metric::NewWeeklyCases => record.new_weekly_cases.map(|v| v as f64),
            Metric::NewWeeklyDeaths => record.new_weekly_deaths.map(|v| v as f64),
            Metric::MortalityRate => Some(record.mortality_rate),
        }
    }

    /// Integer value of a counter metric. `None` for the mortality rate and
    /// for weekly deltas missing on `record`.
    pub fn count(&self, record: &DerivedRecord) -> Option<u64> {
        match self {
            Metric::CumulativeCases => Some(record.cumulative_cases),
            Metric::CumulativeDeaths => Some(record.cumulative_deaths),
            Metric::NewDailyCases => Some(record.new_cases),
            Metric::NewDailyDeaths => Some(record.new_deaths),
            Metric::NewWeeklyCases => record.new_weekly_cases,
            Metric::NewWeeklyDeaths => record.new_weekly_deaths,
            Metric::MortalityRate => None,
        }
    }
}

/// Which case/death pair a view displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricView {
    Cumulative,
    DailyNew,
    WeeklyNew,
}

impl MetricView {
    /// The `(cases, deaths)` metrics for this view. Daily figures only exist
    /// for daily sources; weekly tables fall back to weekly deltas.
    pub fn metrics(&self, granularity: Granularity) -> (Metric, Metric) {
        match (self, granularity) {
            (MetricView::Cumulative, _) => (Metric::CumulativeCases, Metric::CumulativeDeaths),
            (MetricView::DailyNew, Granularity::Daily) => {
                (Metric::NewDailyCases, Metric::NewDailyDeaths)
            }
            _ => (Metric::NewWeeklyCases, Metric::NewWeeklyDeaths),
        }
    }

    /// The `(cases, deaths)` delta metrics used for "new" headline figures.
    /// Cumulative views report weekly deltas.
    pub fn new_metrics(&self, granularity: Granularity) -> (Metric, Metric) {
        match self {
            MetricView::Cumulative => MetricView::WeeklyNew.metrics(granularity),
            _ => self.metrics(granularity),
        }
    }
}

/// Key figures at the latest reported date of a filtered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub latest_date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
    pub affected_countries: usize,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub case_change: i64,
    pub death_change: i64,
    pub case_change_percent: f64,
    pub death_change_percent: f64,
    pub new_cases: u64,
    pub new_deaths: u64,
    pub mortality_rate: f64,
}

/// Sums across countries for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub cumulative_cases: u64,
    pub cumulative_deaths: u64,
    pub new_cases: u64,
    pub new_deaths: u64,
    pub new_weekly_cases: u64,
    pub new_weekly_deaths: u64,
}

/// Region totals at the latest date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    #[serde(rename = "WHO_region")]
    pub region: String,
    #[serde(rename = "Countries")]
    pub countries: usize,
    #[serde(rename = "Cumulative_cases")]
    pub cumulative_cases: u64,
    #[serde(rename = "Cumulative_deaths")]
    pub cumulative_deaths: u64,
    #[serde(rename = "New_daily_cases")]
    pub new_cases: u64,
    #[serde(rename = "New_daily_deaths")]
    pub new_deaths: u64,
    #[serde(rename = "New_weekly_cases")]
    pub new_weekly_cases: u64,
    #[serde(rename = "New_weekly_deaths")]
    pub new_weekly_deaths: u64,
    #[serde(rename = "Mortality_rate")]
    pub mortality_rate: f64,
}

/// Per-country totals over the whole filtered range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySummary {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "WHO_region")]
    pub region: String,
    #[serde(rename = "Cumulative_cases")]
    pub cumulative_cases: u64,
    #[serde(rename = "Cumulative_deaths")]
    pub cumulative_deaths: u64,
    #[serde(rename = "New_daily_cases")]
    pub new_cases: u64,
    #[serde(rename = "New_daily_deaths")]
    pub new_deaths: u64,
    #[serde(rename = "New_weekly_cases")]
    pub new_weekly_cases: u64,
    #[serde(rename = "New_weekly_deaths")]
    pub new_weekly_deaths: u64,
    #[serde(rename = "Mortality_rate")]
    pub mortality_rate: f64,
}

/// Square Pearson correlation matrix; `values[i][j]` correlates
/// `metrics[i]` with `metrics[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<String>,
    pub rows_used: usize,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.metrics.iter().position(|m| m == a.column())?;
        let j = self.metrics.iter().position(|m| m == b.column())?;
        Some(self.values[i][j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_view_on_weekly_source_falls_back() {
        assert_eq!(
            MetricView::DailyNew.metrics(Granularity::Weekly),
            (Metric::NewWeeklyCases, Metric::NewWeeklyDeaths)
        );
        assert_eq!(
            MetricView::DailyNew.metrics(Granularity::Daily),
            (Metric::NewDailyCases, Metric::NewDailyDeaths)
        );
    }

    #[test]
    fn test_cumulative_view_reports_weekly_new() {
        assert_eq!(
            MetricView::Cumulative.new_metrics(Granularity::Daily),
            (Metric::NewWeeklyCases, Metric::NewWeeklyDeaths)
        );
    }
}
