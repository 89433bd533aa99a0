//! Turns raw cumulative series into the enriched table every view reads.
//!
//! Steps, in order: sentinel repair of country/region, calendar fields,
//! stable sort by `(country, date)`, per-country first differences clamped
//! at zero, weekly re-aggregation for daily sources, and the mortality rate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::record::{DerivedRecord, Granularity, OTHER_REGION, RawRecord, UNKNOWN_COUNTRY};

/// Output of [`derive`]: the derived rows plus how long the transform took.
///
/// Only `records` is deterministic; `elapsed` is informational.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub granularity: Granularity,
    pub records: Vec<DerivedRecord>,
    pub elapsed: Duration,
}

impl Derivation {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Derives deltas, calendar fields and mortality from `records`.
///
/// The returned rows are sorted by `(country, date)` and there is exactly
/// one per input row. Empty input produces an empty table.
#[tracing::instrument(skip(records), fields(rows = records.len(), granularity = %granularity))]
pub fn derive(records: &[RawRecord], granularity: Granularity) -> Derivation {
    let start = Instant::now();

    let mut rows: Vec<DerivedRecord> = records.iter().map(normalize).collect();
    rows.sort_by(|a, b| a.country.cmp(&b.country).then(a.date.cmp(&b.date)));

    let clamped = fill_deltas(&mut rows);

    match granularity {
        Granularity::Daily => fill_weekly_from_daily(&mut rows),
        Granularity::Weekly => {
            for row in &mut rows {
                row.new_weekly_cases = Some(row.new_cases);
                row.new_weekly_deaths = Some(row.new_deaths);
            }
        }
    }

    let elapsed = start.elapsed();
    debug!(
        clamped,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Series derived"
    );

    Derivation {
        granularity,
        records: rows,
        elapsed,
    }
}

/// Mortality as a percentage of cases, rounded to two decimals with ties
/// going to the even digit.
///
/// Zero cases, or any non-finite quotient, gives `0.0`.
pub fn mortality_rate(cases: u64, deaths: u64) -> f64 {
    if cases == 0 {
        return 0.0;
    }
    let rate = deaths as f64 / cases as f64 * 100.0;
    if !rate.is_finite() {
        return 0.0;
    }
    (rate * 100.0).round_ties_even() / 100.0
}

/// ISO week-year and week number identifying the weekly bucket of `date`.
pub fn week_id(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

fn normalize(raw: &RawRecord) -> DerivedRecord {
    DerivedRecord {
        date: raw.date,
        country_code: raw.country_code.clone(),
        country: raw
            .country
            .clone()
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
        region: raw
            .region
            .clone()
            .unwrap_or_else(|| OTHER_REGION.to_string()),
        cumulative_cases: raw.cumulative_cases,
        cumulative_deaths: raw.cumulative_deaths,
        year: raw.date.year(),
        month_label: raw.date.format("%b %Y").to_string(),
        week_of_year: raw.date.iso_week().week(),
        new_cases: 0,
        new_deaths: 0,
        new_weekly_cases: None,
        new_weekly_deaths: None,
        mortality_rate: mortality_rate(raw.cumulative_cases, raw.cumulative_deaths),
    }
}

/// Fills `new_cases`/`new_deaths` with the per-country first difference.
///
/// Rows must already be sorted by `(country, date)`. The first row of each
/// country gets 0 and downward corrections are clamped to 0. Returns how
/// many deltas were clamped.
fn fill_deltas(rows: &mut [DerivedRecord]) -> usize {
    let mut clamped = 0;
    let mut prev: Option<(String, u64, u64)> = None;

    for row in rows.iter_mut() {
        match &prev {
            Some((country, cases, deaths)) if *country == row.country => {
                if row.cumulative_cases < *cases {
                    clamped += 1;
                }
                if row.cumulative_deaths < *deaths {
                    clamped += 1;
                }
                row.new_cases = row.cumulative_cases.saturating_sub(*cases);
                row.new_deaths = row.cumulative_deaths.saturating_sub(*deaths);
            }
            _ => {
                row.new_cases = 0;
                row.new_deaths = 0;
            }
        }
        prev = Some((row.country.clone(), row.cumulative_cases, row.cumulative_deaths));
    }

    clamped
}

/// Sums daily deltas per `(country, ISO week)` and stores the totals on the
/// chronologically last row of each bucket. Other rows keep `None`.
fn fill_weekly_from_daily(rows: &mut [DerivedRecord]) {
    // bucket -> (index of representative row, cases, deaths)
    let mut buckets: HashMap<(&str, (i32, u32)), (usize, u64, u64)> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let entry = buckets
            .entry((row.country.as_str(), week_id(row.date)))
            .or_insert((idx, 0, 0));
        entry.0 = idx;
        entry.1 += row.new_cases;
        entry.2 += row.new_deaths;
    }

    let totals: Vec<(usize, u64, u64)> = buckets.into_values().collect();
    for (idx, cases, deaths) in totals {
        rows[idx].new_weekly_cases = Some(cases);
        rows[idx].new_weekly_deaths = Some(deaths);
    }
}
