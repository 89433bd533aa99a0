//! Row selection applied by callers after derivation.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::record::DerivedRecord;

/// Date range and geography selection. Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub countries: Vec<String>,
}

impl Filter {
    pub fn matches(&self, record: &DerivedRecord) -> bool {
        if self.start.is_some_and(|start| record.date < start) {
            return false;
        }
        if self.end.is_some_and(|end| record.date > end) {
            return false;
        }
        if !self.regions.is_empty() && !self.regions.contains(&record.region) {
            return false;
        }
        if !self.countries.is_empty() && !self.countries.contains(&record.country) {
            return false;
        }
        true
    }

    /// Returns the matching rows, preserving order.
    pub fn apply(&self, records: &[DerivedRecord]) -> Vec<DerivedRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Earliest and latest date in `records`.
pub fn date_bounds(records: &[DerivedRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let min = records.iter().map(|r| r.date).min()?;
    let max = records.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// Sorted distinct regions.
pub fn regions(records: &[DerivedRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.region.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct countries, limited to `regions` when it is non-empty.
pub fn countries(records: &[DerivedRecord], regions: &[String]) -> Vec<String> {
    records
        .iter()
        .filter(|r| regions.is_empty() || regions.contains(&r.region))
        .map(|r| r.country.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
