use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::derive::mortality_rate;
use crate::record::{DerivedRecord, Granularity};
use crate::views::types::{CountrySummary, Headline, Metric, MetricView, RegionSummary};

/// Key figures for the latest date in `records`, compared with the date
/// before it. Returns `None` for an empty table.
pub fn headline(
    records: &[DerivedRecord],
    view: MetricView,
    granularity: Granularity,
) -> Option<Headline> {
    let latest_date = records.iter().map(|r| r.date).max()?;
    let previous_date = records
        .iter()
        .map(|r| r.date)
        .filter(|d| *d < latest_date)
        .max();

    let latest: Vec<&DerivedRecord> = records.iter().filter(|r| r.date == latest_date).collect();
    let (total_cases, total_deaths) = cumulative_totals(&latest);

    let (previous_cases, previous_deaths) = match previous_date {
        Some(date) => {
            let previous: Vec<&DerivedRecord> =
                records.iter().filter(|r| r.date == date).collect();
            cumulative_totals(&previous)
        }
        None => (total_cases, total_deaths),
    };

    let case_change = total_cases as i64 - previous_cases as i64;
    let death_change = total_deaths as i64 - previous_deaths as i64;

    let (cases_metric, deaths_metric) = view.new_metrics(granularity);

    let affected_countries = records
        .iter()
        .map(|r| r.country.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    Some(Headline {
        latest_date,
        previous_date,
        affected_countries,
        total_cases,
        total_deaths,
        case_change,
        death_change,
        case_change_percent: change_percent(case_change, previous_cases),
        death_change_percent: change_percent(death_change, previous_deaths),
        new_cases: sum_metric(&latest, cases_metric),
        new_deaths: sum_metric(&latest, deaths_metric),
        mortality_rate: mortality_rate(total_cases, total_deaths),
    })
}

/// The most recent row of each country, sorted by country.
pub fn latest_by_country(records: &[DerivedRecord]) -> Vec<DerivedRecord> {
    let mut latest: HashMap<&str, &DerivedRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.country.as_str())
            .and_modify(|current| {
                if record.date >= current.date {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let mut rows: Vec<DerivedRecord> = latest.into_values().cloned().collect();
    rows.sort_by(|a, b| a.country.cmp(&b.country));
    rows
}

/// The `n` countries with the highest `metric` on their latest row.
/// Rows where the metric is missing sort last.
pub fn top_countries(records: &[DerivedRecord], metric: Metric, n: usize) -> Vec<DerivedRecord> {
    let mut rows = latest_by_country(records);
    rows.sort_by(|a, b| descending(metric.value(a), metric.value(b)));
    rows.truncate(n);
    rows
}

/// Region totals on the latest date, largest cumulative case count first.
pub fn region_summary(records: &[DerivedRecord]) -> Vec<RegionSummary> {
    let Some(latest_date) = records.iter().map(|r| r.date).max() else {
        return Vec::new();
    };

    let mut groups: HashMap<&str, Vec<&DerivedRecord>> = HashMap::new();
    for record in records.iter().filter(|r| r.date == latest_date) {
        groups.entry(record.region.as_str()).or_default().push(record);
    }

    let mut summaries: Vec<RegionSummary> = groups
        .into_iter()
        .map(|(region, rows)| {
            let (cumulative_cases, cumulative_deaths) = cumulative_totals(&rows);
            RegionSummary {
                region: region.to_string(),
                countries: rows
                    .iter()
                    .map(|r| r.country.as_str())
                    .collect::<BTreeSet<_>>()
                    .len(),
                cumulative_cases,
                cumulative_deaths,
                new_cases: sum_metric(&rows, Metric::NewDailyCases),
                new_deaths: sum_metric(&rows, Metric::NewDailyDeaths),
                new_weekly_cases: sum_metric(&rows, Metric::NewWeeklyCases),
                new_weekly_deaths: sum_metric(&rows, Metric::NewWeeklyDeaths),
                mortality_rate: mortality_rate(cumulative_cases, cumulative_deaths),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.cumulative_cases
            .cmp(&a.cumulative_cases)
            .then_with(|| a.region.cmp(&b.region))
    });
    summaries
}

/// Per-country totals over the whole table: peak cumulative counts, summed
/// deltas and the highest mortality rate seen. Largest case count first.
pub fn country_summary(records: &[DerivedRecord]) -> Vec<CountrySummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, CountrySummary> = HashMap::new();

    for record in records {
        let summary = groups.entry(record.country.as_str()).or_insert_with(|| {
            order.push(record.country.as_str());
            CountrySummary {
                country: record.country.clone(),
                region: record.region.clone(),
                cumulative_cases: 0,
                cumulative_deaths: 0,
                new_cases: 0,
                new_deaths: 0,
                new_weekly_cases: 0,
                new_weekly_deaths: 0,
                mortality_rate: 0.0,
            }
        });

        summary.cumulative_cases = summary.cumulative_cases.max(record.cumulative_cases);
        summary.cumulative_deaths = summary.cumulative_deaths.max(record.cumulative_deaths);
        summary.new_cases += record.new_cases;
        summary.new_deaths += record.new_deaths;
        summary.new_weekly_cases += record.new_weekly_cases.unwrap_or(0);
        summary.new_weekly_deaths += record.new_weekly_deaths.unwrap_or(0);
        summary.mortality_rate = summary.mortality_rate.max(record.mortality_rate);
    }

    let mut summaries: Vec<CountrySummary> = order
        .into_iter()
        .filter_map(|country| groups.remove(country))
        .collect();
    summaries.sort_by(|a, b| {
        b.cumulative_cases
            .cmp(&a.cumulative_cases)
            .then_with(|| a.country.cmp(&b.country))
    });
    summaries
}

fn cumulative_totals(rows: &[&DerivedRecord]) -> (u64, u64) {
    rows.iter().fold((0, 0), |(cases, deaths), r| {
        (cases + r.cumulative_cases, deaths + r.cumulative_deaths)
    })
}

/// Sums a counter metric over `rows`, skipping missing values.
fn sum_metric(rows: &[&DerivedRecord], metric: Metric) -> u64 {
    rows.iter().filter_map(|r| metric.count(r)).sum()
}

fn change_percent(change: i64, previous: u64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        change as f64 / previous as f64 * 100.0
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive;
    use crate::record::RawRecord;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, d).unwrap()
    }

    fn raw(country: &str, region: &str, d: u32, cases: u64, deaths: u64) -> RawRecord {
        RawRecord {
            date: day(d),
            country: Some(country.to_string()),
            country_code: None,
            region: Some(region.to_string()),
            cumulative_cases: cases,
            cumulative_deaths: deaths,
        }
    }

    // 2020-06-01 is a Monday, so days 1..=7 share one ISO week.
    fn table() -> Vec<DerivedRecord> {
        let raw = vec![
            raw("France", "EURO", 1, 100, 10),
            raw("France", "EURO", 2, 150, 12),
            raw("Spain", "EURO", 1, 50, 1),
            raw("Spain", "EURO", 2, 80, 2),
            raw("Kenya", "AFRO", 1, 20, 0),
            raw("Kenya", "AFRO", 2, 30, 1),
        ];
        derive(&raw, Granularity::Daily).records
    }

    #[test]
    fn test_headline() {
        let h = headline(&table(), MetricView::DailyNew, Granularity::Daily).unwrap();

        assert_eq!(h.latest_date, day(2));
        assert_eq!(h.previous_date, Some(day(1)));
        assert_eq!(h.affected_countries, 3);
        assert_eq!(h.total_cases, 260);
        assert_eq!(h.total_deaths, 15);
        assert_eq!(h.case_change, 90);
        assert_eq!(h.death_change, 4);
        assert!((h.case_change_percent - 90.0 / 170.0 * 100.0).abs() < 1e-9);
        assert_eq!(h.new_cases, 90);
        assert_eq!(h.new_deaths, 4);
        assert_eq!(h.mortality_rate, 5.77);
    }

    #[test]
    fn test_headline_weekly_new_on_daily_source() {
        let h = headline(&table(), MetricView::WeeklyNew, Granularity::Daily).unwrap();
        // Day 2 closes the week for every country in this table.
        assert_eq!(h.new_cases, 90);
    }

    #[test]
    fn test_headline_single_date_has_no_change() {
        let one_day: Vec<DerivedRecord> =
            table().into_iter().filter(|r| r.date == day(1)).collect();
        let h = headline(&one_day, MetricView::Cumulative, Granularity::Daily).unwrap();

        assert_eq!(h.previous_date, None);
        assert_eq!(h.case_change, 0);
        assert_eq!(h.case_change_percent, 0.0);
    }

    #[test]
    fn test_headline_empty() {
        assert!(headline(&[], MetricView::Cumulative, Granularity::Weekly).is_none());
    }

    #[test]
    fn test_latest_by_country() {
        let latest = latest_by_country(&table());
        let names: Vec<&str> = latest.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(names, vec!["France", "Kenya", "Spain"]);
        assert!(latest.iter().all(|r| r.date == day(2)));
    }

    #[test]
    fn test_top_countries() {
        let top = top_countries(&table(), Metric::CumulativeCases, 2);
        let names: Vec<&str> = top.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(names, vec!["France", "Spain"]);

        let by_new = top_countries(&table(), Metric::NewDailyCases, 1);
        assert_eq!(by_new[0].country, "France");
    }

    #[test]
    fn test_region_summary() {
        let summary = region_summary(&table());

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].region, "EURO");
        assert_eq!(summary[0].countries, 2);
        assert_eq!(summary[0].cumulative_cases, 230);
        assert_eq!(summary[0].cumulative_deaths, 14);
        assert_eq!(summary[0].new_cases, 80);
        assert_eq!(summary[0].mortality_rate, 6.09);
        assert_eq!(summary[1].region, "AFRO");
    }

    #[test]
    fn test_country_summary() {
        let summary = country_summary(&table());

        assert_eq!(summary[0].country, "France");
        assert_eq!(summary[0].region, "EURO");
        assert_eq!(summary[0].cumulative_cases, 150);
        assert_eq!(summary[0].new_cases, 50);
        assert_eq!(summary[0].new_weekly_cases, 50);
        assert_eq!(summary[0].mortality_rate, 10.0);
        assert_eq!(summary.len(), 3);
    }

    #[test]
    fn test_region_summary_sums_large_counters_exactly() {
        let big = (1u64 << 53) + 1;
        let raw = vec![
            raw("A", "EURO", 1, 0, 0),
            raw("A", "EURO", 2, big, 1),
            raw("B", "EURO", 1, 0, 0),
            raw("B", "EURO", 2, big, 1),
        ];
        let table = derive(&raw, Granularity::Daily).records;
        let summary = region_summary(&table);

        assert_eq!(summary[0].new_cases, 2 * big);
        assert_eq!(summary[0].new_weekly_cases, 2 * big);
        assert_eq!(summary[0].cumulative_cases, 2 * big);
    }
}
