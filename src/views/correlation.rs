use crate::record::{DerivedRecord, Granularity};
use crate::views::types::{CorrelationMatrix, Metric};
use crate::views::utility::pearson;

/// Metrics compared by [`correlation`] for a table of `granularity`.
pub fn correlation_metrics(granularity: Granularity) -> Vec<Metric> {
    let mut metrics = vec![
        Metric::CumulativeCases,
        Metric::CumulativeDeaths,
        Metric::NewWeeklyCases,
        Metric::NewWeeklyDeaths,
        Metric::MortalityRate,
    ];
    if granularity == Granularity::Daily {
        metrics.push(Metric::NewDailyCases);
        metrics.push(Metric::NewDailyDeaths);
    }
    metrics
}

/// Pairwise Pearson correlation over rows where every metric is present.
///
/// Returns `None` when fewer than two complete rows remain. Metrics with no
/// variance correlate as 0 with everything, themselves included.
pub fn correlation(records: &[DerivedRecord], granularity: Granularity) -> Option<CorrelationMatrix> {
    let metrics = correlation_metrics(granularity);

    let rows: Vec<Vec<f64>> = records
        .iter()
        .filter_map(|r| metrics.iter().map(|m| m.value(r)).collect::<Option<Vec<f64>>>())
        .collect();
    if rows.len() < 2 {
        return None;
    }

    let columns: Vec<Vec<f64>> = (0..metrics.len())
        .map(|i| rows.iter().map(|row| row[i]).collect())
        .collect();

    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();

    Some(CorrelationMatrix {
        metrics: metrics.iter().map(|m| m.column().to_string()).collect(),
        rows_used: rows.len(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive;
    use crate::record::RawRecord;
    use chrono::NaiveDate;

    fn weekly_table() -> Vec<DerivedRecord> {
        let raw: Vec<RawRecord> = [(1, 100, 1), (8, 300, 4), (15, 600, 9), (22, 1000, 16)]
            .iter()
            .map(|(d, cases, deaths)| RawRecord {
                date: NaiveDate::from_ymd_opt(2020, 6, *d).unwrap(),
                country: Some("A".into()),
                country_code: None,
                region: None,
                cumulative_cases: *cases,
                cumulative_deaths: *deaths,
            })
            .collect();
        derive(&raw, Granularity::Weekly).records
    }

    #[test]
    fn test_correlation_matrix_shape() {
        let m = correlation(&weekly_table(), Granularity::Weekly).unwrap();

        assert_eq!(m.metrics.len(), 5);
        assert_eq!(m.rows_used, 4);
        assert_eq!(m.values.len(), 5);
        assert!(m.values.iter().all(|row| row.len() == 5));

        let self_corr = m
            .get(Metric::CumulativeCases, Metric::CumulativeCases)
            .unwrap();
        assert!((self_corr - 1.0).abs() < 1e-12);

        let cases_deaths = m
            .get(Metric::CumulativeCases, Metric::CumulativeDeaths)
            .unwrap();
        assert!(cases_deaths > 0.9);
    }

    #[test]
    fn test_daily_metrics_absent_for_weekly() {
        let m = correlation(&weekly_table(), Granularity::Weekly).unwrap();
        assert!(m.get(Metric::NewDailyCases, Metric::MortalityRate).is_none());
    }

    #[test]
    fn test_too_few_rows() {
        let table = weekly_table();
        assert!(correlation(&table[..1], Granularity::Weekly).is_none());
        assert!(correlation(&[], Granularity::Daily).is_none());
    }
}
