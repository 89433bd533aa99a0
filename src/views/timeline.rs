use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{DerivedRecord, Granularity};
use crate::views::types::{MetricView, TimelinePoint};
use crate::views::utility::moving_average;

/// Moving average of the "new" figures shown alongside a timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
}

/// Per-date totals across all countries in `records`, oldest first.
/// Weekly deltas absent on a row count as zero.
pub fn timeline(records: &[DerivedRecord]) -> Vec<TimelinePoint> {
    let mut points: BTreeMap<NaiveDate, TimelinePoint> = BTreeMap::new();

    for r in records {
        let p = points.entry(r.date).or_insert_with(|| TimelinePoint {
            date: r.date,
            cumulative_cases: 0,
            cumulative_deaths: 0,
            new_cases: 0,
            new_deaths: 0,
            new_weekly_cases: 0,
            new_weekly_deaths: 0,
        });
        p.cumulative_cases += r.cumulative_cases;
        p.cumulative_deaths += r.cumulative_deaths;
        p.new_cases += r.new_cases;
        p.new_deaths += r.new_deaths;
        p.new_weekly_cases += r.new_weekly_cases.unwrap_or(0);
        p.new_weekly_deaths += r.new_weekly_deaths.unwrap_or(0);
    }

    points.into_values().collect()
}

/// Moving-average window: a week of daily rows, or four weekly rows.
pub fn trend_window(granularity: Granularity) -> usize {
    match granularity {
        Granularity::Daily => 7,
        Granularity::Weekly => 4,
    }
}

/// Trailing moving average of the view's "new" figures over `points`.
///
/// Empty when the timeline is shorter than [`trend_window`]. Weekly figures
/// use a window no longer than half the timeline.
pub fn trend(points: &[TimelinePoint], view: MetricView, granularity: Granularity) -> Vec<TrendPoint> {
    let window = trend_window(granularity);
    if points.len() < window {
        return Vec::new();
    }

    let daily = view == MetricView::DailyNew && granularity == Granularity::Daily;
    let (cases, deaths): (Vec<f64>, Vec<f64>) = if daily {
        points
            .iter()
            .map(|p| (p.new_cases as f64, p.new_deaths as f64))
            .unzip()
    } else {
        points
            .iter()
            .map(|p| (p.new_weekly_cases as f64, p.new_weekly_deaths as f64))
            .unzip()
    };

    let window = if daily {
        window
    } else {
        window.min((points.len() / 2).max(1))
    };

    let cases_ma = moving_average(&cases, window);
    let deaths_ma = moving_average(&deaths, window);

    points
        .iter()
        .zip(cases_ma.into_iter().zip(deaths_ma))
        .map(|(p, (cases, deaths))| TrendPoint {
            date: p.date,
            cases,
            deaths,
        })
        .collect()
}
