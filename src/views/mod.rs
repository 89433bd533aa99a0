//! Filters and aggregates computed from a derived table.
//!
//! These are the figures a dashboard shows (headline numbers, timelines,
//! rankings, regional and per-country tables, metric correlations). They
//! read [`DerivedRecord`](crate::record::DerivedRecord)s and never modify
//! them.

pub mod correlation;
pub mod filter;
pub mod summary;
pub mod timeline;
pub mod types;
pub mod utility;

pub use correlation::correlation;
pub use filter::Filter;
pub use summary::{country_summary, headline, latest_by_country, region_summary, top_countries};
pub use timeline::{timeline, trend, trend_window};
pub use types::{Metric, MetricView};
