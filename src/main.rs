//! CLI entry point for the COVID-19 series tool.
//!
//! Provides subcommands for deriving the enriched case/death table from a
//! WHO-style CSV, summarising a filtered slice of it, exporting per-country
//! totals, and correlating the derived metrics.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use covid_series::cache::{DerivedCache, SourceKey};
use covid_series::config::Settings;
use covid_series::loader::load_source;
use covid_series::output::{print_json, write_records};
use covid_series::views::{
    self, Filter, MetricView, country_summary, headline, region_summary, top_countries,
};
use covid_series::{Derivation, Granularity};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "covid_series")]
#[command(about = "Derive and summarise COVID-19 case/death time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where to read from and at which granularity.
#[derive(Args)]
struct SourceArgs {
    /// Native resolution of the source
    #[arg(short, long, value_enum, default_value_t = Granularity::Weekly)]
    granularity: Granularity,

    /// Path or URL of the CSV source (defaults to the configured source)
    #[arg(short, long, value_name = "FILE_OR_URL")]
    source: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive deltas, calendar fields and mortality and write them as CSV
    Derive {
        #[command(flatten)]
        source: SourceArgs,

        /// CSV file to write the derived table to
        #[arg(short, long, default_value = "derived.csv")]
        output: String,
    },
    /// Log headline figures, region totals and top countries for a selection
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// WHO region to include; repeat for several (default: all)
        #[arg(long = "region")]
        regions: Vec<String>,

        /// Country to include; repeat for several (default: all)
        #[arg(long = "country")]
        countries: Vec<String>,

        /// Which figures to report as "new"
        #[arg(long, value_enum, default_value_t = MetricView::Cumulative)]
        view: MetricView,

        /// Number of countries in the ranking
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write per-country totals as CSV
    Countries {
        #[command(flatten)]
        source: SourceArgs,

        /// CSV file to write the summary to
        #[arg(short, long, default_value = "countries.csv")]
        output: String,
    },
    /// Log the correlation matrix of the derived metrics
    Correlate {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/covid_series.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid_series.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let settings = Settings::from_env()?;
    let cache = DerivedCache::new(settings.cache_ttl);
    let cli = Cli::parse();

    match cli.command {
        Commands::Derive { source, output } => {
            let derived = load_derived(&cache, &settings, &source).await?;
            write_records(&output, &derived.records)?;
            info!(
                output = %output,
                rows = derived.len(),
                elapsed_ms = derived.elapsed.as_secs_f64() * 1000.0,
                "Derived table written"
            );
        }
        Commands::Summary {
            source,
            start,
            end,
            regions,
            countries,
            view,
            top,
        } => {
            let derived = load_derived(&cache, &settings, &source).await?;
            let filter = Filter {
                start,
                end,
                regions,
                countries,
            };
            let filtered = filter.apply(&derived.records);

            let Some(headline) = headline(&filtered, view, derived.granularity) else {
                warn!("No data available with the current filter settings");
                return Ok(());
            };
            print_json(&headline)?;
            print_json(&region_summary(&filtered))?;

            let (rank_metric, _) = view.metrics(derived.granularity);
            let ranking: Vec<_> = top_countries(&filtered, rank_metric, top)
                .into_iter()
                .map(|r| {
                    let value = rank_metric.value(&r).unwrap_or(0.0);
                    (r.country, value, r.mortality_rate)
                })
                .collect();
            print_json(&ranking)?;
        }
        Commands::Countries { source, output } => {
            let derived = load_derived(&cache, &settings, &source).await?;
            let summary = country_summary(&derived.records);
            write_records(&output, &summary)?;
            info!(output = %output, countries = summary.len(), "Country summary written");
        }
        Commands::Correlate { source } => {
            let derived = load_derived(&cache, &settings, &source).await?;
            match views::correlation(&derived.records, derived.granularity) {
                Some(matrix) => print_json(&matrix)?,
                None => warn!("Not enough data to compute correlations"),
            }
        }
    }

    Ok(())
}

/// Loads and derives the requested source through the cache.
#[tracing::instrument(skip(cache, settings, args), fields(granularity = %args.granularity))]
async fn load_derived(
    cache: &DerivedCache,
    settings: &Settings,
    args: &SourceArgs,
) -> Result<Arc<Derivation>> {
    let source = args
        .source
        .clone()
        .unwrap_or_else(|| settings.source_for(args.granularity).to_string());
    let key = SourceKey::new(source.clone(), args.granularity);

    let derived = cache
        .get_or_derive(key, || load_source(&source))
        .await
        .with_context(|| format!("Error loading data from {source}"))?;

    info!(
        source = %source,
        rows = derived.len(),
        elapsed_ms = derived.elapsed.as_secs_f64() * 1000.0,
        "Data loaded"
    );
    if derived.is_empty() {
        warn!(source = %source, "Source contains no rows");
    }
    Ok(derived)
}
