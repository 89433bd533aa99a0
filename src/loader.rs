//! Reading WHO-style case/death CSV sources into [`RawRecord`]s.
//!
//! Columns are matched by header name. `Date_reported`, `Cumulative_cases`
//! and `Cumulative_deaths` are required; `Country`, `Country_code` and
//! `WHO_region` may be blank. Any extra columns (`New_cases`, ...) are
//! ignored since deltas are always recomputed from the cumulative counters.

use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SeriesError};
use crate::fetch::{BasicClient, fetch_bytes};
use crate::record::RawRecord;

pub const DATE_COLUMN: &str = "Date_reported";
pub const COUNTRY_COLUMN: &str = "Country";
pub const REGION_COLUMN: &str = "WHO_region";
pub const CASES_COLUMN: &str = "Cumulative_cases";
pub const DEATHS_COLUMN: &str = "Cumulative_deaths";

const REQUIRED_COLUMNS: &[&str] = &[DATE_COLUMN, CASES_COLUMN, DEATHS_COLUMN];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// A CSV row before validation. Every cell is optional here so that a blank
/// required cell can be reported by name instead of as a serde failure.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date_reported")]
    date: Option<String>,
    #[serde(rename = "Country_code", default)]
    country_code: Option<String>,
    #[serde(rename = "Country", default)]
    country: Option<String>,
    #[serde(rename = "WHO_region", default)]
    region: Option<String>,
    #[serde(rename = "Cumulative_cases")]
    cumulative_cases: Option<String>,
    #[serde(rename = "Cumulative_deaths")]
    cumulative_deaths: Option<String>,
}

/// Loads a source from a local path or an `http(s)` URL.
///
/// Sources whose name ends in `.gz` are decompressed first.
#[tracing::instrument(fields(source = %source))]
pub async fn load_source(source: &str) -> Result<Vec<RawRecord>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source)?
    };

    let records = if source.ends_with(".gz") {
        parse_records(GzDecoder::new(bytes.as_slice()))?
    } else {
        parse_records(bytes.as_slice())?
    };

    info!(rows = records.len(), "Source loaded");
    Ok(records)
}

/// Parses CSV text with a header row into validated records.
///
/// # Errors
///
/// Returns [`SeriesError::DataFormat`] naming the first missing column, or
/// the first blank, unparseable or undecodable cell together with its row.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(SeriesError::data_format(None, column, "missing column"));
        }
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = idx + 1;
        let raw = result.map_err(|err| row_error(row, &headers, err))?;
        records.push(validate_row(row, raw)?);
    }

    debug!(rows = records.len(), "CSV parsed");
    Ok(records)
}

/// Turns a per-row decoding failure into a [`SeriesError::DataFormat`]
/// naming the offending column when csv reports one.
fn row_error(row: usize, headers: &csv::StringRecord, err: csv::Error) -> SeriesError {
    let (field, reason) = match err.kind() {
        csv::ErrorKind::Utf8 { err, .. } => (headers.get(err.field()), "invalid UTF-8".to_string()),
        csv::ErrorKind::Deserialize { err, .. } => (
            err.field().and_then(|i| headers.get(i as usize)),
            err.kind().to_string(),
        ),
        _ => return err.into(),
    };
    SeriesError::data_format(Some(row), field.unwrap_or("<unknown>"), reason)
}

fn validate_row(row: usize, raw: CsvRow) -> Result<RawRecord> {
    let date_text = required(row, DATE_COLUMN, raw.date)?;
    let date = parse_date(&date_text).ok_or_else(|| {
        SeriesError::data_format(
            Some(row),
            DATE_COLUMN,
            format!("unparseable date '{date_text}'"),
        )
    })?;

    let cases_text = required(row, CASES_COLUMN, raw.cumulative_cases)?;
    let cumulative_cases = parse_counter(row, CASES_COLUMN, &cases_text)?;

    let deaths_text = required(row, DEATHS_COLUMN, raw.cumulative_deaths)?;
    let cumulative_deaths = parse_counter(row, DEATHS_COLUMN, &deaths_text)?;

    Ok(RawRecord {
        date,
        country: non_blank(raw.country),
        country_code: non_blank(raw.country_code),
        region: non_blank(raw.region),
        cumulative_cases,
        cumulative_deaths,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(row: usize, field: &str, value: Option<String>) -> Result<String> {
    non_blank(value).ok_or_else(|| SeriesError::data_format(Some(row), field, "empty value"))
}

/// Parses `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
}

/// Parses a non-negative counter. Integral floats such as `"12.0"` are
/// accepted since some exports write counters as floating point.
fn parse_counter(row: usize, field: &str, text: &str) -> Result<u64> {
    if let Ok(value) = text.parse::<u64>() {
        return Ok(value);
    }

    match text.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value >= 0.0
                && value.fract() == 0.0
                && value <= u64::MAX as f64 =>
        {
            Ok(value as u64)
        }
        Ok(_) => Err(SeriesError::data_format(
            Some(row),
            field,
            format!("'{text}' is not a non-negative integer"),
        )),
        Err(_) => Err(SeriesError::data_format(
            Some(row),
            field,
            format!("unparseable number '{text}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Date_reported,Country_code,Country,WHO_region,New_cases,Cumulative_cases,New_deaths,Cumulative_deaths\n";

    fn parse(body: &str) -> Result<Vec<RawRecord>> {
        parse_records(format!("{HEADER}{body}").as_bytes())
    }

    #[test]
    fn test_parse_valid_rows() {
        let records = parse(
            "2020-01-05,AF,Afghanistan,EMRO,0,0,0,0\n\
             2020-01-06,AF,Afghanistan,EMRO,3,3,1,1\n",
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2020, 1, 6).unwrap());
        assert_eq!(records[1].country.as_deref(), Some("Afghanistan"));
        assert_eq!(records[1].country_code.as_deref(), Some("AF"));
        assert_eq!(records[1].region.as_deref(), Some("EMRO"));
        assert_eq!(records[1].cumulative_cases, 3);
        assert_eq!(records[1].cumulative_deaths, 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        let records = parse("").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_blank_region_and_country_are_kept_as_none() {
        let records = parse("2020-01-05,,,,0,10,0,1\n").unwrap();
        assert_eq!(records[0].region, None);
        assert_eq!(records[0].country, None);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Date_reported,Country,Cumulative_cases\n2020-01-05,X,1\n";
        let err = parse_records(csv.as_bytes()).unwrap_err();
        match err {
            SeriesError::DataFormat { row, field, .. } => {
                assert_eq!(row, None);
                assert_eq!(field, "Cumulative_deaths");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_counter_names_field_and_row() {
        let err = parse(
            "2020-01-05,AF,Afghanistan,EMRO,0,0,0,0\n\
             2020-01-06,AF,Afghanistan,EMRO,0,,0,0\n",
        )
        .unwrap_err();
        match err {
            SeriesError::DataFormat { row, field, .. } => {
                assert_eq!(row, Some(2));
                assert_eq!(field, CASES_COLUMN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_date() {
        let err = parse("05/01/2020,AF,Afghanistan,EMRO,0,0,0,0\n").unwrap_err();
        match err {
            SeriesError::DataFormat { field, .. } => assert_eq!(field, DATE_COLUMN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_reports_missing_field() {
        let err = parse("2020-01-05,AF,Afghanistan,EMRO,0,4\n").unwrap_err();
        match err {
            SeriesError::DataFormat { row, field, .. } => {
                assert_eq!(row, Some(1));
                assert_eq!(field, DEATHS_COLUMN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_data_format_error() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"2020-01-05,AF,Afghanistan,EMRO,0,7,0,1\n");
        bytes.extend_from_slice(b"2020-01-06,AF,Afghan\xffistan,EMRO,0,8,0,1\n");

        let err = parse_records(bytes.as_slice()).unwrap_err();
        assert!(err.is_data_format());
        match err {
            SeriesError::DataFormat { row, .. } => assert_eq!(row, Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_float_counters() {
        let records = parse("2020-01-05,AF,Afghanistan,EMRO,0,12.0,0,3.0\n").unwrap();
        assert_eq!(records[0].cumulative_cases, 12);
        assert_eq!(records[0].cumulative_deaths, 3);

        assert!(parse("2020-01-05,AF,Afghanistan,EMRO,0,12.5,0,3\n").is_err());
        assert!(parse("2020-01-05,AF,Afghanistan,EMRO,0,-4,0,3\n").is_err());
    }

    #[test]
    fn test_parse_date_with_time() {
        assert_eq!(
            parse_date("2021-03-01 00:00:00"),
            NaiveDate::from_ymd_opt(2021, 3, 1)
        );
        assert_eq!(
            parse_date("2021-03-01T12:30:00"),
            NaiveDate::from_ymd_opt(2021, 3, 1)
        );
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_gzip_source() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(format!("{HEADER}2020-01-05,AF,Afghanistan,EMRO,0,7,0,1\n").as_bytes())
            .unwrap();
        let compressed = encoder.finish().unwrap();

        let path = std::env::temp_dir().join("covid_series_test_source.csv.gz");
        std::fs::write(&path, compressed).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let records = rt.block_on(load_source(path.to_str().unwrap())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cumulative_cases, 7);

        std::fs::remove_file(&path).unwrap();
    }
}
