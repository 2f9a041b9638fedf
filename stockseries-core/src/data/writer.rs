//! Consolidated writer - drain a record stream into one flat CSV.
//!
//! Writes are atomic: rows go to `{path}.tmp`, which is renamed into place
//! only after the last row is flushed. An empty stream or a stream error
//! leaves the destination untouched.

use csv::{QuoteStyle, WriterBuilder};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::NormalizedRecord;
use crate::error::{PipelineError, Result};

/// Output file used when none is named.
pub const DEFAULT_OUTPUT: &str = "all.csv";

/// What a consolidated write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub symbols: usize,
}

/// Write every record to `path`, header first, in arrival order.
///
/// Fails with `EmptyResult` when the stream yields nothing; the header is
/// derived from the record type, but a header-only file is never produced.
pub fn write_consolidated<I>(path: &Path, records: I) -> Result<WriteSummary>
where
    I: IntoIterator<Item = Result<NormalizedRecord>>,
{
    let mut records = records.into_iter();
    let first = match records.next() {
        Some(item) => item?,
        None => {
            return Err(PipelineError::empty(format!(
                "write to {}",
                path.display()
            )))
        }
    };

    let tmp_path = tmp_path_for(path);
    let written = write_rows(&tmp_path, first, records).and_then(|counts| {
        fs::rename(&tmp_path, path)?;
        Ok(counts)
    });

    match written {
        Ok((rows, symbols)) => {
            tracing::info!(path = %path.display(), rows, symbols, "wrote consolidated file");
            Ok(WriteSummary {
                path: path.to_path_buf(),
                rows,
                symbols,
            })
        }
        Err(e) => {
            // Clean up temp file on any failure
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn write_rows<I>(tmp_path: &Path, first: NormalizedRecord, rest: I) -> Result<(usize, usize)>
where
    I: Iterator<Item = Result<NormalizedRecord>>,
{
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .quote_style(QuoteStyle::Necessary)
        .from_path(tmp_path)?;

    let mut symbols = BTreeSet::new();
    let mut rows = 0usize;

    for record in std::iter::once(Ok(first)).chain(rest) {
        let record = record?;
        wtr.serialize(&record)?;
        symbols.insert(record.symbol);
        rows += 1;
    }
    wtr.flush()?;

    Ok((rows, symbols.len()))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chain::read_consolidated;
    use crate::data::normalize::MalformedPolicy;
    use crate::domain::FIELD_NAMES;
    use chrono::NaiveDate;

    fn record(symbol: &str, day: u32, close: f64, volume: i64) -> NormalizedRecord {
        NormalizedRecord {
            symbol: symbol.into(),
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            open: 100.0,
            high: 101.25,
            low: 99.0,
            close,
            volume,
            adj_close: close * 0.98,
        }
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        let records = vec![Ok(record("AAPL", 2, 100.5, 1000)), Ok(record("INTL", 3, 50.0, 7))];

        let summary = write_consolidated(&path, records).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.symbols, 2);
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], FIELD_NAMES.join(","));
        assert!(lines[1].starts_with("AAPL,2020-01-02,100.0,101.25,99.0,100.5,1000,"));
        assert!(lines[2].starts_with("INTL,2020-01-03,"));
        assert_eq!(lines.len(), 3);
        assert!(!text.contains('"'));
    }

    #[test]
    fn empty_stream_is_an_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");

        let err = write_consolidated(&path, Vec::<Result<NormalizedRecord>>::new()).unwrap_err();

        assert!(matches!(err, PipelineError::EmptyResult { .. }));
        assert!(!path.exists());
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn empty_stream_keeps_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        fs::write(&path, "previous").unwrap();

        assert!(write_consolidated(&path, Vec::<Result<NormalizedRecord>>::new()).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn stream_error_discards_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        let records = vec![
            Ok(record("AAPL", 2, 100.5, 1000)),
            Err(PipelineError::ContractViolation("boom".into())),
        ];

        let err = write_consolidated(&path, records).unwrap_err();

        assert!(matches!(err, PipelineError::ContractViolation(_)));
        assert!(!path.exists());
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        fs::write(&path, "old,content\n1,2\n3,4\n5,6\n").unwrap();

        write_consolidated(&path, vec![Ok(record("AAPL", 2, 1.0, 1))]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("old"));
    }

    #[test]
    fn round_trip_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        let original = vec![
            record("AAPL", 2, 100.5, 1000),
            record("AAPL", 3, 0.1 + 0.2, i64::MIN),
            record("INTL", 6, 1e-7, 0),
        ];

        write_consolidated(&path, original.iter().cloned().map(Ok)).unwrap();
        let back: Vec<NormalizedRecord> = read_consolidated(&path, MalformedPolicy::Fail)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(back.len(), original.len());
        for (a, b) in original.iter().zip(&back) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.date, b.date);
            assert!((a.open - b.open).abs() < 1e-12);
            assert!((a.close - b.close).abs() < 1e-12);
            assert!((a.adj_close - b.adj_close).abs() < 1e-12);
            assert_eq!(a.volume, b.volume);
        }
    }
}
