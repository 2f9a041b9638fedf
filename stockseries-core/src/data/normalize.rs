//! Row normalization - text fields to typed price records.
//!
//! `NormalizedRecord::from_raw` is the only way to build a typed record from
//! input text. The `Normalize` adapter applies it to a record stream and
//! decides, per `MalformedPolicy`, what a bad row does to the rest of the
//! stream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::source::{RawRecord, RawRecords, RowSource};
use crate::domain::NormalizedRecord;
use crate::error::{PipelineError, RecordError, Result};

impl NormalizedRecord {
    /// Convert one raw record. `symbol` passes through untouched.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, RecordError> {
        Ok(Self {
            symbol: required(raw, "symbol")?.to_string(),
            date: parse_date(required(raw, "date")?)?,
            open: parse_float(raw, "open")?,
            high: parse_float(raw, "high")?,
            low: parse_float(raw, "low")?,
            close: parse_float(raw, "close")?,
            volume: parse_volume(raw)?,
            adj_close: parse_float(raw, "adj_close")?,
        })
    }
}

fn required<'a>(raw: &'a RawRecord, field: &'static str) -> Result<&'a str, RecordError> {
    raw.get(field).ok_or(RecordError::MissingField(field))
}

fn parse_float(raw: &RawRecord, field: &'static str) -> Result<f64, RecordError> {
    let value = required(raw, field)?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_volume(raw: &RawRecord) -> Result<i64, RecordError> {
    let value = required(raw, "volume")?;
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| RecordError::InvalidNumber {
            field: "volume",
            value: value.to_string(),
        })
}

/// Parse a dashed `YYYY-MM-DD` (or bare `YYYYMMDD`) date.
///
/// Dashes are removed first; what remains must be exactly eight digits
/// forming a real calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, RecordError> {
    let digits: String = value.trim().split('-').collect();
    let invalid = |reason| RecordError::InvalidDate {
        value: value.to_string(),
        reason,
    };

    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected eight digits YYYYMMDD"));
    }
    // All-ASCII digits, so the slices and parses below cannot fail.
    let year: i32 = digits[0..4].parse().map_err(|_| invalid("bad year"))?;
    let month: u32 = digits[4..6].parse().map_err(|_| invalid("bad month"))?;
    let day: u32 = digits[6..8].parse().map_err(|_| invalid("bad day"))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("not a calendar date"))
}

/// What a malformed row (or an unreadable source) does to the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// End the stream quietly at the first bad row. Logged as a warning.
    #[default]
    Truncate,
    /// Drop bad rows and keep going. Read errors still end the stream.
    Skip,
    /// Yield the error once, then end the stream.
    Fail,
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncate => "truncate",
            Self::Skip => "skip",
            Self::Fail => "fail",
        })
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "truncate" => Ok(Self::Truncate),
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "unknown policy '{other}' (expected truncate, skip or fail)"
            )),
        }
    }
}

/// Lazy adapter from raw records to typed records.
///
/// The wrapped iterator is dropped as soon as the stream ends, which releases
/// any file handle it holds.
pub struct Normalize<I> {
    inner: Option<I>,
    policy: MalformedPolicy,
    yielded: usize,
    skipped: usize,
}

/// Wrap a raw record stream.
pub fn normalize<I>(records: I, policy: MalformedPolicy) -> Normalize<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    Normalize {
        inner: Some(records),
        policy,
        yielded: 0,
        skipped: 0,
    }
}

/// Open a row source and normalize it.
///
/// Fails with `ContractViolation` if the source was already consumed.
pub fn normalize_source(
    source: &mut RowSource,
    policy: MalformedPolicy,
) -> Result<Normalize<RawRecords>> {
    Ok(normalize(source.open()?, policy))
}

impl RawRecords {
    pub fn normalized(self, policy: MalformedPolicy) -> Normalize<Self> {
        normalize(self, policy)
    }
}

impl<I> Normalize<I> {
    /// Records yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Rows dropped under `MalformedPolicy::Skip`.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn finish(&mut self) {
        self.inner = None;
    }

    /// Apply the policy to a terminal error. Returns the item to yield, if any.
    fn on_error(&mut self, err: PipelineError) -> Option<Result<NormalizedRecord>> {
        self.finish();
        match self.policy {
            MalformedPolicy::Fail => Some(Err(err)),
            MalformedPolicy::Truncate | MalformedPolicy::Skip => {
                tracing::warn!(
                    after = self.yielded,
                    error = %err,
                    "record stream ended early"
                );
                None
            }
        }
    }
}

impl<I> Iterator for Normalize<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    type Item = Result<NormalizedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.inner.as_mut()?.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => return self.on_error(e),
                None => {
                    self.finish();
                    return None;
                }
            };

            match NormalizedRecord::from_raw(&raw) {
                Ok(record) => {
                    self.yielded += 1;
                    return Some(Ok(record));
                }
                Err(reason) => {
                    let err = PipelineError::MalformedRecord {
                        path: raw.path().to_path_buf(),
                        line: raw.line(),
                        source: reason,
                    };
                    if self.policy == MalformedPolicy::Skip {
                        tracing::warn!(error = %err, "skipping malformed record");
                        self.skipped += 1;
                        continue;
                    }
                    return self.on_error(err);
                }
            }
        }
    }
}
