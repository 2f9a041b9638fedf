//! NormalizedRecord — one typed daily price row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column order of the consolidated output.
pub const FIELD_NAMES: [&str; 8] = [
    "symbol", "date", "open", "high", "low", "close", "volume", "adj_close",
];

/// Daily price row for a single symbol.
///
/// Field declaration order is the serialized column order; see [`FIELD_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_close: f64,
}

impl NormalizedRecord {
    /// Value of a numeric field, volume widened to f64.
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
            PriceField::Volume => self.volume as f64,
        }
    }

    /// Session direction: `Some(true)` closed up, `Some(false)` closed down,
    /// `None` when close equals open.
    pub fn closed_up(&self) -> Option<bool> {
        if self.close > self.open {
            Some(true)
        } else if self.close < self.open {
            Some(false)
        } else {
            None
        }
    }
}

/// A plottable numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[default]
    AdjClose,
    Volume,
}

impl PriceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::AdjClose => "adj_close",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "close" => Ok(Self::Close),
            "adj_close" => Ok(Self::AdjClose),
            "volume" => Ok(Self::Volume),
            other => Err(format!(
                "unknown field '{other}' (expected one of open, high, low, close, adj_close, volume)"
            )),
        }
    }
}
