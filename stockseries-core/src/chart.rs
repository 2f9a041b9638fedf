//! Chart series - the boundary between the pipeline and a plotting backend.
//!
//! The pipeline never draws. It prepares one of two series shapes from a
//! record stream and hands it to a `ChartSink`:
//! - scatter: one numeric field of one symbol against time
//! - candlestick: OHLC per session, split by whether the session closed up
//!   or down, with a fixed half-day bar width

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::chain::RecordStreamExt;
use crate::domain::{NormalizedRecord, PriceField};
use crate::error::{PipelineError, Result};

/// Symbol plotted when none is named.
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// Candle body width in milliseconds.
pub const HALF_DAY_MS: i64 = 12 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One field of one symbol over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub title: String,
    pub symbol: String,
    pub field: PriceField,
    pub points: Vec<ScatterPoint>,
}

impl ScatterSeries {
    /// Gather `field` for `symbol`. Stream errors are returned as-is.
    pub fn collect<I>(records: I, symbol: &str, field: PriceField) -> Result<Self>
    where
        I: Iterator<Item = Result<NormalizedRecord>>,
    {
        let points = records
            .for_symbol(symbol)
            .map(|r| {
                r.map(|rec| ScatterPoint {
                    date: rec.date,
                    value: rec.field(field),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if points.is_empty() {
            return Err(PipelineError::empty(format!("plot for symbol {symbol}")));
        }

        Ok(Self {
            title: format!("{symbol} Stocks"),
            symbol: symbol.to_string(),
            field,
            points,
        })
    }
}

/// OHLC for a single session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&NormalizedRecord> for Candle {
    fn from(rec: &NormalizedRecord) -> Self {
        Self {
            date: rec.date,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
        }
    }
}

/// Candles of one symbol, grouped by session direction.
///
/// Flat sessions (close == open) belong to neither group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlestickSeries {
    pub title: String,
    pub symbol: String,
    pub bar_width_ms: i64,
    pub up: Vec<Candle>,
    pub down: Vec<Candle>,
}

impl CandlestickSeries {
    pub fn collect<I>(records: I, symbol: &str) -> Result<Self>
    where
        I: Iterator<Item = Result<NormalizedRecord>>,
    {
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut seen = 0usize;

        for rec in records.for_symbol(symbol) {
            let rec = rec?;
            seen += 1;
            match rec.closed_up() {
                Some(true) => up.push(Candle::from(&rec)),
                Some(false) => down.push(Candle::from(&rec)),
                None => {}
            }
        }

        if seen == 0 {
            return Err(PipelineError::empty(format!("plot for symbol {symbol}")));
        }

        Ok(Self {
            title: format!("{symbol} Candlestick"),
            symbol: symbol.to_string(),
            bar_width_ms: HALF_DAY_MS,
            up,
            down,
        })
    }
}

/// Something that turns a prepared series into a visual artifact.
pub trait ChartSink {
    fn render_scatter(&mut self, series: &ScatterSeries) -> Result<()>;

    fn render_candlestick(&mut self, series: &CandlestickSeries) -> Result<()>;
}

/// Writes series as pretty JSON for an external plotting tool.
pub struct JsonChartSink {
    path: PathBuf,
}

impl JsonChartSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json)?;
        tracing::info!(path = %self.path.display(), "wrote chart series");
        Ok(())
    }
}

impl ChartSink for JsonChartSink {
    fn render_scatter(&mut self, series: &ScatterSeries) -> Result<()> {
        self.write(series)
    }

    fn render_candlestick(&mut self, series: &CandlestickSeries) -> Result<()> {
        self.write(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(symbol: &str, day: u32, open: f64, close: f64) -> Result<NormalizedRecord> {
        Ok(NormalizedRecord {
            symbol: symbol.into(),
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 10,
            adj_close: close,
        })
    }

    #[test]
    fn scatter_filters_symbol_and_field() {
        let records = vec![
            rec("INTL", 2, 10.0, 11.0),
            rec("AAPL", 2, 100.0, 101.0),
            rec("INTL", 3, 11.0, 12.0),
        ];

        let series =
            ScatterSeries::collect(records.into_iter(), "INTL", PriceField::AdjClose).unwrap();

        assert_eq!(series.title, "INTL Stocks");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].value, 11.0);
        assert_eq!(series.points[1].value, 12.0);
        assert!(series.points[0].date < series.points[1].date);
    }

    #[test]
    fn scatter_for_unknown_symbol_is_empty_result() {
        let records = vec![rec("AAPL", 2, 1.0, 2.0)];
        let err = ScatterSeries::collect(records.into_iter(), "INTL", PriceField::Close)
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult { .. }));
    }

    #[test]
    fn candlestick_splits_up_and_down_sessions() {
        let records = vec![
            rec("AAPL", 2, 100.0, 105.0),
            rec("AAPL", 3, 105.0, 101.0),
            rec("AAPL", 6, 101.0, 101.0),
            rec("AAPL", 7, 101.0, 103.0),
            rec("INTL", 7, 10.0, 1.0),
        ];

        let series = CandlestickSeries::collect(records.into_iter(), "AAPL").unwrap();

        assert_eq!(series.bar_width_ms, 43_200_000);
        assert_eq!(series.up.len(), 2);
        assert_eq!(series.down.len(), 1);
        assert_eq!(series.down[0].close, 101.0);
        assert!(series.up.iter().all(|c| c.close > c.open));
    }

    #[test]
    fn stream_error_propagates() {
        let records = vec![
            rec("AAPL", 2, 1.0, 2.0),
            Err(PipelineError::ContractViolation("bad".into())),
        ];
        let err = CandlestickSeries::collect(records.into_iter(), "AAPL").unwrap_err();
        assert!(matches!(err, PipelineError::ContractViolation(_)));
    }

    #[test]
    fn json_sink_writes_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candlestick.json");
        let series =
            CandlestickSeries::collect(vec![rec("AAPL", 2, 1.0, 2.0)].into_iter(), "AAPL").unwrap();

        let mut sink = JsonChartSink::new(&path);
        sink.render_candlestick(&series).unwrap();

        let back: CandlestickSeries =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, series);
    }
}
