//! stockseries core — ingest per-symbol price CSVs from a directory tree.
//!
//! Every stage is a pull-based iterator; nothing is read until a consumer
//! asks for the next record:
//! - `DirectoryIndex` walks the tree once and maps group → dataset → `RowSource`
//! - `RowSource` yields header-keyed `RawRecord`s from one file
//! - `Normalize` turns raw rows into typed `NormalizedRecord`s
//! - `SeriesChain` concatenates one dataset across all groups
//! - `write_consolidated` drains a stream into a single CSV
//! - `chart` prepares scatter and candlestick series for a `ChartSink`

pub mod chart;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod timing;

pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, RecordError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: records and configuration can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::NormalizedRecord>();
        require_sync::<domain::NormalizedRecord>();
        require_send::<data::RawRecord>();
        require_sync::<data::RawRecord>();
        require_send::<PipelineConfig>();
        require_sync::<PipelineConfig>();
        require_send::<PipelineError>();
        require_sync::<PipelineError>();

        // Streams own their file handle and can be moved to a worker.
        require_send::<data::SeriesChain>();
        require_send::<data::DirectoryIndex>();
    }
}
