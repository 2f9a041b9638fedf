//! Series chaining - one dataset from every group, back to back.

use std::path::Path;

use super::index::{DirectoryIndex, IndexOptions};
use super::normalize::{normalize, MalformedPolicy, Normalize};
use super::source::{RawRecords, RowSource};
use crate::config::PipelineConfig;
use crate::domain::NormalizedRecord;
use crate::error::Result;

/// Dataset selected when none is named.
pub const DEFAULT_TARGET: &str = "prices";

/// Normalized records of the target dataset across all groups.
///
/// Groups are drained in index order; every record of one group is yielded
/// before the next group's file is opened. Groups without the target dataset
/// are skipped.
pub struct SeriesChain {
    pending: std::vec::IntoIter<(String, RowSource)>,
    current: Option<Normalize<RawRecords>>,
    policy: MalformedPolicy,
}

impl SeriesChain {
    pub fn new(index: DirectoryIndex, target: &str, policy: MalformedPolicy) -> Self {
        let pending: Vec<(String, RowSource)> = index
            .into_groups()
            .into_iter()
            .filter_map(|(name, mut group)| match group.take(target) {
                Some(source) => Some((name, source)),
                None => {
                    tracing::debug!(group = %name, dataset = target, "group has no target dataset");
                    None
                }
            })
            .collect();

        Self {
            pending: pending.into_iter(),
            current: None,
            policy,
        }
    }

    /// Groups not yet started.
    pub fn remaining_groups(&self) -> usize {
        self.pending.len()
    }
}

impl Iterator for SeriesChain {
    type Item = Result<NormalizedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    return Some(item);
                }
                self.current = None;
            }

            let (group, mut source) = self.pending.next()?;
            tracing::debug!(group = %group, path = %source.path().display(), "chaining dataset");
            match source.open() {
                Ok(records) => self.current = Some(normalize(records, self.policy)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Index `root` and chain its target dataset, as configured.
pub fn load_series(root: &Path, config: &PipelineConfig) -> Result<SeriesChain> {
    let opts = IndexOptions {
        extension: config.extension.clone(),
        delimiter: config.delimiter_byte(),
    };
    let index = DirectoryIndex::build(root, &opts)?;
    Ok(SeriesChain::new(index, &config.target, config.on_malformed))
}

/// Re-read a consolidated file as a normalized stream.
pub fn read_consolidated(path: &Path, policy: MalformedPolicy) -> Result<Normalize<RawRecords>> {
    let mut source = RowSource::new(path)?;
    Ok(normalize(source.open()?, policy))
}

/// Symbol filtering for record streams.
pub trait RecordStreamExt: Iterator<Item = Result<NormalizedRecord>> + Sized {
    /// Keep only records for `symbol`, in their original order. Errors pass through.
    fn for_symbol(self, symbol: impl Into<String>) -> ForSymbol<Self> {
        ForSymbol {
            inner: self,
            symbol: symbol.into(),
        }
    }
}

impl<I> RecordStreamExt for I where I: Iterator<Item = Result<NormalizedRecord>> {}

/// Iterator returned by [`RecordStreamExt::for_symbol`].
pub struct ForSymbol<I> {
    inner: I,
    symbol: String,
}

impl<I> Iterator for ForSymbol<I>
where
    I: Iterator<Item = Result<NormalizedRecord>>,
{
    type Item = Result<NormalizedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find(|item| match item {
            Ok(rec) => rec.symbol == self.symbol,
            Err(_) => true,
        })
    }
}
