//! Row source - lazy, header-keyed records from one delimited file.
//!
//! A `RowSource` validates its path up front but does not touch the file
//! until its record iterator is first polled. The file handle lives inside
//! the iterator and is released on exhaustion, on the first read error, or
//! when the iterator is dropped early.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// One input line: text fields named by the file's header.
#[derive(Debug, Clone)]
pub struct RawRecord {
    path: Arc<Path>,
    headers: Arc<StringRecord>,
    values: StringRecord,
    line: u64,
}

impl RawRecord {
    /// Value of the named field, if the header declares it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| self.values.get(i))
    }

    /// `(name, value)` pairs in header order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().zip(self.values.iter())
    }

    /// 1-based line number in the source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// File this record was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Handle to one delimited file. Yields its records exactly once.
#[derive(Debug)]
pub struct RowSource {
    path: PathBuf,
    delimiter: u8,
    opened: bool,
}

impl RowSource {
    /// Create a source for `path`, which must be an existing file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(PipelineError::not_found(path));
        }
        Ok(Self {
            path,
            delimiter: b',',
            opened: false,
        })
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `open` has already been called.
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Start the record sequence.
    ///
    /// The sequence is not restartable: a second call fails with
    /// `ContractViolation` instead of silently yielding nothing.
    pub fn open(&mut self) -> Result<RawRecords> {
        if self.opened {
            return Err(PipelineError::ContractViolation(format!(
                "row source {} was already consumed",
                self.path.display()
            )));
        }
        self.opened = true;
        Ok(RawRecords {
            state: State::Pending {
                path: Arc::from(self.path.as_path()),
                delimiter: self.delimiter,
            },
        })
    }
}

enum State {
    Pending {
        path: Arc<Path>,
        delimiter: u8,
    },
    Reading {
        path: Arc<Path>,
        headers: Arc<StringRecord>,
        records: StringRecordsIntoIter<File>,
    },
    Done,
}

/// Lazy iterator over the records of one file.
pub struct RawRecords {
    state: State,
}

impl RawRecords {
    /// True once the file handle has been released for good.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn start(path: Arc<Path>, delimiter: u8) -> Result<State> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_path(&path)?;
        let headers = Arc::new(reader.headers()?.clone());
        tracing::debug!(path = %path.display(), columns = headers.len(), "opened row source");
        Ok(State::Reading {
            path,
            headers,
            records: reader.into_records(),
        })
    }
}

impl Iterator for RawRecords {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending { .. }) {
            self.state = match std::mem::replace(&mut self.state, State::Done) {
                State::Pending { path, delimiter } => match Self::start(path, delimiter) {
                    Ok(state) => state,
                    Err(e) => return Some(Err(e)),
                },
                other => other,
            };
        }

        let State::Reading {
            path,
            headers,
            records,
        } = &mut self.state
        else {
            return None;
        };

        match records.next() {
            Some(Ok(values)) => {
                let line = values.position().map(|p| p.line()).unwrap_or_default();
                Some(Ok(RawRecord {
                    path: Arc::clone(path),
                    headers: Arc::clone(headers),
                    values,
                    line,
                }))
            }
            Some(Err(e)) => {
                self.state = State::Done;
                Some(Err(e.into()))
            }
            None => {
                self.state = State::Done;
                None
            }
        }
    }
}
