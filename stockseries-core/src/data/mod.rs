//! Data pipeline: index a tree, read rows lazily, normalize, chain, write.

pub mod chain;
pub mod index;
pub mod normalize;
pub mod source;
pub mod writer;

pub use chain::{load_series, read_consolidated, RecordStreamExt, SeriesChain, DEFAULT_TARGET};
pub use index::{DatasetGroup, DirectoryIndex, IndexOptions};
pub use normalize::{normalize, normalize_source, parse_date, MalformedPolicy, Normalize};
pub use source::{RawRecord, RawRecords, RowSource};
pub use writer::{write_consolidated, WriteSummary, DEFAULT_OUTPUT};
