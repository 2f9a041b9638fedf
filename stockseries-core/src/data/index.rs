//! Directory index - one eager walk over a data tree.
//!
//! Layout: `{root}/{group}/{dataset}.csv`, nested to any depth. Every
//! directory that directly holds at least one matching file becomes a
//! `DatasetGroup` keyed by its last path segment. The walk is depth-first
//! with entries sorted by name, so the index order is stable across runs.
//! Leaf `RowSource`s stay lazy; no file content is read here.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{self, DirEntry};
use std::path::Path;

use super::source::RowSource;
use crate::error::{PipelineError, Result};

/// Options controlling which files are indexed.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// File extension to match, without the dot. Compared case-insensitively.
    pub extension: String,
    /// Field delimiter handed to every `RowSource`.
    pub delimiter: u8,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extension: "csv".into(),
            delimiter: b',',
        }
    }
}

/// Datasets found directly inside one directory, keyed by file stem.
#[derive(Debug, Default)]
pub struct DatasetGroup {
    datasets: BTreeMap<String, RowSource>,
}

impl DatasetGroup {
    pub fn contains(&self, dataset: &str) -> bool {
        self.datasets.contains_key(dataset)
    }

    /// Remove and return a dataset's source.
    pub fn take(&mut self, dataset: &str) -> Option<RowSource> {
        self.datasets.remove(dataset)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// Snapshot of a data tree: group name → datasets.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    groups: Vec<(String, DatasetGroup)>,
}

impl DirectoryIndex {
    /// Walk `root` and index every directory holding matching files.
    pub fn build(root: &Path, opts: &IndexOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(PipelineError::not_found(root));
        }
        let entries = read_sorted(root)?;
        let mut index = Self::default();
        index.index_dir(root, entries, opts);
        tracing::debug!(
            root = %root.display(),
            groups = index.len(),
            "indexed data directory"
        );
        Ok(index)
    }

    /// Index a nested directory. Unreadable directories are skipped.
    fn visit(&mut self, dir: &Path, opts: &IndexOptions) {
        match read_sorted(dir) {
            Ok(entries) => self.index_dir(dir, entries, opts),
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
            }
        }
    }

    fn index_dir(&mut self, dir: &Path, entries: Vec<DirEntry>, opts: &IndexOptions) {
        let mut group = DatasetGroup::default();
        let mut subdirs = Vec::new();

        for entry in entries {
            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    subdirs.push(path);
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            }
            if !path.is_file() || !has_extension(&path, &opts.extension) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
                continue;
            };
            let stem = stem.to_string();
            match RowSource::new(&path) {
                Ok(source) => {
                    group
                        .datasets
                        .insert(stem, source.with_delimiter(opts.delimiter));
                }
                Err(e) => tracing::warn!(error = %e, "skipping vanished file"),
            }
        }

        if !group.is_empty() {
            self.insert(segment_name(dir), group);
        }

        for sub in subdirs {
            self.visit(&sub, opts);
        }
    }

    fn insert(&mut self, name: String, group: DatasetGroup) {
        if let Some(slot) = self.groups.iter_mut().find(|(n, _)| *n == name) {
            tracing::warn!(group = %name, "duplicate directory name, later directory replaces earlier");
            slot.1 = group;
        } else {
            self.groups.push((name, group));
        }
    }

    pub fn group(&self, name: &str) -> Option<&DatasetGroup> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    /// Group names in walk order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatasetGroup)> {
        self.groups.iter().map(|(n, g)| (n.as_str(), g))
    }

    pub fn into_groups(self) -> Vec<(String, DatasetGroup)> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Last path segment of a directory, resolving `.`-style roots.
fn segment_name(dir: &Path) -> String {
    if let Some(name) = dir.file_name() {
        return name.to_string_lossy().into_owned();
    }
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| dir.display().to_string())
}
