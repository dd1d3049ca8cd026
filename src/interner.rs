//! Per-scan tables of directory prefixes and the file names found under them.
//!
//! Every discovered directory is stored once and referred to by index, so a
//! name seen under many directories costs one `usize` per occurrence.

use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ScanSession {
    /// Directory prefixes in discovery order; the index is the prefix id.
    paths: Vec<PathBuf>,
    path_index: HashMap<PathBuf, usize>,
    /// File name to the prefixes it was seen under, in traversal order.
    files: BTreeMap<OsString, Vec<usize>>,
    last: Option<usize>,
    file_count: usize,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file. Returns false for paths without a file name.
    pub fn add(&mut self, full_path: &Path) -> bool {
        let Some(name) = full_path.file_name() else {
            return false;
        };
        let dir = full_path.parent().unwrap_or_else(|| Path::new(""));
        let idx = self.intern(dir);
        self.files
            .entry(name.to_os_string())
            .or_default()
            .push(idx);
        self.file_count += 1;
        true
    }

    /// Index for a directory prefix, assigned on first sight and never reused.
    pub fn intern(&mut self, dir: &Path) -> usize {
        // Files arrive grouped by directory during a walk.
        if let Some(last) = self.last {
            if self.paths[last] == dir {
                return last;
            }
        }
        let idx = match self.path_index.get(dir) {
            Some(&idx) => idx,
            None => {
                let idx = self.paths.len();
                self.paths.push(dir.to_path_buf());
                self.path_index.insert(dir.to_path_buf(), idx);
                idx
            }
        };
        self.last = Some(idx);
        idx
    }

    pub fn dir(&self, idx: usize) -> &Path {
        &self.paths[idx]
    }

    pub fn full_path(&self, idx: usize, name: &OsStr) -> PathBuf {
        self.dir(idx).join(name)
    }

    /// Names in sorted order with their prefix indices in traversal order.
    pub fn files(&self) -> impl Iterator<Item = (&OsStr, &[usize])> {
        self.files
            .iter()
            .map(|(name, idxs)| (name.as_os_str(), idxs.as_slice()))
    }

    pub fn locations(&self, name: &OsStr) -> Option<&[usize]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn dir_count(&self) -> usize {
        self.paths.len()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }
}
