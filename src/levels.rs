//! Depth-synchronized walk of two directory trees.
//!
//! Each level enumerates the same relative directories under both roots,
//! compares the union of the files found there by relative name, then moves
//! on to the union of the accepted subdirectories.

use anyhow::{Result, bail};
use log::{debug, info};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::hasher::{self, file_length};
use crate::output::Reporter;
use crate::pool::{HashJob, HashPool, HashResult};
use crate::utils::Cancel;

/// Files and subdirectories found at one level, relative to the roots.
#[derive(Debug, Default)]
pub struct LevelEntries {
    pub files: BTreeSet<PathBuf>,
    pub dirs: BTreeSet<PathBuf>,
}

pub struct LevelWalker<'a> {
    config: &'a Config,
    first: &'a Path,
    second: &'a Path,
    cancel: Cancel,
    pool: Option<HashPool>,
}

impl<'a> LevelWalker<'a> {
    pub fn new(config: &'a Config, roots: &'a [PathBuf], cancel: Cancel) -> Result<Self> {
        let [first, second] = roots else {
            bail!("Level scan needs exactly two roots, got {}", roots.len());
        };
        let pool = if config.use_threads {
            Some(HashPool::new(config.jobs, cancel.clone())?)
        } else {
            None
        };
        Ok(Self {
            config,
            first,
            second,
            cancel,
            pool,
        })
    }

    /// Walks level by level until no subdirectories remain or the scan is
    /// cancelled. Returns the number of levels descended.
    pub fn run<W: Write>(&mut self, reporter: &mut Reporter<'_, W>) -> Result<usize> {
        let mut frontier = BTreeSet::from([PathBuf::new()]);
        let mut level = 0;
        while !self.cancel.is_cancelled()
            && self.find_duplicates(level, &mut frontier, reporter)?
        {
            level += 1;
        }
        self.done(reporter)?;
        Ok(level)
    }

    /// Compares the files of one level and replaces `frontier` with the next
    /// level's directories. Returns false when there is nothing left to scan.
    pub fn find_duplicates<W: Write>(
        &mut self,
        level: usize,
        frontier: &mut BTreeSet<PathBuf>,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<bool> {
        let Some(entries) = self.scan_level(level, frontier, reporter) else {
            frontier.clear();
            return Ok(false);
        };
        self.compare_files(&entries.files, reporter)?;
        *frontier = entries.dirs;
        Ok(!frontier.is_empty())
    }

    /// Folds any outstanding hash results. Must be called before the final
    /// counts are read.
    pub fn done<W: Write>(&mut self, reporter: &mut Reporter<'_, W>) -> Result<()> {
        if let Some(pool) = self.pool.as_mut() {
            debug!("Waiting on {} outstanding hash jobs", pool.pending());
            for result in pool.wait() {
                self.fold_result(result, reporter)?;
            }
        }
        Ok(())
    }

    /// Enumerates every frontier directory under both roots. `None` when the
    /// scan was cancelled part way.
    pub fn scan_level<W: Write>(
        &self,
        level: usize,
        frontier: &BTreeSet<PathBuf>,
        reporter: &mut Reporter<'_, W>,
    ) -> Option<LevelEntries> {
        let mut entries = LevelEntries::default();

        for rel in frontier {
            for root in [self.first, self.second] {
                let dir = root.join(rel);
                let listing = WalkDir::new(&dir)
                    .min_depth(1)
                    .max_depth(1)
                    .sort_by_file_name();

                for entry in listing {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let entry = match entry {
                        Ok(e) => e,
                        Err(e) => {
                            debug!("Level {}: {}", level, e);
                            continue;
                        }
                    };
                    let name = entry.file_name().to_string_lossy();
                    let full = entry.path().to_string_lossy();
                    if !self.config.filter.accepts(&name, &full) {
                        reporter.skipped();
                        continue;
                    }
                    let rel_entry = rel.join(entry.file_name());
                    if entry.file_type().is_dir() {
                        entries.dirs.insert(rel_entry);
                    } else {
                        entries.files.insert(rel_entry);
                    }
                }
            }
        }

        if self.cancel.is_cancelled() {
            return None;
        }
        Some(entries)
    }

    fn compare_files<W: Write>(
        &mut self,
        files: &BTreeSet<PathBuf>,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        for rel in files {
            if self.cancel.is_cancelled() {
                break;
            }
            let first = self.first.join(rel);
            let second = self.second.join(rel);
            let len1 = file_length(&first);
            let len2 = file_length(&second);
            info!("{} len={:?}", first.display(), len1);
            info!("{} len={:?}", second.display(), len2);

            if self.config.just_name {
                if len1.is_some() && len1 == len2 {
                    reporter.duplicate(&first, &second)?;
                    reporter.delete_pair(&first, &second);
                } else if len1.is_some() && len2.is_some() {
                    reporter.different(&first, &second)?;
                } else {
                    reporter.missing(&first, len1.is_some(), &second, len2.is_some())?;
                }
                continue;
            }

            if len1 != len2 {
                if len1.is_some() && len2.is_some() {
                    reporter.different(&first, &second)?;
                } else {
                    reporter.missing(&first, len1.is_some(), &second, len2.is_some())?;
                }
                continue;
            }

            match self.pool.as_mut() {
                Some(pool) => {
                    pool.submit(HashJob {
                        name: rel.clone(),
                        paths: vec![first, second],
                    })?;
                    let ready = pool.ready();
                    for result in ready {
                        self.fold_result(result, reporter)?;
                    }
                }
                None => {
                    let digest1 = hasher::compute(&first);
                    let digest2 = hasher::compute(&second);
                    self.classify_digests(&first, digest1, &second, digest2, reporter)?;
                }
            }
        }
        Ok(())
    }

    fn fold_result<W: Write>(
        &self,
        result: HashResult,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        let [(first, digest1), (second, digest2)] = result.digests.as_slice() else {
            debug!("Discarding malformed hash result for {}", result.name.display());
            return Ok(());
        };
        self.classify_digests(first, *digest1, second, *digest2, reporter)
    }

    fn classify_digests<W: Write>(
        &self,
        first: &Path,
        digest1: Option<u64>,
        second: &Path,
        digest2: Option<u64>,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        if let Some(d) = digest1 {
            info!("{} hash={:016x}", first.display(), d);
        }
        if let Some(d) = digest2 {
            info!("{} hash={:016x}", second.display(), d);
        }

        match (digest1, digest2) {
            (Some(a), Some(b)) if a == b => {
                reporter.duplicate(first, second)?;
                reporter.delete_pair(first, second);
            }
            (Some(_), Some(_)) => reporter.different(first, second)?,
            // Unreadable files are reported as missing rather than matched.
            (a, b) => reporter.missing(first, a.is_some(), second, b.is_some())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Side;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn roots() -> (TempDir, Vec<PathBuf>) {
        let base = tempdir().unwrap();
        let dir1 = base.path().join("dir1");
        let dir2 = base.path().join("dir2");
        fs::create_dir(&dir1).unwrap();
        fs::create_dir(&dir2).unwrap();
        (base, vec![dir1, dir2])
    }

    fn scan(config: &Config, roots: &[PathBuf]) -> (crate::statistics::Counters, String, usize) {
        let mut reporter = Reporter::new(config, Vec::new());
        let mut walker = LevelWalker::new(config, roots, Cancel::new()).unwrap();
        let levels = walker.run(&mut reporter).unwrap();
        let counters = *reporter.counters();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        (counters, out, levels)
    }

    #[test]
    fn test_identical_files_are_duplicates() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "hello").unwrap();

        let config = Config::default();
        let (counters, out, _) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert_eq!(counters.diff, 0);
        assert_eq!(
            out,
            format!(
                "== {}, {}\n",
                roots[0].join("a.txt").display(),
                roots[1].join("a.txt").display()
            )
        );
    }

    #[test]
    fn test_same_length_different_content() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "world").unwrap();

        let config = Config {
            show_diff: true,
            ..Default::default()
        };
        let (counters, out, _) = scan(&config, &roots);
        assert_eq!(counters.diff, 1);
        assert_eq!(counters.same, 0);
        assert_eq!(counters.miss, 0);
        assert!(out.starts_with("!= "));
    }

    #[test]
    fn test_missing_in_second_root() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();

        let config = Config {
            show_miss: true,
            ..Default::default()
        };
        let (counters, out, _) = scan(&config, &roots);
        assert_eq!(counters.miss, 1);
        assert_eq!(out, format!("-- {}\n", roots[0].join("a.txt").display()));
    }

    #[test]
    fn test_nested_levels_and_missing_subdir() {
        let (_base, roots) = roots();
        for root in &roots {
            fs::create_dir_all(root.join("sub/deeper")).unwrap();
            fs::write(root.join("sub/deeper/x.bin"), "same").unwrap();
        }
        fs::create_dir(roots[0].join("only1")).unwrap();
        fs::write(roots[0].join("only1/y.bin"), "y").unwrap();

        let config = Config::default();
        let (counters, _, levels) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert_eq!(counters.miss, 1);
        assert_eq!(levels, 2);
    }

    #[test]
    fn test_just_name_compares_lengths_only() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "world").unwrap();
        fs::write(roots[0].join("b.txt"), "short").unwrap();
        fs::write(roots[1].join("b.txt"), "much longer").unwrap();

        let config = Config {
            just_name: true,
            ..Default::default()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert_eq!(counters.diff, 1);
    }

    #[test]
    fn test_filtered_entries_are_skipped() {
        let (_base, roots) = roots();
        for root in &roots {
            fs::write(root.join("keep.txt"), "k").unwrap();
            fs::write(root.join("drop.log"), "d").unwrap();
            fs::create_dir(root.join(".git")).unwrap();
            fs::write(root.join(".git/HEAD"), "ref").unwrap();
        }
        let config = Config {
            filter: crate::matcher::PathFilter {
                exclude_file: vec![
                    crate::matcher::compile_pattern("*.log", false).unwrap(),
                    crate::matcher::compile_pattern(".git", false).unwrap(),
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        let (counters, _, levels) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert_eq!(counters.skip, 4);
        assert_eq!(levels, 0);
    }

    #[test]
    fn test_threaded_hashing_matches_sync() {
        let (_base, roots) = roots();
        for i in 0..30 {
            fs::write(roots[0].join(format!("f{i:02}")), format!("{i:04}")).unwrap();
            let other = if i % 3 == 0 { 9999 } else { i };
            fs::write(roots[1].join(format!("f{i:02}")), format!("{other:04}")).unwrap();
        }

        let sync = Config {
            show_diff: true,
            ..Default::default()
        };
        let threaded = Config {
            use_threads: true,
            jobs: 4,
            ..sync.clone()
        };
        let (c1, out1, _) = scan(&sync, &roots);
        let (c2, out2, _) = scan(&threaded, &roots);
        assert_eq!(c1, c2);
        assert_eq!(c1.same, 20);
        assert_eq!(c1.diff, 10);
        assert_eq!(out1, out2);
    }

    #[test]
    fn test_delete_second_on_duplicate() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "hello").unwrap();

        let config = Config {
            delete_side: Some(Side::Second),
            ..Default::default()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert!(roots[0].join("a.txt").exists());
        assert!(!roots[1].join("a.txt").exists());
    }

    #[test]
    fn test_delete_applies_to_name_only_duplicates() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "world").unwrap();
        fs::write(roots[0].join("b.txt"), "short").unwrap();
        fs::write(roots[1].join("b.txt"), "much longer").unwrap();

        let config = Config {
            just_name: true,
            delete_side: Some(Side::First),
            ..Default::default()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.same, 1);
        assert!(!roots[0].join("a.txt").exists());
        assert!(roots[1].join("a.txt").exists());
        // differing lengths are never deleted
        assert!(roots[0].join("b.txt").exists());
    }

    #[test]
    fn test_counts_cover_every_pair_and_skip() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "hello").unwrap();
        fs::write(roots[0].join("b.txt"), "x").unwrap();
        fs::write(roots[1].join("b.txt"), "yy").unwrap();
        fs::write(roots[1].join("c.txt"), "only here").unwrap();
        fs::write(roots[0].join("skip.log"), "s").unwrap();
        fs::write(roots[1].join("skip.log"), "s").unwrap();

        let config = Config {
            filter: crate::matcher::PathFilter {
                exclude_file: vec![crate::matcher::compile_pattern("*.log", false).unwrap()],
                ..Default::default()
            },
            ..Default::default()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(
            (counters.same, counters.diff, counters.miss, counters.skip),
            (1, 1, 1, 2)
        );
        // three compared names plus one rejected entry per root
        assert_eq!(counters.total(), 5);
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let (_base, roots) = roots();
        fs::write(roots[0].join("a.txt"), "hello").unwrap();
        fs::write(roots[1].join("a.txt"), "hello").unwrap();

        let config = Config::default();
        let cancel = Cancel::new();
        cancel.cancel();
        let mut reporter = Reporter::new(&config, Vec::new());
        let mut walker = LevelWalker::new(&config, &roots, cancel).unwrap();
        let mut frontier = BTreeSet::from([PathBuf::new()]);
        assert!(!walker.find_duplicates(0, &mut frontier, &mut reporter).unwrap());
        assert!(frontier.is_empty());
        assert_eq!(reporter.counters().total(), 0);
    }

    #[test]
    fn test_requires_two_roots() {
        let config = Config::default();
        let roots = vec![PathBuf::from("a")];
        assert!(LevelWalker::new(&config, &roots, Cancel::new()).is_err());
    }
}
