//! Duplicate detection over the files collected by a flat scan.

use anyhow::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{Config, Mode};
use crate::hasher::{self, file_length, path_key};
use crate::interner::ScanSession;
use crate::output::Reporter;
use crate::statistics::GroupKind;
use crate::utils::Cancel;

pub struct Classifier<'a> {
    config: &'a Config,
    cancel: &'a Cancel,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config, cancel: &'a Cancel) -> Self {
        Self { config, cancel }
    }

    pub fn classify<W: Write>(
        &self,
        session: &ScanSession,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        match self.config.mode() {
            Mode::IgnoreExtension => self.by_stem(session, reporter),
            Mode::NameOnly => self.by_name(session, reporter),
            Mode::SameNameHash => self.same_name_by_hash(session, reporter),
            Mode::GlobalCompare => self.global_compare(session, reporter),
        }
    }

    /// Names equal once the extension is removed.
    fn by_stem<W: Write>(&self, session: &ScanSession, reporter: &mut Reporter<'_, W>) -> Result<()> {
        let mut stems: BTreeMap<OsString, Vec<PathBuf>> = BTreeMap::new();
        for (name, idxs) in session.files() {
            stems
                .entry(strip_extension(name))
                .or_default()
                .extend(idxs.iter().map(|&idx| session.full_path(idx, name)));
        }

        for members in stems.values() {
            if self.cancel.is_cancelled() {
                break;
            }
            if members.len() < 2 {
                continue;
            }
            reporter.add_same(members.len() - 1);
            self.emit_name_group(members, reporter)?;
        }
        Ok(())
    }

    /// Exact name seen in more than one directory.
    fn by_name<W: Write>(&self, session: &ScanSession, reporter: &mut Reporter<'_, W>) -> Result<()> {
        for (name, idxs) in session.files() {
            if self.cancel.is_cancelled() {
                break;
            }
            if idxs.len() < 2 {
                continue;
            }
            reporter.add_same(idxs.len() - 1);
            let members = member_paths(session, name);
            self.emit_name_group(&members, reporter)?;
        }
        Ok(())
    }

    fn emit_name_group<W: Write>(
        &self,
        members: &[PathBuf],
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        if self.config.verbose {
            for path in members {
                reporter.detail("", path)?;
            }
        }
        self.emit(GroupKind::Duplicate, "", None, members, self.config.show_same, reporter)?;
        for path in members {
            reporter.delete_if_matches(path);
        }
        Ok(())
    }

    /// Files sharing a name, bucketed by content hash within that name.
    fn same_name_by_hash<W: Write>(
        &self,
        session: &ScanSession,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        let templates = &self.config.templates;
        let invert = self.config.invert;

        for (name, idxs) in session.files() {
            if self.cancel.is_cancelled() {
                break;
            }
            if idxs.len() < 2 {
                if invert {
                    let members = member_paths(session, name);
                    self.emit(GroupKind::Unique, "", None, &members, true, reporter)?;
                }
                continue;
            }

            let paths = member_paths(session, name);
            let digests = self.hash_all(&paths);
            let mut counts: HashMap<u64, usize> = HashMap::new();
            for digest in digests.iter().flatten() {
                *counts.entry(*digest).or_default() += 1;
            }

            // Buckets keep the order in which each digest was first seen.
            let mut buckets: Vec<(u64, Vec<PathBuf>)> = Vec::new();
            let mut uniques: Vec<(u64, PathBuf)> = Vec::new();
            for (path, digest) in paths.into_iter().zip(digests) {
                let Some(digest) = digest else {
                    reporter.unreadable(&path)?;
                    continue;
                };
                let is_dup = counts[&digest] > 1;
                if self.config.verbose {
                    let pre = if is_dup { &templates.pre_dup } else { &templates.pre_diff };
                    reporter.detail(&format!("{}{:016x} ", pre, digest), &path)?;
                }
                if !is_dup {
                    uniques.push((digest, path));
                } else if let Some((_, members)) = buckets.iter_mut().find(|(d, _)| *d == digest) {
                    members.push(path);
                } else {
                    buckets.push((digest, vec![path]));
                }
            }

            for (digest, members) in &buckets {
                reporter.add_same(members.len());
                let show = self.config.show_same && !invert;
                self.emit(GroupKind::Duplicate, "", Some(*digest), members, show, reporter)?;
                for path in members {
                    reporter.delete_if_matches(path);
                }
            }
            for (digest, path) in uniques {
                reporter.add_diff(1);
                let members = [path];
                if invert {
                    self.emit(GroupKind::Unique, "", Some(digest), &members, true, reporter)?;
                } else {
                    self.emit(GroupKind::Different, &templates.pre_diff, Some(digest), &members, self.config.show_diff, reporter)?;
                }
            }
        }
        Ok(())
    }

    /// Every file against every other: bucket by length, then by content hash.
    fn global_compare<W: Write>(
        &self,
        session: &ScanSession,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        let invert = self.config.invert;

        let mut by_length: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
        for (name, idxs) in session.files() {
            for &idx in idxs {
                let path = session.full_path(idx, name);
                let key = match file_length(&path) {
                    Some(0) => path_key(&path),
                    Some(len) => len,
                    None => {
                        reporter.unreadable(&path)?;
                        continue;
                    }
                };
                by_length.entry(key).or_default().push(path);
            }
        }

        let mut by_digest: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
        for bucket in by_length.values() {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if (bucket.len() > 1) == invert {
                continue;
            }
            let digests = self.hash_all(bucket);
            for (path, digest) in bucket.iter().zip(digests) {
                match digest {
                    Some(digest) => by_digest.entry(digest).or_default().push(path.clone()),
                    None => reporter.unreadable(path)?,
                }
            }
        }

        let templates = &self.config.templates;
        for (digest, members) in &by_digest {
            if self.cancel.is_cancelled() {
                break;
            }
            if (members.len() > 1) == invert {
                if !invert {
                    // Same length as another file but different content.
                    reporter.add_diff(1);
                    self.emit(GroupKind::Different, &templates.pre_diff, Some(*digest), members, self.config.show_diff, reporter)?;
                }
                continue;
            }

            reporter.add_same(members.len() - 1);
            if self.config.verbose {
                let prefix = format!("{} Hash {:016x} ", members.len(), digest);
                for path in members {
                    reporter.detail(&prefix, path)?;
                }
            }
            let kind = if invert {
                GroupKind::Unique
            } else {
                GroupKind::Duplicate
            };
            self.emit(kind, &templates.pre_dup, Some(*digest), members, self.config.show_same, reporter)?;
            for path in members {
                reporter.delete_if_matches(path);
            }
        }
        Ok(())
    }

    fn hash_all(&self, paths: &[PathBuf]) -> Vec<Option<u64>> {
        if self.config.use_threads {
            paths.par_iter().map(|p| hasher::compute(p)).collect()
        } else {
            paths.iter().map(|p| hasher::compute(p)).collect()
        }
    }

    /// Writes a group unless it is hidden or already listed in verbose form.
    fn emit<W: Write>(
        &self,
        kind: GroupKind,
        prefix: &str,
        digest: Option<u64>,
        members: &[PathBuf],
        visible: bool,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        if visible && !self.config.verbose {
            reporter.group(kind, prefix, digest, members)
        } else {
            reporter.record_only(kind, digest, members);
            Ok(())
        }
    }
}

fn member_paths(session: &ScanSession, name: &OsStr) -> Vec<PathBuf> {
    session
        .locations(name)
        .unwrap_or_default()
        .iter()
        .map(|&idx| session.full_path(idx, name))
        .collect()
}

fn strip_extension(name: &OsStr) -> OsString {
    Path::new(name).file_stem().unwrap_or(name).to_os_string()
}
