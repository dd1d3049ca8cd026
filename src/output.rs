use anyhow::{Context, Result};
use humansize::{DECIMAL, format_size};
use log::warn;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::actions::delete_file;
use crate::args::Side;
use crate::config::Config;
use crate::matcher::file_matches;
use crate::statistics::{Counters, GroupKind, ReportGroup, ScanResults};

/// Collects counts and writes formatted results for one scan.
pub struct Reporter<'a, W: Write> {
    config: &'a Config,
    out: W,
    counters: Counters,
    groups: Vec<ReportGroup>,
}

impl<'a, W: Write> Reporter<'a, W> {
    pub fn new(config: &'a Config, out: W) -> Self {
        Self {
            config,
            out,
            counters: Counters::default(),
            groups: Vec::new(),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn skipped(&mut self) {
        self.counters.skip += 1;
    }

    pub fn add_same(&mut self, count: usize) {
        self.counters.same += count;
    }

    pub fn add_diff(&mut self, count: usize) {
        self.counters.diff += count;
    }

    /// Two files with equal content.
    pub fn duplicate(&mut self, first: &Path, second: &Path) -> Result<()> {
        self.counters.same += 1;
        if self.config.show_same {
            let prefix = self.config.templates.pre_dup.clone();
            self.write_pair(&prefix, first, second)?;
        }
        self.record(GroupKind::Duplicate, None, &[first, second]);
        Ok(())
    }

    /// Two files present under both roots whose content differs.
    pub fn different(&mut self, first: &Path, second: &Path) -> Result<()> {
        self.counters.diff += 1;
        if self.config.show_diff {
            let prefix = self.config.templates.pre_diff.clone();
            self.write_pair(&prefix, first, second)?;
        }
        self.record(GroupKind::Different, None, &[first, second]);
        Ok(())
    }

    /// A file present under only one of the roots.
    pub fn missing(
        &mut self,
        first: &Path,
        have_first: bool,
        second: &Path,
        _have_second: bool,
    ) -> Result<()> {
        self.counters.miss += 1;
        let present = if have_first != self.config.invert {
            first
        } else {
            second
        };
        if self.config.show_miss {
            let templates = &self.config.templates;
            write!(
                self.out,
                "{}{}{}",
                templates.pre_miss,
                self.config.display(present),
                templates.post_divider
            )?;
        }
        self.record(GroupKind::Missing, None, &[present]);
        Ok(())
    }

    /// A file that was listed but could not be read for hashing.
    pub fn unreadable(&mut self, path: &Path) -> Result<()> {
        self.counters.miss += 1;
        if self.config.show_miss {
            let templates = &self.config.templates;
            write!(
                self.out,
                "{}{}{}",
                templates.pre_miss,
                self.config.display(path),
                templates.post_divider
            )?;
        }
        self.record(GroupKind::Missing, None, &[path]);
        Ok(())
    }

    /// Writes one group of files joined by the separator, wrapped in the
    /// pre and post dividers.
    pub fn group(
        &mut self,
        kind: GroupKind,
        prefix: &str,
        digest: Option<u64>,
        members: &[PathBuf],
    ) -> Result<()> {
        let templates = &self.config.templates;
        write!(self.out, "{}{}", templates.pre_divider, prefix)?;
        for (idx, path) in members.iter().enumerate() {
            if idx != 0 {
                write!(self.out, "{}", templates.separator)?;
            }
            write!(self.out, "{}", self.config.display(path))?;
        }
        write!(self.out, "{}", templates.post_divider)?;

        let refs: Vec<&Path> = members.iter().map(PathBuf::as_path).collect();
        self.record(kind, digest, &refs);
        Ok(())
    }

    /// Verbose listing line: prefix, size, modification time and path.
    pub fn detail(&mut self, prefix: &str, path: &Path) -> Result<()> {
        writeln!(
            self.out,
            "{}{}",
            prefix,
            describe_file(path, &self.config.display(path))
        )?;
        Ok(())
    }

    /// Records a verbose-listed group for the JSON report without writing it.
    pub fn record_only(&mut self, kind: GroupKind, digest: Option<u64>, members: &[PathBuf]) {
        let refs: Vec<&Path> = members.iter().map(PathBuf::as_path).collect();
        self.record(kind, digest, &refs);
    }

    /// Best effort delete; failures are logged and counted.
    pub fn delete(&mut self, path: &Path) {
        if let Err(e) = delete_file(path, self.config.dry_run) {
            warn!("{:#}", e);
            self.counters.delete_errors += 1;
        }
    }

    /// Deletes a duplicate if its path matches a delete pattern.
    pub fn delete_if_matches(&mut self, path: &Path) {
        let shown = self.config.display(path);
        if file_matches(&shown, &self.config.delete_patterns, false) {
            self.delete(path);
        }
    }

    /// Deletes the side(s) of a duplicate pair selected by `--delete`.
    pub fn delete_pair(&mut self, first: &Path, second: &Path) {
        match self.config.delete_side {
            None => {}
            Some(Side::First) => self.delete(first),
            Some(Side::Second) => self.delete(second),
            Some(Side::Both) => {
                self.delete(first);
                self.delete(second);
            }
        }
    }

    pub fn finish(mut self) -> Result<(Counters, Vec<ReportGroup>)> {
        self.out.flush().context("Failed to flush output")?;
        Ok((self.counters, self.groups))
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_pair(&mut self, prefix: &str, first: &Path, second: &Path) -> Result<()> {
        let side = self.config.show_side;
        let templates = &self.config.templates;
        write!(self.out, "{}{}", templates.pre_divider, prefix)?;
        if side != Side::Second {
            write!(self.out, "{}", self.config.display(first))?;
        }
        if side == Side::Both {
            write!(self.out, "{}", templates.separator)?;
        }
        if side != Side::First {
            write!(self.out, "{}", self.config.display(second))?;
        }
        write!(self.out, "{}", templates.post_divider)?;
        Ok(())
    }

    fn record(&mut self, kind: GroupKind, digest: Option<u64>, members: &[&Path]) {
        if !self.config.record_groups {
            return;
        }
        self.groups.push(ReportGroup {
            kind,
            digest: digest.map(|d| format!("{:016x}", d)),
            files: members.iter().map(|p| self.config.display(p)).collect(),
        });
    }
}

/// Size, modification time (seconds since the epoch) and display path.
pub fn describe_file(path: &Path, shown: &str) -> String {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!(
                "{:>10} {:>12} {}",
                format_size(meta.len(), DECIMAL),
                modified,
                shown
            )
        }
        Err(_) => format!("{:>10} {:>12} {}", "?", "?", shown),
    }
}

pub fn save_results_json(path: &Path, results: &ScanResults) -> Result<()> {
    let json =
        serde_json::to_string_pretty(results).context("Failed to serialize results to JSON")?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON output")?;

    Ok(())
}
