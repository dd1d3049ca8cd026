use anyhow::Result;
use indicatif::ProgressBar;
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::interner::ScanSession;
use crate::levels::LevelWalker;
use crate::output::Reporter;
use crate::utils::{Cancel, validate_root};

/// Adds every accepted file under `root` to the session. A root that is a
/// plain file is considered on its own. Returns the number of files added.
pub fn inspect_files<W: Write>(
    root: &Path,
    session: &mut ScanSession,
    config: &Config,
    reporter: &mut Reporter<'_, W>,
    cancel: &Cancel,
    progress: &ProgressBar,
) -> Result<usize> {
    if root.is_file() {
        return Ok(usize::from(add_file(root, session, config, reporter)));
    }

    let mut added: usize = 0;
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        if cancel.is_cancelled() {
            break;
        }

        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        if add_file(entry.path(), session, config, reporter) {
            added += 1;
            if added.is_multiple_of(1000) {
                progress.set_message(format!("Checked {} files...", session.file_count()));
            }
        }
    }

    Ok(added)
}

fn add_file<W: Write>(
    path: &Path,
    session: &mut ScanSession,
    config: &Config,
    reporter: &mut Reporter<'_, W>,
) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if !config.filter.accepts(&name, &path.to_string_lossy()) {
        reporter.skipped();
        return false;
    }
    session.add(path)
}

/// Runs one scan over `roots` and returns the number of levels descended.
///
/// Two directories are compared level by level. Any other combination is
/// walked flat into a single session and handed to the classifier.
pub fn run_scan<W: Write>(
    config: &Config,
    roots: &[PathBuf],
    reporter: &mut Reporter<'_, W>,
    cancel: &Cancel,
    progress: &ProgressBar,
) -> Result<usize> {
    if config.use_levelwise(roots.len()) {
        for root in roots {
            if let Err(e) = validate_root(root) {
                error!("{:#}", e);
                return Ok(0);
            }
        }
        info!(
            "Comparing {} and {} level by level",
            roots[0].display(),
            roots[1].display()
        );
        let mut walker = LevelWalker::new(config, roots, cancel.clone())?;
        return walker.run(reporter);
    }

    let mut session = ScanSession::new();
    for root in roots {
        if cancel.is_cancelled() {
            break;
        }
        if let Err(e) = validate_root(root) {
            error!("{:#}", e);
            continue;
        }
        match inspect_files(root, &mut session, config, reporter, cancel, progress) {
            Ok(count) => {
                if config.quiet == 0 {
                    eprintln!("  Files checked={}", count);
                }
            }
            Err(e) => error!("Failed to scan {}: {:#}", root.display(), e),
        }
    }
    progress.finish_and_clear();

    info!(
        "Classifying {} files from {} directories as {:?}",
        session.file_count(),
        session.dir_count(),
        config.mode()
    );
    Classifier::new(config, cancel).classify(&session, reporter)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{PathFilter, compile_pattern};
    use crate::statistics::Counters;
    use std::fs;
    use tempfile::tempdir;

    fn scan(config: &Config, roots: &[PathBuf]) -> (Counters, String, usize) {
        let mut reporter = Reporter::new(config, Vec::new());
        let levels = run_scan(
            config,
            roots,
            &mut reporter,
            &Cancel::new(),
            &ProgressBar::hidden(),
        )
        .unwrap();
        let counters = *reporter.counters();
        (counters, String::from_utf8(reporter.into_inner()).unwrap(), levels)
    }

    fn quiet_config() -> Config {
        Config {
            quiet: 1,
            show_same: false,
            ..Default::default()
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_two_roots_duplicate_pair() {
        let base = tempdir().unwrap();
        let roots = vec![base.path().join("dir1"), base.path().join("dir2")];
        write(&roots[0].join("a.txt"), "hello");
        write(&roots[1].join("a.txt"), "hello");

        let (counters, out, levels) = scan(&Config::default(), &roots);
        assert_eq!(counters.same, 1);
        assert_eq!(counters.total(), 1);
        assert_eq!(levels, 0);
        assert!(out.starts_with("== "));
    }

    #[test]
    fn test_two_roots_different_and_missing() {
        let base = tempdir().unwrap();
        let roots = vec![base.path().join("dir1"), base.path().join("dir2")];
        write(&roots[0].join("a.txt"), "hello");
        write(&roots[1].join("a.txt"), "HELLO");
        write(&roots[0].join("only.txt"), "x");
        write(&roots[1].join("other.txt"), "y");

        let config = Config {
            show_diff: true,
            show_miss: true,
            ..Default::default()
        };
        let (counters, out, _) = scan(&config, &roots);
        assert_eq!(counters.diff, 1);
        assert_eq!(counters.miss, 2);
        assert_eq!(counters.same, 0);
        assert!(out.contains("!= "));
        assert_eq!(out.matches("-- ").count(), 2);
    }

    #[test]
    fn test_three_roots_use_global_compare() {
        let base = tempdir().unwrap();
        let roots: Vec<PathBuf> = ["d1", "d2", "d3"]
            .iter()
            .map(|d| base.path().join(d))
            .collect();
        for root in &roots {
            write(&root.join("x.txt"), "identical");
        }

        let (counters, out, levels) = scan(&quiet_config(), &roots);
        assert_eq!(levels, 0);
        assert_eq!(counters.same, 2);
        // hidden groups are still counted
        assert!(out.is_empty());

        let (_, out, _) = scan(&Config::default(), &roots);
        assert_eq!(out.lines().count(), 1);
        assert_eq!(out.matches("x.txt").count(), 3);
    }

    #[test]
    fn test_ignore_extension_two_roots_flat() {
        let base = tempdir().unwrap();
        let roots = vec![base.path().join("dir1"), base.path().join("dir2")];
        write(&roots[0].join("report.txt"), "one");
        write(&roots[1].join("report.csv"), "two");

        let config = Config {
            just_name: true,
            ignore_extn: true,
            ..Default::default()
        };
        let (counters, out, levels) = scan(&config, &roots);
        assert_eq!(levels, 0);
        assert_eq!(counters.same, 1);
        assert!(out.contains("report.txt") && out.contains("report.csv"));
    }

    #[test]
    fn test_same_name_mode_walks_flat() {
        let base = tempdir().unwrap();
        let roots = vec![base.path().join("dir1"), base.path().join("dir2")];
        write(&roots[0].join("deep/nested/a.bin"), "content");
        write(&roots[1].join("a.bin"), "content");

        let config = Config {
            same_name: true,
            ..Default::default()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.same, 2);
    }

    #[test]
    fn test_single_file_roots() {
        let base = tempdir().unwrap();
        let a = base.path().join("a.dat");
        let b = base.path().join("b.dat");
        let c = base.path().join("c.dat");
        write(&a, "same");
        write(&b, "same");
        write(&c, "same");

        let (counters, _, _) = scan(&Config::default(), &[a, b, c]);
        assert_eq!(counters.same, 2);
    }

    #[test]
    fn test_invalid_root_is_skipped() {
        let base = tempdir().unwrap();
        let good1 = base.path().join("g1");
        let good2 = base.path().join("g2");
        write(&good1.join("f"), "data");
        write(&good2.join("f"), "data");
        let roots = vec![good1, base.path().join("missing"), good2];

        let (counters, _, _) = scan(&quiet_config(), &roots);
        assert_eq!(counters.same, 1);
    }

    #[test]
    fn test_invalid_root_stops_level_scan() {
        let base = tempdir().unwrap();
        let roots = vec![base.path().join("dir1"), base.path().join("missing")];
        write(&roots[0].join("a"), "x");

        let (counters, out, levels) = scan(&Config::default(), &roots);
        assert_eq!(levels, 0);
        assert_eq!(counters.total(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_filter_counts_skipped_files() {
        let base = tempdir().unwrap();
        let roots: Vec<PathBuf> = ["d1", "d2", "d3"]
            .iter()
            .map(|d| base.path().join(d))
            .collect();
        for root in &roots {
            write(&root.join("keep.txt"), "same");
            write(&root.join("drop.log"), "same");
        }

        let config = Config {
            filter: PathFilter {
                exclude_file: vec![compile_pattern("*.log", false).unwrap()],
                ..Default::default()
            },
            ..quiet_config()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.skip, 3);
        assert_eq!(counters.same, 2);
    }

    #[test]
    fn test_flat_counts_cover_every_unit() {
        let base = tempdir().unwrap();
        let roots: Vec<PathBuf> = ["d1", "d2", "d3"]
            .iter()
            .map(|d| base.path().join(d))
            .collect();
        for root in &roots {
            write(&root.join("keep.txt"), "same");
            write(&root.join("drop.log"), "same");
        }
        write(&roots[0].join("a.bin"), "xxxxxx");
        write(&roots[1].join("b.bin"), "yyyyyy");
        write(&roots[2].join("lonely.bin"), "a length nobody else has");

        let config = Config {
            filter: PathFilter {
                exclude_file: vec![compile_pattern("*.log", false).unwrap()],
                ..Default::default()
            },
            ..quiet_config()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(
            (counters.same, counters.diff, counters.miss, counters.skip),
            (2, 2, 0, 3)
        );
        // groups add n-1 and a file with a length nobody shares adds nothing
        assert_eq!(counters.total(), 7);
    }

    #[test]
    fn test_delete_pattern_dry_run_keeps_files() {
        let base = tempdir().unwrap();
        let roots: Vec<PathBuf> = ["keep", "trash", "other"]
            .iter()
            .map(|d| base.path().join(d))
            .collect();
        for root in &roots {
            write(&root.join("x.txt"), "dup");
        }

        let config = Config {
            delete_patterns: vec![compile_pattern("*trash*", false).unwrap()],
            dry_run: true,
            ..quiet_config()
        };
        let (counters, _, _) = scan(&config, &roots);
        assert_eq!(counters.same, 2);
        assert_eq!(counters.delete_errors, 0);
        assert!(roots[1].join("x.txt").exists());
    }

    #[test]
    fn test_inspect_counts_added_files() {
        let base = tempdir().unwrap();
        write(&base.path().join("a/1"), "x");
        write(&base.path().join("a/b/2"), "y");
        write(&base.path().join("c/3"), "z");

        let config = Config::default();
        let mut session = ScanSession::new();
        let mut reporter = Reporter::new(&config, Vec::new());
        let added = inspect_files(
            base.path(),
            &mut session,
            &config,
            &mut reporter,
            &Cancel::new(),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(added, 3);
        assert_eq!(session.file_count(), 3);
        assert_eq!(session.dir_count(), 3);
    }
}
