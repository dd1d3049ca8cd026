use regex::Regex;
use std::path::{Path, PathBuf};

use crate::args::{Args, Side};
use crate::matcher::{PathFilter, compile_pattern};
use crate::utils::convert_special_chars;

/// Comparison used by the flat (non level-synchronized) scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Group by file name with the extension removed.
    IgnoreExtension,
    /// Group by exact file name.
    NameOnly,
    /// Files sharing a name are compared by hash.
    SameNameHash,
    /// All files compared by length, then hash.
    GlobalCompare,
}

#[derive(Debug, Clone)]
pub struct Templates {
    pub separator: String,
    pub pre_divider: String,
    pub post_divider: String,
    pub pre_dup: String,
    pub pre_diff: String,
    pub pre_miss: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            pre_dup: "== ".to_string(),
            pre_diff: "!= ".to_string(),
            pre_miss: "-- ".to_string(),
        }
    }
}

/// Runtime options, built once from the command line and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub filter: PathFilter,
    pub delete_patterns: Vec<Regex>,

    pub show_same: bool,
    pub show_diff: bool,
    pub show_miss: bool,
    pub invert: bool,
    pub verbose: bool,
    pub quiet: u8,
    pub show_abs: bool,
    pub show_side: Side,

    pub just_name: bool,
    pub ignore_extn: bool,
    pub same_name: bool,
    pub compare_all: bool,
    pub use_threads: bool,
    pub jobs: usize,
    pub dry_run: bool,
    pub delete_side: Option<Side>,
    pub from_stdin: bool,
    pub record_groups: bool,

    pub templates: Templates,
    pub(crate) cwd: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: PathFilter::default(),
            delete_patterns: Vec::new(),
            show_same: true,
            show_diff: false,
            show_miss: false,
            invert: false,
            verbose: false,
            quiet: 0,
            show_abs: false,
            show_side: Side::Both,
            just_name: false,
            ignore_extn: false,
            same_name: false,
            compare_all: false,
            use_threads: false,
            jobs: 10,
            dry_run: false,
            delete_side: None,
            from_stdin: false,
            record_groups: false,
            templates: Templates::default(),
            cwd: std::env::current_dir().ok(),
        }
    }
}

impl Config {
    /// Builds the runtime configuration, returning every pattern or template
    /// error found so that all of them can be reported at once.
    pub fn from_args(args: &Args) -> (Self, Vec<String>) {
        let mut errors = Vec::new();
        let mut compile = |list: &[String]| -> Vec<Regex> {
            list.iter()
                .filter_map(|p| match compile_pattern(p, args.regex) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        errors.push(format!("{:#}", e));
                        None
                    }
                })
                .collect()
        };

        let filter = PathFilter {
            include_file: compile(&args.include_file),
            exclude_file: compile(&args.exclude_file),
            include_path: compile(&args.include_path),
            exclude_path: compile(&args.exclude_path),
        };
        let delete_patterns = compile(&args.del_dup_pat);

        let mut decode = |text: &str| -> String {
            convert_special_chars(text).unwrap_or_else(|e| {
                errors.push(format!("{:#}", e));
                text.to_string()
            })
        };
        let mut templates = Templates {
            separator: decode(&args.separator),
            pre_divider: decode(&args.pre_divider),
            post_divider: decode(&args.post_divider),
            pre_dup: decode(&args.pre_dup),
            pre_diff: decode(&args.pre_diff),
            pre_miss: decode(&args.pre_miss),
        };
        if args.simple {
            templates.pre_dup.clear();
            templates.pre_diff.clear();
            templates.separator = " ".to_string();
            templates.post_divider = "\n".to_string();
        }

        let quiet = args.quiet;
        let config = Self {
            filter,
            delete_patterns,
            show_same: quiet == 0 && !args.hide_dup,
            show_diff: quiet == 0 && (args.show_diff || args.show_all),
            show_miss: quiet == 0 && (args.show_miss || args.show_all),
            invert: args.invert,
            verbose: args.verbose,
            quiet,
            show_abs: args.show_abs,
            show_side: args.log_side,
            just_name: args.just_name,
            ignore_extn: args.ignore_extn,
            same_name: args.same_name,
            compare_all: args.all,
            use_threads: args.threads,
            jobs: usize::from(args.jobs),
            dry_run: args.dry_run,
            delete_side: args.delete,
            from_stdin: args.paths.len() == 1 && args.paths[0] == "-",
            record_groups: args.output_json.is_some(),
            templates,
            cwd: std::env::current_dir().ok(),
        };
        (config, errors)
    }

    pub fn mode(&self) -> Mode {
        if self.just_name && self.ignore_extn {
            Mode::IgnoreExtension
        } else if self.just_name {
            Mode::NameOnly
        } else if self.same_name {
            Mode::SameNameHash
        } else {
            Mode::GlobalCompare
        }
    }

    /// Two directories compared by relative name use the level-synchronized walk.
    pub fn use_levelwise(&self, root_count: usize) -> bool {
        root_count == 2
            && !self.from_stdin
            && !self.ignore_extn
            && !self.compare_all
            && !self.same_name
    }

    /// Formats a path for output, relative to the working directory unless
    /// absolute paths were requested.
    pub fn display(&self, path: &Path) -> String {
        if self.show_abs {
            return std::path::absolute(path)
                .unwrap_or_else(|_| path.to_path_buf())
                .display()
                .to_string();
        }
        if let Some(cwd) = &self.cwd {
            if let Ok(rel) = path.strip_prefix(cwd) {
                if !rel.as_os_str().is_empty() {
                    return rel.display().to_string();
                }
            }
        }
        path.display().to_string()
    }
}
