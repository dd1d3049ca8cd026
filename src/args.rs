use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Which side of a two-directory pair an option applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    First,
    Second,
    Both,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Find duplicate files by comparing length, hash value and optional name",
    long_about = "Find duplicate files by comparing length, hash value and optional name.\n\n\
        With exactly two directories, files are matched by relative name, size and hash \
        (fastest). With one, three or more directories, all files are compared by length \
        and hash value, or by name with --just-name.\n\n\
        Patterns are DOS style by default: '*' matches anything, '?' one character."
)]
pub struct Args {
    /// Directories or files to compare ('-' reads paths from stdin)
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value = "warn")]
    pub log_level: LevelFilter,

    /// Only scan files whose name matches (repeatable)
    #[arg(short = 'i', long, value_name = "PATTERN")]
    pub include_file: Vec<String>,

    /// Skip files and directories whose name matches (repeatable)
    #[arg(short = 'e', long, value_name = "PATTERN")]
    pub exclude_file: Vec<String>,

    /// Only scan entries whose full path matches (repeatable)
    #[arg(short = 'I', long, value_name = "PATTERN")]
    pub include_path: Vec<String>,

    /// Skip entries whose full path matches (repeatable)
    #[arg(short = 'E', long, value_name = "PATTERN")]
    pub exclude_path: Vec<String>,

    /// Delete duplicates whose path matches (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub del_dup_pat: Vec<String>,

    /// Treat patterns as regular expressions instead of DOS patterns
    #[arg(short, long)]
    pub regex: bool,

    /// Show duplicates, differences and missing files
    #[arg(long)]
    pub show_all: bool,

    /// Show files that differ
    #[arg(long)]
    pub show_diff: bool,

    /// Show missing files
    #[arg(long)]
    pub show_miss: bool,

    /// Don't show duplicate files
    #[arg(long)]
    pub hide_dup: bool,

    /// Show absolute file paths
    #[arg(long)]
    pub show_abs: bool,

    /// Invert output, show unique files instead of duplicates
    #[arg(long)]
    pub invert: bool,

    /// Match duplicate names only, not contents
    #[arg(short, long)]
    pub just_name: bool,

    /// With --just-name, also ignore the extension
    #[arg(long)]
    pub ignore_extn: bool,

    /// Compare all files by length and hash, ignoring names
    #[arg(short, long)]
    pub all: bool,

    /// Compare files sharing a name by hash value
    #[arg(long, conflicts_with = "all")]
    pub same_name: bool,

    /// Compute file hashes in worker threads
    #[arg(short, long)]
    pub threads: bool,

    /// Number of hashing workers used with --threads
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// Dry run, report deletions but do not delete
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// If duplicate, delete the first, second or both files
    #[arg(long, value_enum, value_name = "SIDE")]
    pub delete: Option<Side>,

    /// Only show the first or second file of a pair
    #[arg(long = "log", value_enum, default_value = "both", value_name = "SIDE")]
    pub log_side: Side,

    /// Separator between files of a group
    #[arg(long, default_value = ", ", allow_hyphen_values = true)]
    pub separator: String,

    /// Text written before each group
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub pre_divider: String,

    /// Text written after each group
    #[arg(long, default_value = "\\n", allow_hyphen_values = true)]
    pub post_divider: String,

    /// Prefix before duplicates
    #[arg(long, default_value = "== ", allow_hyphen_values = true)]
    pub pre_dup: String,

    /// Prefix before differences
    #[arg(long, default_value = "!= ", allow_hyphen_values = true)]
    pub pre_diff: String,

    /// Prefix before missing files
    #[arg(long, default_value = "-- ", allow_hyphen_values = true)]
    pub pre_miss: String,

    /// Show files with no prefix and a single space separator
    #[arg(long)]
    pub simple: bool,

    /// Show file details and hash values
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output, repeat to also hide the summary
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Write results to a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub output_json: Option<PathBuf>,
}
