use anyhow::{Context, Result};
use log::info;
use regex::Regex;

/// Converts a DOS style pattern (`*.txt`, `data?.csv`) into regex source.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' => out.push_str("[.]"),
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    out
}

/// Compiles a pattern for full-string matching.
pub fn compile_pattern(pattern: &str, raw_regex: bool) -> Result<Regex> {
    let source = if raw_regex {
        pattern.to_string()
    } else {
        glob_to_regex(pattern)
    };
    Regex::new(&format!("^(?:{})$", source))
        .with_context(|| format!("Invalid regular expression, Pattern={}", pattern))
}

/// Returns true if `candidate` fully matches any pattern, checked in order.
///
/// An empty pattern list or empty candidate yields `empty_result`, so include
/// lists accept everything by default and exclude lists reject nothing.
pub fn file_matches(candidate: &str, patterns: &[Regex], empty_result: bool) -> bool {
    if patterns.is_empty() || candidate.is_empty() {
        return empty_result;
    }
    patterns.iter().any(|p| p.is_match(candidate))
}

/// Include/exclude lists for bare names and full paths.
#[derive(Debug, Default, Clone)]
pub struct PathFilter {
    pub include_file: Vec<Regex>,
    pub exclude_file: Vec<Regex>,
    pub include_path: Vec<Regex>,
    pub exclude_path: Vec<Regex>,
}

impl PathFilter {
    /// Composite check used to prune the scan. Exclusions short-circuit.
    pub fn accepts(&self, name: &str, full_path: &str) -> bool {
        let valid = !name.is_empty()
            && !file_matches(name, &self.exclude_file, false)
            && file_matches(name, &self.include_file, true)
            && !file_matches(full_path, &self.exclude_path, false)
            && file_matches(full_path, &self.include_path, true);

        if !valid && log::log_enabled!(log::Level::Info) {
            info!("Skipped:{}{}", full_path, self.rejection_reasons(name, full_path));
        }
        valid
    }

    fn rejection_reasons(&self, name: &str, full_path: &str) -> String {
        let mut reasons = String::new();
        if file_matches(name, &self.exclude_file, false) {
            reasons.push_str(" exclude");
        }
        if !file_matches(name, &self.include_file, true) {
            reasons.push_str(" include");
        }
        if file_matches(full_path, &self.exclude_path, false) {
            reasons.push_str(" Exclude");
        }
        if !file_matches(full_path, &self.include_path, true) {
            reasons.push_str(" Include");
        }
        reasons
    }
}
