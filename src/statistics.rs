use serde::{Deserialize, Serialize};

/// Running totals for one scan. Only ever incremented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub same: usize,
    pub diff: usize,
    pub miss: usize,
    /// Entries rejected by the include/exclude filters.
    pub skip: usize,
    pub delete_errors: usize,
}

impl Counters {
    pub fn total(&self) -> usize {
        self.same + self.diff + self.miss + self.skip
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Duplicate,
    Different,
    Missing,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroup {
    pub kind: GroupKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResults {
    pub levels: usize,
    pub duplicates: usize,
    pub differences: usize,
    pub missing: usize,
    pub skipped: usize,
    pub total: usize,
    pub scan_duration_seconds: f64,
    pub groups: Vec<ReportGroup>,
}

impl ScanResults {
    pub fn new(counters: &Counters, levels: usize, duration: f64, groups: Vec<ReportGroup>) -> Self {
        Self {
            levels,
            duplicates: counters.same,
            differences: counters.diff,
            missing: counters.miss,
            skipped: counters.skip,
            total: counters.total(),
            scan_duration_seconds: duration,
            groups,
        }
    }
}
