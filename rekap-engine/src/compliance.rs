//! Compliance classification
//!
//! Two independently named thresholds exist and are kept apart:
//! - [`classify`]: the status contract. Done only at 100% of the target.
//! - [`reaches_display_threshold`]: the personnel table highlight, reached
//!   at a configurable fraction of the target (0.5 by default).
//!
//! Neither is stored; both are recomputed from (completed, target).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-person compliance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    /// Done: completed meets or exceeds the target
    Sudah,
    /// Partial: some but not all of the target
    Kurang,
    /// None: nothing completed, or no target to evaluate against
    Belum,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Sudah => "sudah",
            ComplianceStatus::Kurang => "kurang",
            ComplianceStatus::Belum => "belum",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a completed count against the day's content target.
///
/// A target of zero (or less) always yields [`ComplianceStatus::Belum`]:
/// no completion can be evaluated without content. Over-completion is
/// still done. Uses the raw, unclamped count.
///
/// # Examples
///
/// ```
/// use rekap_engine::compliance::{classify, ComplianceStatus};
///
/// assert_eq!(classify(0.0, 0.0), ComplianceStatus::Belum);
/// assert_eq!(classify(5.0, 5.0), ComplianceStatus::Sudah);
/// assert_eq!(classify(1.0, 5.0), ComplianceStatus::Kurang);
/// assert_eq!(classify(10.0, 5.0), ComplianceStatus::Sudah);
/// ```
pub fn classify(completed: f64, total_target: f64) -> ComplianceStatus {
    if total_target > 0.0 && completed >= total_target {
        ComplianceStatus::Sudah
    } else if total_target > 0.0 && completed > 0.0 {
        ComplianceStatus::Kurang
    } else {
        ComplianceStatus::Belum
    }
}

/// Bound a completed count to `[0, total_target]` for display only.
///
/// Never feed the result back into [`classify`].
pub fn clamp_completed(completed: f64, total_target: f64) -> f64 {
    let upper = if total_target.is_finite() { total_target.max(0.0) } else { 0.0 };
    if completed.is_nan() {
        return 0.0;
    }
    completed.clamp(0.0, upper)
}

/// Completion as a display percentage (0–100), 0 when there is no target
pub fn completion_percent(completed: f64, total_target: f64) -> f64 {
    if total_target > 0.0 {
        clamp_completed(completed, total_target) / total_target * 100.0
    } else {
        0.0
    }
}

/// Personnel-table highlight: completed reaches `ratio` of the target
pub fn reaches_display_threshold(completed: f64, total_target: f64, ratio: f64) -> bool {
    total_target > 0.0 && completed >= total_target * ratio
}

/// `part / whole` as a percentage, 0 when `whole` is 0
pub fn rate_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Tally of statuses across personnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub sudah: usize,
    pub kurang: usize,
    pub belum: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Sudah => self.sudah += 1,
            ComplianceStatus::Kurang => self.kurang += 1,
            ComplianceStatus::Belum => self.belum += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sudah + self.kurang + self.belum
    }

    pub fn add(&mut self, other: &StatusCounts) {
        self.sudah += other.sudah;
        self.kurang += other.kurang;
        self.belum += other.belum;
    }
}
