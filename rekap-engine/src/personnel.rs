//! Per-person output rows

use crate::compliance::{
    clamp_completed, classify, completion_percent, reaches_display_threshold, ComplianceStatus,
};
use crate::record::NormalizedActivityRecord;
use rekap_common::PersonnelIdentity;
use serde::Serialize;

/// One deduplicated person with compliance derived from the day's target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelRow {
    pub person_key: PersonnelIdentity,
    pub display_name: String,
    pub nrp: Option<String>,
    pub rank: Option<String>,
    pub division: Option<String>,
    pub client_id: String,
    pub client_name: Option<String>,
    pub metric_value: f64,
    pub status: ComplianceStatus,
    /// Personnel-table highlight; independent of `status`
    pub display_threshold_reached: bool,
    /// `metric_value` bounded to the target, for display only
    pub clamped_completed: f64,
    pub completion_percent: f64,
    /// Counts toward compliance rates: done when there is a target,
    /// otherwise any activity
    pub compliant: bool,
}

impl PersonnelRow {
    pub fn from_record(record: NormalizedActivityRecord, total_target: f64, display_ratio: f64) -> Self {
        let completed = record.metric_value;
        let status = classify(completed, total_target);
        let compliant = if total_target > 0.0 {
            status == ComplianceStatus::Sudah
        } else {
            completed > 0.0
        };

        Self {
            person_key: record.person_key,
            display_name: record.display_name,
            nrp: record.nrp,
            rank: record.rank,
            division: record.division,
            client_id: record.client_id,
            client_name: record.client_name,
            metric_value: completed,
            status,
            display_threshold_reached: reaches_display_threshold(completed, total_target, display_ratio),
            clamped_completed: clamp_completed(completed, total_target),
            completion_percent: completion_percent(completed, total_target),
            compliant,
        }
    }

    pub fn is_active(&self) -> bool {
        self.metric_value > 0.0
    }

    pub fn has_identity(&self) -> bool {
        !self.person_key.is_empty()
    }
}

/// Build rows for already-deduplicated records
pub fn build_rows(
    records: Vec<NormalizedActivityRecord>,
    total_target: f64,
    display_ratio: f64,
) -> Vec<PersonnelRow> {
    records
        .into_iter()
        .map(|r| PersonnelRow::from_record(r, total_target, display_ratio))
        .collect()
}
