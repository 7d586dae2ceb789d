//! Summary and trend entry points
//!
//! # Summary Pipeline
//! 1. Normalize activity and directory payloads for one platform
//! 2. Apply the scope (directorate: every client, org: one client)
//! 3. Merge activity with directory and deduplicate per person
//! 4. Classify each person against the content target
//! 5. Group by client, collapsing clients that share a display name
//! 6. Order personnel by priority; pick the top personnel by metric
//!
//! # Trend Pipeline
//! Activity is deduplicated per calendar date (a person appearing twice on
//! one day is one activity), then bucketed by week or month, so a bucket
//! sums its days.
//!
//! Calls keep no state between invocations.

use crate::bucket::{bucket_records, fill_gaps, Granularity, TimeBucket};
use crate::grouping::{group_clients, ClientGroup, GroupTotals};
use crate::merge::{dedup_records, merge_sources};
use crate::personnel::{build_rows, PersonnelRow};
use crate::priority::PriorityTable;
use crate::record::{parse_payload, NormalizedActivityRecord, Platform, RecordNormalizer, RecordOrigin};
use chrono::NaiveDate;
use rekap_common::date::DateParser;
use rekap_common::{EngineConfig, FieldAliases, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Which clients a request covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// Every client under the directorate
    #[default]
    Directorate,
    /// One organizational client, matched case-insensitively
    Org(String),
}

impl Scope {
    pub fn org(client_id: &str) -> Self {
        Scope::Org(client_id.trim().to_uppercase())
    }

    pub fn includes(&self, client_id: &str) -> bool {
        match self {
            Scope::Directorate => true,
            Scope::Org(id) => id.trim().eq_ignore_ascii_case(client_id.trim()),
        }
    }
}

/// Input for [`RekapEngine::summarize`]
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub platform: Platform,
    /// Array of activity records (or an envelope around one)
    pub activity: Value,
    /// Personnel directory; people listed here but absent from activity
    /// still count as personnel
    pub directory: Option<Value>,
    /// Client directory supplying display names
    pub clients: Option<Value>,
    /// Content items each person was expected to engage with
    pub total_target: f64,
    pub scope: Scope,
}

impl SummaryRequest {
    pub fn new(platform: Platform, activity: Value) -> Self {
        Self {
            platform,
            activity,
            directory: None,
            clients: None,
            total_target: 0.0,
            scope: Scope::Directorate,
        }
    }

    /// Build from raw JSON text
    ///
    /// # Errors
    /// [`rekap_common::Error::Json`] when the text does not parse.
    pub fn from_json_text(platform: Platform, activity: &str) -> Result<Self> {
        Ok(Self::new(platform, parse_payload(activity)?))
    }

    pub fn with_directory(mut self, directory: Value) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_directory_text(self, directory: &str) -> Result<Self> {
        Ok(self.with_directory(parse_payload(directory)?))
    }

    pub fn with_clients(mut self, clients: Value) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn with_clients_text(self, clients: &str) -> Result<Self> {
        Ok(self.with_clients(parse_payload(clients)?))
    }

    pub fn with_total_target(mut self, total_target: f64) -> Self {
        self.total_target = total_target;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Input for [`RekapEngine::trend`]
#[derive(Debug, Clone)]
pub struct TrendRequest {
    pub platform: Platform,
    pub activity: Value,
    pub granularity: Granularity,
    /// Date candidates; the configured `[fields] date` table when `None`
    pub date_fields: Option<FieldAliases>,
    pub scope: Scope,
    /// Emit empty buckets for periods with no activity
    pub fill_gaps: bool,
}

impl TrendRequest {
    pub fn new(platform: Platform, activity: Value, granularity: Granularity) -> Self {
        Self {
            platform,
            activity,
            granularity,
            date_fields: None,
            scope: Scope::Directorate,
            fill_gaps: false,
        }
    }

    pub fn from_json_text(platform: Platform, activity: &str, granularity: Granularity) -> Result<Self> {
        Ok(Self::new(platform, parse_payload(activity)?, granularity))
    }

    pub fn with_date_fields(mut self, date_fields: FieldAliases) -> Self {
        self.date_fields = Some(date_fields);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_fill_gaps(mut self, fill_gaps: bool) -> Self {
        self.fill_gaps = fill_gaps;
        self
    }
}

/// Overall totals with fixed output names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    /// Instagram likes; 0 for TikTok summaries
    pub total_likes: f64,
    /// TikTok comments; 0 for Instagram summaries
    pub total_comments: f64,
    pub total_personnel: usize,
    pub active_personnel: usize,
    pub compliance_rate: f64,
    pub sudah: usize,
    pub kurang: usize,
    pub belum: usize,
    /// Personnel with no username on record
    pub without_username: usize,
    /// Content target the statuses were computed against
    pub total_content: f64,
    pub total_clients: usize,
}

impl SummaryTotals {
    fn new(platform: Platform, totals: &GroupTotals, total_content: f64, total_clients: usize) -> Self {
        let (total_likes, total_comments) = match platform {
            Platform::Instagram => (totals.total_metric, 0.0),
            Platform::Tiktok => (0.0, totals.total_metric),
        };
        Self {
            total_likes,
            total_comments,
            total_personnel: totals.personnel_count,
            active_personnel: totals.active_personnel,
            compliance_rate: totals.compliance_rate,
            sudah: totals.status.sudah,
            kurang: totals.status.kurang,
            belum: totals.status.belum,
            without_username: totals.without_identity,
            total_content,
            total_clients,
        }
    }
}

/// Summary handed to the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub platform: Platform,
    pub totals: SummaryTotals,
    pub clients: Vec<ClientGroup>,
    pub top_personnel: Vec<PersonnelRow>,
    /// Every person, in priority order
    pub personnel: Vec<PersonnelRow>,
    /// Latest activity date in scope
    pub last_updated: Option<NaiveDate>,
}

/// Reconciliation engine bound to one configuration
#[derive(Debug, Clone)]
pub struct RekapEngine {
    config: EngineConfig,
    priority: PriorityTable,
    dates: DateParser,
}

impl RekapEngine {
    /// # Errors
    /// [`rekap_common::Error::Config`] when the configuration fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            priority: PriorityTable::from_config(&config.priority),
            dates: DateParser::with_offset_minutes(config.dates.utc_offset_minutes),
            config,
        })
    }

    pub fn with_defaults() -> Self {
        let config = EngineConfig::default();
        Self {
            priority: PriorityTable::from_config(&config.priority),
            dates: DateParser::with_offset_minutes(config.dates.utc_offset_minutes),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn priority(&self) -> &PriorityTable {
        &self.priority
    }

    pub fn normalizer(&self, platform: Platform) -> RecordNormalizer<'_> {
        RecordNormalizer::new(&self.config.fields, platform, self.dates)
    }

    /// Build the compliance summary for one platform.
    ///
    /// # Errors
    /// [`rekap_common::Error::InvalidInput`] when a payload is not an array
    /// of records. Malformed records never fail.
    pub fn summarize(&self, request: &SummaryRequest) -> Result<EngagementSummary> {
        let normalizer = self.normalizer(request.platform);
        let total_target = sanitize_target(request.total_target);

        let mut activity = normalizer.normalize_all(&request.activity, RecordOrigin::Activity)?;
        let mut directory = match &request.directory {
            Some(payload) => normalizer.normalize_all(payload, RecordOrigin::Directory)?,
            None => Vec::new(),
        };
        let client_names = match &request.clients {
            Some(payload) => self.client_names(&normalizer, payload)?,
            None => HashMap::new(),
        };

        activity.retain(|r| request.scope.includes(&r.client_id));
        directory.retain(|r| request.scope.includes(&r.client_id));
        let last_updated = activity.iter().filter_map(|r| r.occurred_on).max();

        debug!(
            platform = ?request.platform,
            scope = ?request.scope,
            activity_count = activity.len(),
            directory_count = directory.len(),
            total_target,
            "Summarizing engagement"
        );

        let merged = merge_sources(activity, directory);
        let mut personnel = build_rows(merged, total_target, self.config.compliance.display_threshold_ratio);
        self.priority.sort(&mut personnel);

        let clients = group_clients(&personnel, &client_names);
        let overall = GroupTotals::from_rows(&personnel);
        let totals = SummaryTotals::new(request.platform, &overall, total_target, clients.len());

        let mut top_personnel: Vec<PersonnelRow> =
            personnel.iter().filter(|r| r.is_active()).cloned().collect();
        self.priority.sort_by_metric(&mut top_personnel);
        top_personnel.truncate(self.config.summary.top_personnel_limit);

        debug!(
            total_personnel = totals.total_personnel,
            active_personnel = totals.active_personnel,
            group_count = clients.len(),
            compliance_rate = totals.compliance_rate,
            "Summary complete"
        );

        Ok(EngagementSummary {
            platform: request.platform,
            totals,
            clients,
            top_personnel,
            personnel,
            last_updated,
        })
    }

    /// Build the week or month trend for one platform.
    ///
    /// # Errors
    /// [`rekap_common::Error::InvalidInput`] when the payload is not an
    /// array of records.
    pub fn trend(&self, request: &TrendRequest) -> Result<Vec<TimeBucket>> {
        let base = self.normalizer(request.platform);
        let normalizer = match &request.date_fields {
            Some(aliases) => base.with_date_aliases(aliases),
            None => base,
        };

        let mut activity = normalizer.normalize_all(&request.activity, RecordOrigin::Activity)?;
        activity.retain(|r| request.scope.includes(&r.client_id));

        let mut by_day: BTreeMap<NaiveDate, Vec<NormalizedActivityRecord>> = BTreeMap::new();
        let mut undated = 0usize;
        for record in activity {
            match record.occurred_on {
                Some(date) => by_day.entry(date).or_default().push(record),
                None => undated += 1,
            }
        }

        debug!(
            platform = ?request.platform,
            granularity = ?request.granularity,
            day_count = by_day.len(),
            undated,
            "Building trend"
        );

        let daily: Vec<NormalizedActivityRecord> = by_day.into_values().flat_map(dedup_records).collect();
        let buckets = bucket_records(daily, request.granularity);

        Ok(if request.fill_gaps {
            fill_gaps(buckets, request.granularity)
        } else {
            buckets
        })
    }

    /// Upper-cased client id to display name, from a client directory
    fn client_names(&self, normalizer: &RecordNormalizer<'_>, payload: &Value) -> Result<HashMap<String, String>> {
        let entries = normalizer.normalize_all(payload, RecordOrigin::Directory)?;
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for entry in entries {
            if entry.client_id.is_empty() {
                continue;
            }
            let name = match entry.client_name {
                Some(name) => name,
                None if !entry.display_name.trim().is_empty() => entry.display_name,
                None => continue,
            };

            // Listed twice: longest, then smallest, name wins
            let replace = names
                .get(&entry.client_id)
                .map_or(true, |existing| {
                    name.len() > existing.len() || (name.len() == existing.len() && name < *existing)
                });
            if replace {
                names.insert(entry.client_id, name);
            }
        }
        Ok(names.into_iter().collect())
    }
}

impl Default for RekapEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn sanitize_target(total_target: f64) -> f64 {
    if total_target.is_finite() && total_target > 0.0 {
        total_target
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope() {
        assert!(Scope::Directorate.includes("ANY"));
        assert!(Scope::org(" ditbinmas ").includes("DITBINMAS"));
        assert!(Scope::Org("ditbinmas".to_string()).includes("DITBINMAS"));
        assert!(!Scope::org("A").includes("B"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.compliance.display_threshold_ratio = 0.0;
        assert!(RekapEngine::new(config).is_err());
    }

    #[test]
    fn test_client_names_prefer_client_name_field() {
        let engine = RekapEngine::with_defaults();
        let normalizer = engine.normalizer(Platform::Instagram);
        let clients = json!([
            { "client_id": "c1", "nama_client": "Polres A" },
            { "client_id": "C1", "nama_client": "Polres Alpha" },
            { "client_id": "", "nama_client": "Nobody" }
        ]);
        let names = engine.client_names(&normalizer, &clients).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names["C1"], "Polres Alpha");
    }

    #[test]
    fn test_non_positive_target_sanitized() {
        assert_eq!(sanitize_target(-3.0), 0.0);
        assert_eq!(sanitize_target(f64::NAN), 0.0);
        assert_eq!(sanitize_target(4.0), 4.0);
    }
}
