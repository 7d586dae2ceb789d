//! Raw record normalization
//!
//! The only place in the engine that reads upstream keys. Everything
//! downstream works on [`NormalizedActivityRecord`]; raw records are dropped
//! once normalized.

use chrono::NaiveDate;
use rekap_common::config::FieldTables;
use rekap_common::date::DateParser;
use rekap_common::{Error, FieldAliases, PersonnelIdentity, RecordView, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Envelope keys unwrapped when the upstream wraps its array in an object
const ENVELOPE_KEYS: [&str; 3] = ["data", "rows", "items"];

/// Social platform whose engagement is being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Metric is likes
    Instagram,
    /// Metric is comments
    Tiktok,
}

impl Platform {
    /// Alias table for this platform's engagement metric
    pub fn metric_aliases<'c>(&self, fields: &'c FieldTables) -> &'c FieldAliases {
        match self {
            Platform::Instagram => &fields.instagram_likes,
            Platform::Tiktok => &fields.tiktok_comments,
        }
    }

    /// Alias table for this platform's handle / profile URL
    pub fn identity_aliases<'c>(&self, fields: &'c FieldTables) -> &'c FieldAliases {
        match self {
            Platform::Instagram => &fields.instagram_identity,
            Platform::Tiktok => &fields.tiktok_identity,
        }
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            Platform::Instagram => "likes",
            Platform::Tiktok => "comments",
        }
    }
}

/// Which upstream feed a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    /// Engagement activity (carries a metric)
    Activity,
    /// Personnel directory (presence and display metadata only)
    Directory,
}

/// Where a record's identity and display metadata came from.
///
/// Carried through merges field by field, so a directory value keeps
/// beating activity values however many merges it passes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Provenance {
    /// `person_key` came from a handle or profile URL rather than NRP/NIP
    pub handle_identity: bool,
    pub client_name: bool,
    pub display_name: bool,
    pub nrp: bool,
    pub rank: bool,
    pub division: bool,
}

impl Provenance {
    /// Metadata flags for a freshly normalized record
    pub fn for_origin(origin: RecordOrigin, handle_identity: bool) -> Self {
        let directory = origin == RecordOrigin::Directory;
        Self {
            handle_identity,
            client_name: directory,
            display_name: directory,
            nrp: directory,
            rank: directory,
            division: directory,
        }
    }
}

/// Canonical shape of one upstream record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedActivityRecord {
    /// Upper-cased, trimmed client code; empty when unknown
    pub client_id: String,
    pub client_name: Option<String>,
    /// Canonical identity; empty means "no identity"
    pub person_key: PersonnelIdentity,
    pub display_name: String,
    pub nrp: Option<String>,
    pub rank: Option<String>,
    pub division: Option<String>,
    /// Always finite and non-negative
    pub metric_value: f64,
    /// Index of the alias that supplied `metric_value`; `None` when no
    /// metric field was present
    #[serde(skip)]
    pub metric_rank: Option<usize>,
    pub occurred_on: Option<NaiveDate>,
    pub origin: RecordOrigin,
    #[serde(skip)]
    pub provenance: Provenance,
}

impl NormalizedActivityRecord {
    pub fn has_identity(&self) -> bool {
        !self.person_key.is_empty()
    }

    pub fn has_metric(&self) -> bool {
        self.metric_rank.is_some()
    }
}

/// Turns raw upstream records into [`NormalizedActivityRecord`]s for one
/// platform using the configured alias tables.
pub struct RecordNormalizer<'c> {
    fields: &'c FieldTables,
    platform: Platform,
    dates: DateParser,
    date_aliases: &'c FieldAliases,
}

impl<'c> RecordNormalizer<'c> {
    pub fn new(fields: &'c FieldTables, platform: Platform, dates: DateParser) -> Self {
        Self {
            fields,
            platform,
            dates,
            date_aliases: &fields.date,
        }
    }

    /// Resolve dates from a different candidate list than the configured one
    pub fn with_date_aliases(mut self, aliases: &'c FieldAliases) -> Self {
        self.date_aliases = aliases;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Normalize one raw record. Never fails: missing fields fall back to
    /// empty/zero/absent values.
    pub fn normalize(&self, raw: &Value, origin: RecordOrigin) -> NormalizedActivityRecord {
        let fields = self.fields;
        let mut view = RecordView::new(raw);

        let nrp = view.resolve_text(&fields.personnel_id);
        let handle = view.resolve_text(self.platform.identity_aliases(fields));
        let handle_key = PersonnelIdentity::first_of(handle.iter());
        let handle_identity = !handle_key.is_empty();
        let person_key = if handle_identity {
            handle_key
        } else {
            PersonnelIdentity::first_of(nrp.iter())
        };

        let (metric_rank, metric_value) = match origin {
            RecordOrigin::Activity => match view.resolve_number_ranked(self.platform.metric_aliases(fields)) {
                Some((rank, value)) => (Some(rank), sanitize_metric(value)),
                None => (None, 0.0),
            },
            RecordOrigin::Directory => (None, 0.0),
        };

        NormalizedActivityRecord {
            client_id: view
                .resolve_text(&fields.client_id)
                .map(|c| c.to_uppercase())
                .unwrap_or_default(),
            client_name: view.resolve_text(&fields.client_name),
            person_key,
            display_name: view.resolve_text(&fields.display_name).unwrap_or_default(),
            nrp,
            rank: view.resolve_text(&fields.rank),
            division: view.resolve_text(&fields.division),
            metric_value,
            metric_rank,
            occurred_on: self.dates.resolve(&mut view, self.date_aliases).parsed,
            origin,
            provenance: Provenance::for_origin(origin, handle_identity),
        }
    }

    /// Normalize an upstream array (or `{ "data": [...] }` envelope).
    ///
    /// # Errors
    /// [`Error::InvalidInput`] when `input` is not an array of records.
    pub fn normalize_all(&self, input: &Value, origin: RecordOrigin) -> Result<Vec<NormalizedActivityRecord>> {
        let items = extract_array(input)?;

        let mut skipped = 0usize;
        let records: Vec<_> = items
            .iter()
            .filter(|item| {
                let keep = item.is_object();
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .map(|item| self.normalize(item, origin))
            .collect();

        if skipped > 0 {
            warn!(skipped, ?origin, "Skipped non-object entries in upstream array");
        }
        debug!(
            platform = ?self.platform,
            ?origin,
            record_count = records.len(),
            "Normalized upstream records"
        );

        Ok(records)
    }
}

/// Malformed, negative or non-finite metrics count as 0
fn sanitize_metric(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Borrow the record array from an upstream payload
pub fn extract_array(input: &Value) -> Result<&Vec<Value>> {
    match input {
        Value::Array(items) => Ok(items),
        Value::Object(map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| Error::InvalidInput("expected an array of records, got an object".to_string())),
        other => Err(Error::InvalidInput(format!(
            "expected an array of records, got {}",
            json_kind(other)
        ))),
    }
}

/// Parse caller-supplied JSON text into a payload
pub fn parse_payload(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
