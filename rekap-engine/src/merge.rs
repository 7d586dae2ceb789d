//! Record merging and deduplication
//!
//! Two records describe the same person when, within one client, they share
//! a [`PersonnelIdentity`] or a non-empty NRP/NIP. Links are transitive: a
//! handle-only activity row, a directory row with handle and NRP, and an
//! NRP-only row all collapse into one person. Records with neither identity
//! nor NRP merge on `(client_id, normalized display name)`; records with no
//! name either are kept as distinct unmatched entries.
//!
//! # Merge Policy
//! - Metric: the personnel-preferring value wins (the side whose metric came
//!   from the more specific alias, then the larger value). Never summed:
//!   two aliases for one person report the same activity.
//! - Directory vs activity: the activity metric wins; the directory supplies
//!   display metadata (name, rank, unit). Each metadata field remembers
//!   whether its value came from the directory ([`Provenance`]).
//! - Identity: a handle-derived key beats an NRP-derived one.
//! - Every field is a maximum under a total order and carries its own
//!   provenance, so [`merge_pair`] is commutative and associative and
//!   [`dedup_records`] is idempotent and independent of input order.

use crate::record::{NormalizedActivityRecord, Provenance, RecordOrigin};
use rekap_common::identity::normalize_name;
use rekap_common::PersonnelIdentity;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Derived key deciding which records describe the same person
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MergeKey {
    Identity {
        client_id: String,
        person: PersonnelIdentity,
    },
    Nrp {
        client_id: String,
        nrp: PersonnelIdentity,
    },
    Name {
        client_id: String,
        name: String,
    },
    /// Neither identity nor name: never merged
    Unmatched(usize),
}

impl MergeKey {
    /// Primary key for `record`; `index` only distinguishes unmatched records
    pub fn for_record(record: &NormalizedActivityRecord, index: usize) -> Self {
        let client_id = record.client_id.clone();
        if record.has_identity() {
            return MergeKey::Identity {
                client_id,
                person: record.person_key.clone(),
            };
        }
        let name = normalize_name(&record.display_name);
        if name.is_empty() {
            MergeKey::Unmatched(index)
        } else {
            MergeKey::Name { client_id, name }
        }
    }

    /// Every key linking `record` to others: identity and NRP, or the
    /// primary key when it has neither
    pub fn all_for_record(record: &NormalizedActivityRecord, index: usize) -> Vec<Self> {
        let mut keys = Vec::with_capacity(2);
        if record.has_identity() {
            keys.push(MergeKey::Identity {
                client_id: record.client_id.clone(),
                person: record.person_key.clone(),
            });
        }
        if let Some(nrp) = record
            .nrp
            .as_deref()
            .map(PersonnelIdentity::parse)
            .filter(|n| !n.is_empty())
        {
            keys.push(MergeKey::Nrp {
                client_id: record.client_id.clone(),
                nrp,
            });
        }
        if keys.is_empty() {
            keys.push(Self::for_record(record, index));
        }
        keys
    }
}

/// Merge two records describing the same person. Commutative and
/// associative.
pub fn merge_pair(a: NormalizedActivityRecord, b: NormalizedActivityRecord) -> NormalizedActivityRecord {
    let metric_side = match compare_metric(&a, &b) {
        Ordering::Less => &b,
        _ => &a,
    };
    let (metric_value, metric_rank) = (metric_side.metric_value, metric_side.metric_rank);

    if a.has_metric() && b.has_metric() && a.metric_value != b.metric_value {
        debug!(
            person = %a.person_key,
            kept = metric_value,
            dropped = if metric_value == a.metric_value { b.metric_value } else { a.metric_value },
            "Conflicting metrics for one person, keeping personnel-preferring value"
        );
    }

    let origin = if a.origin == RecordOrigin::Activity || b.origin == RecordOrigin::Activity {
        RecordOrigin::Activity
    } else {
        RecordOrigin::Directory
    };
    let (pa, pb) = (a.provenance, b.provenance);

    let (person_key, handle_identity) =
        pick_identity((a.person_key, pa.handle_identity), (b.person_key, pb.handle_identity));
    let (client_name, client_name_dir) = pick_text((a.client_name, pa.client_name), (b.client_name, pb.client_name));
    let (display_name, display_name_dir) = pick_text(
        (non_blank(a.display_name), pa.display_name),
        (non_blank(b.display_name), pb.display_name),
    );
    let (nrp, nrp_dir) = pick_text((a.nrp, pa.nrp), (b.nrp, pb.nrp));
    let (rank, rank_dir) = pick_text((a.rank, pa.rank), (b.rank, pb.rank));
    let (division, division_dir) = pick_text((a.division, pa.division), (b.division, pb.division));

    NormalizedActivityRecord {
        client_id: a.client_id,
        client_name,
        person_key,
        display_name: display_name.unwrap_or_default(),
        nrp,
        rank,
        division,
        metric_value,
        metric_rank,
        occurred_on: a.occurred_on.max(b.occurred_on),
        origin,
        provenance: Provenance {
            handle_identity,
            client_name: client_name_dir,
            display_name: display_name_dir,
            nrp: nrp_dir,
            rank: rank_dir,
            division: division_dir,
        },
    }
}

/// Greater means "more trustworthy metric": has a metric, then more
/// specific alias (lower rank), then larger value.
fn compare_metric(a: &NormalizedActivityRecord, b: &NormalizedActivityRecord) -> Ordering {
    match (a.metric_rank, b.metric_rank) {
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
        (Some(ra), Some(rb)) => rb
            .cmp(&ra)
            .then_with(|| a.metric_value.total_cmp(&b.metric_value)),
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Non-empty beats empty, handle-derived beats NRP-derived, then the
/// smaller key
fn pick_identity(a: (PersonnelIdentity, bool), b: (PersonnelIdentity, bool)) -> (PersonnelIdentity, bool) {
    let a_wins = (!a.0.is_empty(), a.1)
        .cmp(&(!b.0.is_empty(), b.1))
        .then_with(|| b.0.cmp(&a.0))
        != Ordering::Less;
    if a_wins {
        a
    } else {
        b
    }
}

/// Choose display metadata: present beats absent, directory beats activity,
/// then the longer value, then the lexicographically smaller one. The
/// winner keeps its directory flag.
fn pick_text(a: (Option<String>, bool), b: (Option<String>, bool)) -> (Option<String>, bool) {
    match (a, b) {
        ((None, a_dir), (None, b_dir)) => (None, a_dir || b_dir),
        ((None, _), present) | (present, (None, _)) => present,
        ((Some(x), x_dir), (Some(y), y_dir)) => {
            let x_wins = match x_dir.cmp(&y_dir).then_with(|| x.len().cmp(&y.len())) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => x <= y,
            };
            if x_wins {
                (Some(x), x_dir)
            } else {
                (Some(y), y_dir)
            }
        }
    }
}

/// Total order over every output field, so sorted output depends only on
/// the merged records themselves.
fn output_order(a: &NormalizedActivityRecord, b: &NormalizedActivityRecord) -> Ordering {
    a.client_id
        .cmp(&b.client_id)
        .then_with(|| a.person_key.cmp(&b.person_key))
        .then_with(|| normalize_name(&a.display_name).cmp(&normalize_name(&b.display_name)))
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.nrp.cmp(&b.nrp))
        .then_with(|| a.metric_value.total_cmp(&b.metric_value))
        .then_with(|| a.metric_rank.cmp(&b.metric_rank))
        .then_with(|| a.occurred_on.cmp(&b.occurred_on))
        .then_with(|| a.origin.cmp(&b.origin))
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| a.division.cmp(&b.division))
        .then_with(|| a.client_name.cmp(&b.client_name))
}

fn find_root(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

fn link(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find_root(parent, a), find_root(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

/// Merge every group of records linked by a shared [`MergeKey`].
///
/// Idempotent: `dedup_records(dedup_records(x)) == dedup_records(x)`.
pub fn dedup_records(records: Vec<NormalizedActivityRecord>) -> Vec<NormalizedActivityRecord> {
    let input_count = records.len();
    let mut parent: Vec<usize> = (0..input_count).collect();
    let mut first_by_key: HashMap<MergeKey, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        for key in MergeKey::all_for_record(record, index) {
            match first_by_key.get(&key) {
                Some(&first) => link(&mut parent, index, first),
                None => {
                    first_by_key.insert(key, index);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<NormalizedActivityRecord>> = BTreeMap::new();
    for (index, record) in records.into_iter().enumerate() {
        let root = find_root(&mut parent, index);
        groups.entry(root).or_default().push(record);
    }

    let mut merged: Vec<NormalizedActivityRecord> = groups
        .into_values()
        .filter_map(|group| group.into_iter().reduce(merge_pair))
        .collect();
    merged.sort_by(output_order);

    debug!(
        input_count,
        output_count = merged.len(),
        "Deduplicated records"
    );
    merged
}

/// Reconcile activity records with directory records: every directory
/// person appears once, with the activity metric when one exists.
pub fn merge_sources(
    activity: Vec<NormalizedActivityRecord>,
    directory: Vec<NormalizedActivityRecord>,
) -> Vec<NormalizedActivityRecord> {
    let mut all = activity;
    all.extend(directory);
    dedup_records(all)
}
