//! Client group aggregation
//!
//! Two passes over already-deduplicated personnel rows:
//! 1. Group by raw `client_id`, computing per-client totals
//! 2. Collapse client groups whose display names normalize identically,
//!    summing the per-client totals
//!
//! The second pass never looks at raw records again, so a person is counted
//! once no matter how many client codes share a name.

use crate::compliance::{rate_percent, StatusCounts};
use crate::personnel::PersonnelRow;
use rekap_common::identity::normalize_name;
use rekap_common::PersonnelIdentity;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Per-group (and overall) totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub total_metric: f64,
    pub personnel_count: usize,
    /// Metric above zero
    pub active_personnel: usize,
    #[serde(flatten)]
    pub status: StatusCounts,
    /// No username/handle/NRP on record
    pub without_identity: usize,
    pub compliant: usize,
    /// Percentage of personnel counted compliant; 0 for an empty group
    pub compliance_rate: f64,
}

impl GroupTotals {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a PersonnelRow>,
    {
        let mut totals = GroupTotals::default();
        for row in rows {
            totals.total_metric += row.metric_value;
            totals.personnel_count += 1;
            if row.is_active() {
                totals.active_personnel += 1;
            }
            if !row.has_identity() {
                totals.without_identity += 1;
            }
            if row.compliant {
                totals.compliant += 1;
            }
            totals.status.record(row.status);
        }
        totals.refresh_rate();
        totals
    }

    /// Add another group's totals; the rate is recomputed, not summed
    pub fn add(&mut self, other: &GroupTotals) {
        self.total_metric += other.total_metric;
        self.personnel_count += other.personnel_count;
        self.active_personnel += other.active_personnel;
        self.status.add(&other.status);
        self.without_identity += other.without_identity;
        self.compliant += other.compliant;
        self.refresh_rate();
    }

    fn refresh_rate(&mut self) {
        self.compliance_rate = rate_percent(self.compliant, self.personnel_count);
    }
}

/// Personnel of one or more client codes sharing a display name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroup {
    /// Normalized display name (client id when there is no name)
    pub key: String,
    pub client_ids: BTreeSet<String>,
    pub display_name: String,
    pub personnel: Vec<PersonnelIdentity>,
    pub totals: GroupTotals,
}

/// Group rows by client, then collapse clients with the same display name.
///
/// `client_names` maps upper-cased client ids to directory names and wins
/// over names carried on the rows. Output is sorted by group key.
pub fn group_clients(rows: &[PersonnelRow], client_names: &HashMap<String, String>) -> Vec<ClientGroup> {
    let mut by_client: BTreeMap<&str, Vec<&PersonnelRow>> = BTreeMap::new();
    for row in rows {
        by_client.entry(row.client_id.as_str()).or_default().push(row);
    }
    let client_count = by_client.len();

    let mut by_name: BTreeMap<String, ClientGroup> = BTreeMap::new();
    for (client_id, members) in by_client {
        let display_name = resolve_display_name(client_id, &members, client_names);
        let key = match normalize_name(&display_name) {
            name if name.is_empty() => client_id.to_string(),
            name => name,
        };

        let group = ClientGroup {
            key: key.clone(),
            client_ids: BTreeSet::from([client_id.to_string()]),
            display_name,
            personnel: identities(&members),
            totals: GroupTotals::from_rows(members.iter().copied()),
        };

        match by_name.get_mut(&key) {
            // Clients are visited in id order, so the first id's name is kept
            Some(existing) => absorb(existing, group),
            None => {
                by_name.insert(key, group);
            }
        }
    }

    let groups: Vec<ClientGroup> = by_name.into_values().collect();
    debug!(client_count, group_count = groups.len(), "Grouped personnel by client");
    groups
}

fn absorb(into: &mut ClientGroup, other: ClientGroup) {
    debug!(
        key = %into.key,
        merged_ids = ?other.client_ids,
        "Collapsing client codes with identical display name"
    );
    into.client_ids.extend(other.client_ids);
    into.personnel.extend(other.personnel);
    into.personnel.sort();
    into.personnel.dedup();
    into.totals.add(&other.totals);
}

/// Directory name, else the most common name on the rows (ties to the
/// smaller), else the id itself
fn resolve_display_name(client_id: &str, members: &[&PersonnelRow], client_names: &HashMap<String, String>) -> String {
    if let Some(name) = client_names.get(client_id).filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in members.iter().filter_map(|r| r.client_name.as_deref()) {
        let name = name.trim();
        if !name.is_empty() {
            *counts.entry(name).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(na, ca), (nb, cb)| ca.cmp(cb).then_with(|| nb.cmp(na)))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| client_id.to_string())
}

fn identities(members: &[&PersonnelRow]) -> Vec<PersonnelIdentity> {
    let set: BTreeSet<&PersonnelIdentity> = members
        .iter()
        .filter(|r| r.has_identity())
        .map(|r| &r.person_key)
        .collect();
    set.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceStatus;

    fn row(client: &str, client_name: Option<&str>, person: &str, metric: f64, status: ComplianceStatus) -> PersonnelRow {
        PersonnelRow {
            person_key: PersonnelIdentity::parse(person),
            display_name: person.to_string(),
            nrp: None,
            rank: None,
            division: None,
            client_id: client.to_string(),
            client_name: client_name.map(str::to_string),
            metric_value: metric,
            status,
            display_threshold_reached: false,
            clamped_completed: 0.0,
            completion_percent: 0.0,
            compliant: status == ComplianceStatus::Sudah,
        }
    }

    #[test]
    fn test_same_display_name_collapses() {
        let rows = vec![
            row("IG-01", Some("Client X"), "budi", 5.0, ComplianceStatus::Sudah),
            row("IG-01", Some("Client X"), "andi", 0.0, ComplianceStatus::Belum),
            row("TT-02", Some("client  x"), "siti", 2.0, ComplianceStatus::Kurang),
        ];

        let per_client: Vec<GroupTotals> = ["IG-01", "TT-02"]
            .iter()
            .map(|id| GroupTotals::from_rows(rows.iter().filter(|r| r.client_id == *id)))
            .collect();

        let groups = group_clients(&rows, &HashMap::new());
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.key, "client x");
        assert_eq!(group.display_name, "Client X");
        assert_eq!(group.client_ids.len(), 2);
        assert_eq!(group.totals.total_metric, per_client[0].total_metric + per_client[1].total_metric);
        assert_eq!(group.totals.personnel_count, 3);
        assert_eq!(group.totals.active_personnel, 2);
        assert_eq!(group.totals.status, StatusCounts { sudah: 1, kurang: 1, belum: 1 });
        assert_eq!(group.personnel.len(), 3);
    }

    #[test]
    fn test_directory_name_wins() {
        let rows = vec![row("C1", Some("Polres A"), "budi", 1.0, ComplianceStatus::Sudah)];
        let names = HashMap::from([("C1".to_string(), "POLRES ALPHA".to_string())]);
        let groups = group_clients(&rows, &names);
        assert_eq!(groups[0].display_name, "POLRES ALPHA");
    }

    #[test]
    fn test_most_common_row_name() {
        let rows = vec![
            row("C1", Some("Beta"), "a", 0.0, ComplianceStatus::Belum),
            row("C1", Some("Alpha"), "b", 0.0, ComplianceStatus::Belum),
            row("C1", Some("Beta"), "c", 0.0, ComplianceStatus::Belum),
            row("C2", Some("Zeta"), "d", 0.0, ComplianceStatus::Belum),
            row("C2", Some("Eta"), "e", 0.0, ComplianceStatus::Belum),
        ];
        let groups = group_clients(&rows, &HashMap::new());
        let names: Vec<&str> = groups.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(names, ["Beta", "Eta"]);
    }

    #[test]
    fn test_unnamed_client_uses_id() {
        let rows = vec![row("C9", None, "a", 0.0, ComplianceStatus::Belum)];
        let groups = group_clients(&rows, &HashMap::new());
        assert_eq!(groups[0].display_name, "C9");
        assert_eq!(groups[0].key, "c9");
    }

    #[test]
    fn test_rates() {
        let rows = vec![
            row("C1", None, "a", 5.0, ComplianceStatus::Sudah),
            row("C1", None, "", 0.0, ComplianceStatus::Belum),
        ];
        let totals = GroupTotals::from_rows(&rows);
        assert_eq!(totals.compliance_rate, 50.0);
        assert_eq!(totals.without_identity, 1);

        let empty = GroupTotals::from_rows(std::iter::empty());
        assert_eq!(empty.compliance_rate, 0.0);
    }
}
