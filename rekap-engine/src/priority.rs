//! Personnel priority ordering
//!
//! Three tiers, compared in order:
//! 1. Name overrides: literal names with a fixed position, always first
//! 2. Rank table: case-insensitive substring match against the rank, the
//!    longest matching table entry wins (`BRIPTU` is not `IPTU`); unmatched
//!    ranks sort after every matched one
//! 3. Tiebreak: NRP/NIP in numeric order (missing last), then name
//!    (case-insensitive, then exact), then identity and client
//!
//! Comparison goes through a derived [`PriorityKey`], so the order is total
//! and re-sorting sorted input is a no-op.

use crate::personnel::PersonnelRow;
use rekap_common::config::PriorityConfig;
use rekap_common::identity::normalize_name;
use std::cmp::Ordering;

/// Ordering tables injected from configuration
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    /// Normalized override names, in priority order
    name_overrides: Vec<String>,
    /// Upper-cased ranks, highest first
    rank_order: Vec<String>,
}

/// Fully derived sort key for one person
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey {
    override_index: usize,
    rank_index: usize,
    nrp_missing: bool,
    nrp_digits_len: usize,
    nrp_digits: String,
    nrp_raw: String,
    name_folded: String,
    name_raw: String,
    person: String,
    client_id: String,
}

impl PriorityTable {
    pub fn new<I, J, S, T>(name_overrides: I, rank_order: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            name_overrides: name_overrides
                .into_iter()
                .map(|n| normalize_name(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
            rank_order: rank_order
                .into_iter()
                .map(|r| r.as_ref().trim().to_uppercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &PriorityConfig) -> Self {
        Self::new(&config.name_overrides, &config.rank_order)
    }

    /// Position in the override list for an exact (normalized) name match
    pub fn override_index(&self, name: &str) -> Option<usize> {
        let name = normalize_name(name);
        if name.is_empty() {
            return None;
        }
        self.name_overrides.iter().position(|n| *n == name)
    }

    /// Position in the rank table; the longest entry contained in `rank`
    /// wins, earlier entries break length ties
    pub fn rank_index(&self, rank: &str) -> Option<usize> {
        let rank = rank.trim().to_uppercase();
        if rank.is_empty() {
            return None;
        }
        self.rank_order
            .iter()
            .enumerate()
            .filter(|(_, entry)| rank.contains(entry.as_str()))
            .min_by(|(ia, a), (ib, b)| b.len().cmp(&a.len()).then(ia.cmp(ib)))
            .map(|(i, _)| i)
    }

    pub fn key(&self, row: &PersonnelRow) -> PriorityKey {
        let nrp_raw = row.nrp.as_deref().unwrap_or("").trim().to_string();
        let digits: String = nrp_raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let nrp_digits = digits.trim_start_matches('0').to_string();

        PriorityKey {
            override_index: self.override_index(&row.display_name).unwrap_or(usize::MAX),
            rank_index: row
                .rank
                .as_deref()
                .and_then(|r| self.rank_index(r))
                .unwrap_or(usize::MAX),
            nrp_missing: nrp_raw.is_empty(),
            nrp_digits_len: nrp_digits.len(),
            nrp_digits,
            nrp_raw,
            name_folded: normalize_name(&row.display_name),
            name_raw: row.display_name.clone(),
            person: row.person_key.as_str().to_string(),
            client_id: row.client_id.clone(),
        }
    }

    pub fn compare(&self, a: &PersonnelRow, b: &PersonnelRow) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    /// Sort rows by priority
    pub fn sort(&self, rows: &mut [PersonnelRow]) {
        rows.sort_by_cached_key(|row| self.key(row));
    }

    /// Highest metric first, priority order among equal metrics
    pub fn sort_by_metric(&self, rows: &mut [PersonnelRow]) {
        rows.sort_by_cached_key(|row| (std::cmp::Reverse(MetricKey(row.metric_value)), self.key(row)));
    }
}

/// `f64` wrapper ordered by `total_cmp`
#[derive(Debug, Clone, Copy, PartialEq)]
struct MetricKey(f64);

impl Eq for MetricKey {}

impl PartialOrd for MetricKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
