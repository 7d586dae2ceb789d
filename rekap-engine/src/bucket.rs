//! Week and month time buckets
//!
//! Buckets are inclusive `[start, end]` calendar ranges keyed `2024-W18`
//! (ISO week: Monday start, the Thursday decides the week-year) or
//! `2024-05`. Output is ascending by start and records inside a bucket are
//! sorted, so the result does not depend on input order.
//!
//! Records without a resolvable date are left out of every bucket; callers
//! still count them in ungrouped totals.

use crate::merge::dedup_records;
use crate::record::NormalizedActivityRecord;
use chrono::{Datelike, Days, NaiveDate};
use rekap_common::date::iso_week_start;
use rekap_common::identity::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
}

impl Granularity {
    /// First day of the bucket containing `date`
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Week => iso_week_start(date),
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Last day of the bucket starting at `start`
    pub fn bucket_end(&self, start: NaiveDate) -> NaiveDate {
        self.next_start(start).pred_opt().unwrap_or(start)
    }

    /// Start of the bucket following the one starting at `start`
    pub fn next_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Week => start.checked_add_days(Days::new(7)).unwrap_or(start),
            Granularity::Month => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start)
            }
        }
    }

    /// Stable bucket key for the bucket starting at `start`
    pub fn bucket_key(&self, start: NaiveDate) -> String {
        match self {
            Granularity::Week => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Month => format!("{:04}-{:02}", start.year(), start.month()),
        }
    }
}

/// One period of a trend view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub key: String,
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
    pub records: Vec<NormalizedActivityRecord>,
    pub total_metric: f64,
    /// Distinct people in this bucket
    pub personnel_count: usize,
}

impl TimeBucket {
    fn new(granularity: Granularity, start: NaiveDate, mut records: Vec<NormalizedActivityRecord>) -> Self {
        records.sort_by(|a, b| {
            a.occurred_on
                .cmp(&b.occurred_on)
                .then_with(|| a.client_id.cmp(&b.client_id))
                .then_with(|| a.person_key.cmp(&b.person_key))
                .then_with(|| normalize_name(&a.display_name).cmp(&normalize_name(&b.display_name)))
                .then_with(|| a.display_name.cmp(&b.display_name))
                .then_with(|| a.metric_value.total_cmp(&b.metric_value))
        });

        let total_metric = records.iter().map(|r| r.metric_value).sum();
        let personnel_count = if records.is_empty() {
            0
        } else {
            dedup_records(records.clone()).len()
        };

        Self {
            key: granularity.bucket_key(start),
            start,
            end: granularity.bucket_end(start),
            records,
            total_metric,
            personnel_count,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group dated records into ascending buckets; undated records are dropped
pub fn bucket_records(records: Vec<NormalizedActivityRecord>, granularity: Granularity) -> Vec<TimeBucket> {
    let input_count = records.len();
    let mut by_start: BTreeMap<NaiveDate, Vec<NormalizedActivityRecord>> = BTreeMap::new();
    let mut undated = 0usize;

    for record in records {
        match record.occurred_on {
            Some(date) => by_start
                .entry(granularity.bucket_start(date))
                .or_default()
                .push(record),
            None => undated += 1,
        }
    }

    let buckets: Vec<TimeBucket> = by_start
        .into_iter()
        .map(|(start, records)| TimeBucket::new(granularity, start, records))
        .collect();

    debug!(
        ?granularity,
        input_count,
        undated,
        bucket_count = buckets.len(),
        "Bucketed records"
    );
    buckets
}

/// Insert empty buckets for missing periods between the first and last
pub fn fill_gaps(buckets: Vec<TimeBucket>, granularity: Granularity) -> Vec<TimeBucket> {
    let (first, last) = match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => (first.start, last.start),
        _ => return buckets,
    };

    let mut existing: BTreeMap<NaiveDate, TimeBucket> =
        buckets.into_iter().map(|b| (b.start, b)).collect();
    let mut filled = Vec::with_capacity(existing.len());
    let mut cursor = first;

    while cursor <= last {
        let bucket = existing
            .remove(&cursor)
            .unwrap_or_else(|| TimeBucket::new(granularity, cursor, Vec::new()));
        filled.push(bucket);

        let next = granularity.next_start(cursor);
        if next <= cursor {
            break;
        }
        cursor = next;
    }

    filled
}
