//! # Rekap Engine
//!
//! Engagement reconciliation and aggregation for Instagram likes and TikTok
//! comments performed by police personnel against assigned content.
//!
//! Data flows strictly downstream:
//! raw payloads → [`record`] normalization → [`merge`] deduplication →
//! [`personnel`] rows classified by [`compliance`] → [`grouping`] per
//! client and [`bucket`] per period → [`summary`] output, ordered by
//! [`priority`].
//!
//! The engine never fails on malformed data, only on malformed
//! invocation (a payload that is not an array of records).

pub mod bucket;
pub mod compliance;
pub mod grouping;
pub mod merge;
pub mod personnel;
pub mod priority;
pub mod record;
pub mod summary;

pub use bucket::{Granularity, TimeBucket};
pub use compliance::{classify, ComplianceStatus};
pub use grouping::{ClientGroup, GroupTotals};
pub use personnel::PersonnelRow;
pub use priority::PriorityTable;
pub use record::{NormalizedActivityRecord, Platform, RecordOrigin};
pub use summary::{EngagementSummary, RekapEngine, Scope, SummaryRequest, SummaryTotals, TrendRequest};
