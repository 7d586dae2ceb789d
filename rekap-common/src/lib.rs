//! # Rekap Common Library
//!
//! Leaf utilities shared by the engagement reconciliation engine:
//! - Error type and result alias
//! - TOML configuration (field alias tables, priority tables)
//! - Logging bootstrap
//! - Locale-ambiguous number parsing
//! - Field path resolution over untyped upstream records
//! - Date parsing for the date formats the upstream feed emits
//! - Personnel identity canonicalization

pub mod config;
pub mod date;
pub mod error;
pub mod field_path;
pub mod identity;
pub mod logging;
pub mod numeric;

pub use config::EngineConfig;
pub use date::ResolvedDate;
pub use error::{Error, Result};
pub use field_path::{FieldAliases, FieldPath, RecordView};
pub use identity::PersonnelIdentity;
