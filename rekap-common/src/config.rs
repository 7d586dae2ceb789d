//! Engine configuration
//!
//! All field alias tables and ordering tables are data, not code branches:
//! they live here with compiled-in defaults and can be overridden from a
//! TOML file. A partial file only replaces what it names.
//!
//! # Resolution Order
//! 1. Explicit path argument (must exist and parse)
//! 2. `REKAP_CONFIG` environment variable (missing file → warning, skipped)
//! 3. `<user config dir>/rekap/config.toml` (skipped when absent)
//! 4. Compiled defaults

use crate::date::DEFAULT_UTC_OFFSET_MINUTES;
use crate::field_path::FieldAliases;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "REKAP_CONFIG";

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub dates: DateConfig,
    pub fields: FieldTables,
    pub priority: PriorityConfig,
    pub compliance: ComplianceConfig,
    pub summary: SummaryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Date interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Offset applied to zoned timestamps before taking the calendar date
    pub utc_offset_minutes: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

/// Ordered alias tables per logical field, most specific first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTables {
    pub client_id: FieldAliases,
    pub client_name: FieldAliases,
    /// Instagram handle / profile URL candidates
    pub instagram_identity: FieldAliases,
    /// TikTok handle / profile URL candidates
    pub tiktok_identity: FieldAliases,
    /// NRP/NIP candidates; identity fallback when no handle is present
    pub personnel_id: FieldAliases,
    pub display_name: FieldAliases,
    pub rank: FieldAliases,
    pub division: FieldAliases,
    pub date: FieldAliases,
    /// Instagram likes; per-person names before aggregate totals
    pub instagram_likes: FieldAliases,
    /// TikTok comments; per-person names before aggregate totals
    pub tiktok_comments: FieldAliases,
}

impl Default for FieldTables {
    fn default() -> Self {
        Self {
            client_id: FieldAliases::new([
                "client_id",
                "clientId",
                "client.client_id",
                "user.client_id",
                "id_client",
                "satker_id",
            ]),
            client_name: FieldAliases::new([
                "nama_client",
                "client_name",
                "clientName",
                "client.nama",
                "client.name",
                "nama_satker",
                "satker",
            ]),
            instagram_identity: FieldAliases::new([
                "insta",
                "instagram",
                "instagram_username",
                "username",
                "user_name",
                "profile_url",
                "user.insta",
                "user.username",
            ]),
            tiktok_identity: FieldAliases::new([
                "tiktok",
                "tiktok_username",
                "username",
                "user_name",
                "profile_url",
                "user.tiktok",
                "user.username",
            ]),
            personnel_id: FieldAliases::new(["user_id", "nrp", "nip", "nrp_nip", "user.user_id"]),
            display_name: FieldAliases::new([
                "nama",
                "name",
                "nama_lengkap",
                "full_name",
                "user.nama",
            ]),
            rank: FieldAliases::new(["title", "pangkat", "rank", "user.title"]),
            division: FieldAliases::new(["divisi", "satfung", "division", "user.divisi"]),
            date: FieldAliases::new([
                "tanggal",
                "rekap.tanggal",
                "date",
                "created_at",
                "updated_at",
                "periode",
                "week",
                "bulan",
            ]),
            instagram_likes: FieldAliases::new([
                "likes_personil",
                "jumlah_like",
                "jumlahLike",
                "rekap.jumlah_like",
                "rekap.likes",
                "likes",
                "like_count",
                "total_like",
                "totalLikes",
            ]),
            tiktok_comments: FieldAliases::new([
                "komentar_personil",
                "jumlah_komentar",
                "jumlahKomentar",
                "rekap.jumlah_komentar",
                "rekap.comments",
                "comments",
                "comment_count",
                "total_komentar",
                "totalComments",
            ]),
        }
    }
}

/// Personnel ordering tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Literal names that always sort first, in this order
    pub name_overrides: Vec<String>,
    /// Rank table, highest rank first
    pub rank_order: Vec<String>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        let ranks = [
            "JENDERAL", "KOMJEN", "IRJEN", "BRIGJEN", "KOMBES", "AKBP", "KOMPOL", "AKP", "IPTU",
            "IPDA", "AIPTU", "AIPDA", "BRIPKA", "BRIGADIR", "BRIGPOL", "BRIPTU", "BRIPDA", "ABRIP",
            "ABRIPTU", "ABRIPDA", "BHARAKA", "BHARATU", "BHARADA", "PEMBINA", "PENATA",
            "PENGATUR", "JURU", "PPPK", "PHL",
        ];
        Self {
            name_overrides: Vec::new(),
            rank_order: ranks.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Compliance thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Fraction of the content target at which the personnel table marks
    /// a person as having reached the display threshold
    pub display_threshold_ratio: f64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            display_threshold_ratio: 0.5,
        }
    }
}

/// Summary output shaping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub top_personnel_limit: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            top_personnel_limit: 10,
        }
    }
}

impl EngineConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration following the resolution order in the module docs
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "Loading explicit config file");
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(env_path);
            if path.is_file() {
                debug!(path = %path.display(), "Loading config file from {}", CONFIG_ENV_VAR);
                return Self::from_file(&path);
            }
            warn!(
                path = %path.display(),
                "{} points at a missing file, ignoring", CONFIG_ENV_VAR
            );
        }

        if let Some(path) = user_config_path().filter(|p| p.is_file()) {
            debug!(path = %path.display(), "Loading user config file");
            return Self::from_file(&path);
        }

        debug!("No config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let ratio = self.compliance.display_threshold_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(Error::Config(format!(
                "compliance.display_threshold_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        if self.dates.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::Config(format!(
                "dates.utc_offset_minutes out of range: {}",
                self.dates.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

/// `<user config dir>/rekap/config.toml`, when the platform has one
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rekap").join("config.toml"))
}
