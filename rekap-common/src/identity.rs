//! Personnel identity canonicalization
//!
//! The same person shows up as `budi_s`, `@Budi_S`,
//! `https://www.instagram.com/budi_s/?hl=id` or
//! `https://www.tiktok.com/@budi_s`. All of those canonicalize to the same
//! [`PersonnelIdentity`], and every merge/dedup site compares only that type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Social platform hosts whose profile URLs are unwrapped to the handle
const PROFILE_HOSTS: [&str; 4] = ["instagram.com", "tiktok.com", "instagr.am", "vm.tiktok.com"];

/// Leading path segments of post, reel and discovery URLs; never a handle
const NON_PROFILE_SEGMENTS: [&str; 7] = ["p", "reel", "reels", "tv", "video", "explore", "tag"];

/// Canonical comparison key for one person.
///
/// Empty is a valid "no identity" signal: such records are kept but never
/// deduplicated against each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonnelIdentity(String);

impl PersonnelIdentity {
    /// Canonicalize a handle, `@handle`, profile URL or NRP/NIP.
    ///
    /// # Examples
    ///
    /// ```
    /// use rekap_common::PersonnelIdentity;
    ///
    /// let a = PersonnelIdentity::parse("@Budi_S");
    /// let b = PersonnelIdentity::parse("https://www.instagram.com/budi_s/?hl=id");
    /// let c = PersonnelIdentity::parse("https://www.tiktok.com/@budi_s");
    /// assert_eq!(a, b);
    /// assert_eq!(b, c);
    /// assert!(PersonnelIdentity::parse("  ").is_empty());
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let handle = unwrap_profile_url(trimmed).unwrap_or(trimmed);
        let handle = handle.trim().trim_start_matches('@').trim();
        Self(handle.to_lowercase())
    }

    /// First non-empty identity among candidates, in order
    pub fn first_of<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .map(|c| Self::parse(c.as_ref()))
            .find(|id| !id.is_empty())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PersonnelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the first path segment after a known social-platform host.
///
/// Returns `None` when `value` is not a profile URL for a known host.
fn unwrap_profile_url(value: &str) -> Option<&str> {
    let lower = value.to_ascii_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);

    let host_end = without_scheme.find('/').unwrap_or(without_scheme.len());
    let host = &without_scheme[..host_end];
    let host = host.strip_prefix("www.").or_else(|| host.strip_prefix("m.")).unwrap_or(host);

    if !PROFILE_HOSTS.contains(&host) {
        return None;
    }

    // Slice the original text so the caller sees the original handle
    let offset = value.len() - without_scheme.len() + host_end;
    let path = &value[offset..];
    let path = path.split(['?', '#']).next().unwrap_or("");
    let mut segments = path.split('/').filter(|segment| !segment.trim().is_empty());

    let handle = match segments.next() {
        // instagram.com/stories/<handle>/<id>
        Some(first) if first.eq_ignore_ascii_case("stories") => segments.next().unwrap_or(""),
        Some(first) if NON_PROFILE_SEGMENTS.iter().any(|s| first.eq_ignore_ascii_case(s)) => "",
        Some(first) => first,
        None => "",
    };
    Some(handle)
}

/// Normalize a display name or title for comparison: trimmed, lowercased,
/// internal whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
