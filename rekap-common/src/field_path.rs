//! Field path resolution over untyped upstream records
//!
//! The upstream feed has no schema contract: the same logical value arrives
//! under many names, nested under different container keys, and sometimes
//! inside a string that is itself JSON-encoded. Callers describe where a
//! value may live with an ordered [`FieldAliases`] table and read it through
//! a [`RecordView`], which is the only type allowed to touch raw keys.
//!
//! # Path Syntax
//! - `likes`: top-level key
//! - `rekap.tanggal`: nested object key (a literal top-level key
//!   `"rekap.tanggal"` is tried first)
//! - `data.0.likes`: numeric segments index into arrays
//!
//! A string met at an intermediate segment is decoded as JSON once per
//! record and the rest of the path is resolved against the decoded value.

use crate::numeric::parse_numeric_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// One candidate location for a logical value (dot-separated for nesting)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path. Empty segments are dropped.
    pub fn new(path: &str) -> Self {
        let raw = path.trim().to_string();
        let segments = raw
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { raw, segments }
    }

    /// Path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        FieldPath::new(&value)
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        FieldPath::new(value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ordered candidate paths for one logical value, most specific first.
///
/// Precedence is significant: personnel-level names (`likes_personil`) must
/// be listed before aggregate names (`total_like`), because aggregate
/// fields may describe a different population than the per-person field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAliases(Vec<FieldPath>);

impl FieldAliases {
    /// Build an alias table from paths in precedence order
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(paths.into_iter().map(|p| FieldPath::new(p.as_ref())).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of walking a path as far as possible without decoding
enum Descent<'v> {
    Found(&'v Value),
    /// A string sits at `depth` with segments still left to resolve
    Encoded { depth: usize, text: &'v str },
    Missing,
}

fn descend<'v>(mut current: &'v Value, segments: &[String]) -> Descent<'v> {
    for (depth, segment) in segments.iter().enumerate() {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Descent::Missing,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return Descent::Missing,
            },
            Value::String(text) => return Descent::Encoded { depth, text },
            _ => return Descent::Missing,
        };
    }
    Descent::Found(current)
}

/// Read-only view over one raw record with a per-record JSON decode cache.
///
/// Not `Send`: the decode cache belongs to a single record and a single
/// aggregation call.
pub struct RecordView<'a> {
    record: &'a Value,
    /// Decoded JSON sub-documents keyed by the dotted prefix that held them
    decoded: HashMap<String, Option<Rc<Value>>>,
}

impl<'a> RecordView<'a> {
    /// Wrap a raw record. Non-object records resolve nothing.
    pub fn new(record: &'a Value) -> Self {
        Self {
            record,
            decoded: HashMap::new(),
        }
    }

    /// The underlying record
    pub fn raw(&self) -> &'a Value {
        self.record
    }

    /// Look up a single path. `null` counts as absent.
    pub fn lookup(&mut self, path: &FieldPath) -> Option<Value> {
        let root = self.record;
        if !root.is_object() || path.segments().is_empty() {
            return None;
        }

        if path.is_nested() {
            if let Some(flat) = root.get(path.as_str()).filter(|v| !v.is_null()) {
                return Some(flat.clone());
            }
        }

        let segments = path.segments();
        let mut consumed = 0;
        let mut holder: Option<Rc<Value>> = None;

        loop {
            let base: &Value = match &holder {
                Some(decoded) => decoded.as_ref(),
                None => root,
            };
            match descend(base, &segments[consumed..]) {
                Descent::Found(value) if value.is_null() => return None,
                Descent::Found(value) => return Some(value.clone()),
                Descent::Missing => return None,
                Descent::Encoded { depth, text } => {
                    let text = text.to_string();
                    consumed += depth;
                    let key = segments[..consumed].join(".");
                    holder = Some(self.decode_cached(key, &text)?);
                }
            }
        }
    }

    fn decode_cached(&mut self, key: String, text: &str) -> Option<Rc<Value>> {
        self.decoded
            .entry(key)
            .or_insert_with(|| {
                serde_json::from_str::<Value>(text.trim())
                    .ok()
                    .filter(|v| v.is_object() || v.is_array())
                    .map(Rc::new)
            })
            .clone()
    }

    /// First alias whose value `extract` accepts, with the alias index
    pub fn resolve_with<T, F>(&mut self, aliases: &FieldAliases, mut extract: F) -> Option<(usize, T)>
    where
        F: FnMut(&Value) -> Option<T>,
    {
        aliases
            .iter()
            .enumerate()
            .find_map(|(rank, path)| self.lookup(path).and_then(|v| extract(&v)).map(|t| (rank, t)))
    }

    /// First present, numeric-parseable value and the rank of the alias
    /// that supplied it
    pub fn resolve_number_ranked(&mut self, aliases: &FieldAliases) -> Option<(usize, f64)> {
        self.resolve_with(aliases, parse_numeric_value)
    }

    /// First present, numeric-parseable value, else 0
    pub fn resolve_number(&mut self, aliases: &FieldAliases) -> f64 {
        self.resolve_number_ranked(aliases).map(|(_, v)| v).unwrap_or(0.0)
    }

    /// First non-blank scalar rendered as text (numbers included, since
    /// NRP/NIP identifiers often arrive as JSON numbers)
    pub fn resolve_text(&mut self, aliases: &FieldAliases) -> Option<String> {
        self.resolve_with(aliases, value_as_text).map(|(_, s)| s)
    }
}

/// Render a scalar as trimmed text; blank strings and containers yield `None`
pub fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// One-shot numeric resolution for callers that do not need the cache
pub fn resolve_number(record: &Value, aliases: &FieldAliases) -> f64 {
    RecordView::new(record).resolve_number(aliases)
}
