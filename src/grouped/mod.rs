//! Grouped-row normalization: one engine for every statistical domain.
//!
//! A grouped statistics endpoint returns one aggregate per value of a
//! grouping dimension (one row per centre, per status...). Rows arrive
//! loosely typed: metrics as numbers or numeric strings, missing fields,
//! the key under `group_key` or `id`. [`normalize_row`] coerces a raw row
//! into a strict [`GroupedRow`] using the domain's [`DomainDescriptor`]:
//!
//! - every declared metric is present, finite and `>= 0` (default `0`)
//! - every declared rate is present and finite; when the backend does not
//!   supply it, it is derived from the row's own metrics
//! - the remaining scalar fields are kept for label resolution
//!
//! Normalization never fails: type mismatches degrade to defaults.

pub mod label;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::aggregate::TOTAL_KEY;
use crate::domains::DomainDescriptor;
use crate::normalize::{self, coerce};

// ---------------------------------------------------------------------------
// Group key
// ---------------------------------------------------------------------------

/// Opaque value identifying a group within one response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Int(i64),
    Text(String),
    None,
}

impl GroupKey {
    /// Read a key from a raw JSON value. Blank strings and non-scalars have
    /// no key.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Text(n.to_string()),
            },
            Value::String(s) if !s.trim().is_empty() => Self::Text(s.trim().to_string()),
            _ => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether this is a totals key (`"total"`, any case).
    pub fn is_total(&self) -> bool {
        matches!(self, Self::Text(s) if s.eq_ignore_ascii_case(TOTAL_KEY))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Grouped row / result
// ---------------------------------------------------------------------------

/// One normalized aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedRow {
    pub group_key: GroupKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    pub rates: BTreeMap<String, f64>,
    /// Denormalized join fields (`centre_nom`, `centre_id`...).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

impl GroupedRow {
    /// A metric value, `0` if the field is not declared for the domain.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }

    /// A rate value, `0` if the rate is not declared for the domain.
    pub fn rate(&self, name: &str) -> f64 {
        self.rates.get(name).copied().unwrap_or(0.0)
    }

    /// A metric or rate value by name.
    pub fn value(&self, name: &str) -> f64 {
        self.metrics
            .get(name)
            .or_else(|| self.rates.get(name))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn is_total(&self) -> bool {
        self.group_key.is_total()
    }
}

/// A normalized grouped response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedResult {
    /// Echo of the `by=` dimension, when the backend sends it.
    pub group_by: Option<String>,
    /// Rows in backend order.
    pub results: Vec<GroupedRow>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one raw grouped row for the given domain.
pub fn normalize_row(descriptor: &DomainDescriptor, raw: &Value) -> GroupedRow {
    let obj = raw.as_object();
    let field = |name: &str| obj.and_then(|o| o.get(name));

    let metrics: BTreeMap<String, f64> = descriptor
        .metrics
        .iter()
        .map(|m| {
            let value = field(m.name)
                .and_then(coerce::number)
                .map_or(m.default, |v| v.max(0.0));
            (m.name.to_string(), value)
        })
        .collect();

    let rates: BTreeMap<String, f64> = descriptor
        .rates
        .iter()
        .map(|r| {
            let value = field(r.output)
                .and_then(coerce::number)
                .unwrap_or_else(|| r.derive(|f| metrics.get(f).copied().unwrap_or(0.0)));
            (r.output.to_string(), value)
        })
        .collect();

    let group_key = match field("group_key").map(GroupKey::from_value) {
        Some(key) if !key.is_none() => key,
        _ => field("id").map_or(GroupKey::None, GroupKey::from_value),
    };

    let group_label = field("group_label").and_then(coerce::text);

    let fields = obj
        .map(|o| {
            o.iter()
                .filter(|(k, v)| {
                    !matches!(k.as_str(), "group_key" | "group_label")
                        && !descriptor.is_numeric_field(k)
                        && !v.is_null()
                        && !v.is_array()
                        && !v.is_object()
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    GroupedRow {
        group_key,
        group_label,
        metrics,
        rates,
        fields,
    }
}

/// Normalize a whole grouped response (`{ group_by, results }`, or any list
/// envelope the list normalizer accepts).
pub fn normalize_grouped(descriptor: &DomainDescriptor, payload: &Value) -> GroupedResult {
    let group_by = payload
        .get("group_by")
        .or_else(|| payload.get("data")?.get("group_by"))
        .and_then(coerce::text);

    let results = normalize::normalize_list(payload)
        .results
        .iter()
        .map(|raw| normalize_row(descriptor, raw))
        .collect();

    GroupedResult { group_by, results }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
