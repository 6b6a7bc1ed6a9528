//! Filter codec: typed dashboard filters to backend query parameters.
//!
//! Every statistics endpoint accepts the same filter conventions, so the
//! encoding rules are uniform across domains:
//!
//! - `null`, empty strings and empty lists are never sent on the wire
//! - booleans become `"true"` / `"false"`
//! - string lists are joined with `,` under a `<key>__in` wire key
//! - `<field>_min` / `<field>_max` range bounds become `<field>__gte` /
//!   `<field>__lte`, the lookup names of the backend filter engine
//!
//! [`encode_for`] additionally applies a domain's own date aliases (e.g. the
//! prospection `date_from` filter targets `date_prospection__gte`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;

use crate::domains::DomainDescriptor;

/// Matches UI range bounds such as `date_debut_min` or `places_max`.
static RANGE_BOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<field>.+)_(?P<bound>min|max)$").expect("valid regex"));

const LIST_SUFFIX: &str = "__in";

// ---------------------------------------------------------------------------
// Filter values
// ---------------------------------------------------------------------------

/// Identifier reference to a related record (centre, formation, partner...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    Int(i64),
    Text(String),
}

/// A single UI-level filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Explicitly unset, never sent.
    Null,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    /// ISO calendar date, sent as `YYYY-MM-DD`.
    Date(NaiveDate),
    Id(IdRef),
    /// Multi-value selection, sent as a comma-joined `__in` lookup.
    List(Vec<String>),
}

impl FilterValue {
    /// Render the value as it travels on the wire, or `None` when the value
    /// must be omitted.
    fn to_wire(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            Self::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Self::Id(IdRef::Int(n)) => Some(n.to_string()),
            Self::Id(IdRef::Text(s)) if s.is_empty() => None,
            Self::Id(IdRef::Text(s)) => Some(s.clone()),
            Self::List(items) => {
                let joined = items
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(",");
                (!joined.is_empty()).then_some(joined)
            }
        }
    }
}

/// Integral finite numbers are sent without a fractional part. Non-finite
/// values pass through as their display text; validating them is the
/// caller's job.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<IdRef> for FilterValue {
    fn from(value: IdRef) -> Self {
        Self::Id(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

// ---------------------------------------------------------------------------
// Filter set
// ---------------------------------------------------------------------------

/// The filters currently selected by a dashboard widget.
///
/// Keys are kept sorted so that two sets with the same entries always encode
/// to the same wire parameters (and therefore the same cache key).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Wire params
// ---------------------------------------------------------------------------

/// Sanitized query parameters, ready to be appended to a request URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WireParams(BTreeMap<String, String>);

impl WireParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge `other` into `self`; keys of `other` win.
    pub fn extend(&mut self, other: &WireParams) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// URL-encoded `a=1&b=2` form, keys sorted.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }

    /// Cache key for a request issued with these parameters.
    ///
    /// Two requests share a key exactly when their effective parameters are
    /// identical.
    pub fn cache_key(&self) -> String {
        self.to_query_string()
    }
}

impl fmt::Display for WireParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a filter set with the uniform wire rules.
pub fn encode(filters: &FilterSet) -> WireParams {
    encode_with_aliases(filters, &[])
}

/// Encode a filter set for a specific statistics domain, applying the
/// domain's date aliases before the uniform rules.
pub fn encode_for(descriptor: &DomainDescriptor, filters: &FilterSet) -> WireParams {
    encode_with_aliases(filters, descriptor.date_aliases)
}

fn encode_with_aliases(filters: &FilterSet, aliases: &[(&str, &str)]) -> WireParams {
    let mut params = WireParams::new();

    for (key, value) in filters.iter() {
        let Some(wire_value) = value.to_wire() else {
            continue;
        };

        let wire_key = match aliases.iter().find(|(ui, _)| *ui == key) {
            Some((_, wire)) => (*wire).to_string(),
            None => wire_key(key, value),
        };

        params.insert(wire_key, wire_value);
    }

    params
}

fn wire_key(key: &str, value: &FilterValue) -> String {
    if matches!(value, FilterValue::List(_)) {
        return if key.ends_with(LIST_SUFFIX) {
            key.to_string()
        } else {
            format!("{key}{LIST_SUFFIX}")
        };
    }

    match RANGE_BOUND_RE.captures(key) {
        Some(caps) => {
            let lookup = if &caps["bound"] == "min" { "gte" } else { "lte" };
            format!("{}__{lookup}", &caps["field"])
        }
        None => key.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CLI parsing
// ---------------------------------------------------------------------------

/// Parse a `key=value` filter argument as typed on the command line.
///
/// `true`/`false` become booleans, `YYYY-MM-DD` a date, integers stay
/// integers, comma-separated values a list, and anything else is text.
pub fn parse_filter_arg(arg: &str) -> Result<(String, FilterValue)> {
    let (key, raw) = arg
        .split_once('=')
        .with_context(|| format!("expected key=value filter, got '{arg}'"))?;

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("filter '{arg}' has an empty key");
    }

    Ok((key.to_string(), parse_filter_value(raw.trim())))
}

fn parse_filter_value(raw: &str) -> FilterValue {
    if raw.is_empty() {
        return FilterValue::Null;
    }

    match raw.to_ascii_lowercase().as_str() {
        "true" => return FilterValue::Bool(true),
        "false" => return FilterValue::Bool(false),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return FilterValue::Date(date);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return FilterValue::Int(n);
    }
    if raw.contains(',') {
        return FilterValue::List(raw.split(',').map(|s| s.trim().to_string()).collect());
    }
    if let Ok(n) = raw.parse::<f64>()
        && n.is_finite()
    {
        return FilterValue::Number(n);
    }

    FilterValue::Text(raw.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
