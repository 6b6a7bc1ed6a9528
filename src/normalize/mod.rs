//! Response normalizer for list endpoints.
//!
//! The backend has gone through several envelope conventions for paginated
//! lists. Rather than branching at every call site, every payload is
//! normalized once at the boundary into a [`Page`].
//!
//! Detection is an ordered table of envelope rules; the first rule that
//! recognises the payload wins:
//!
//! 1. bare array
//! 2. `{ results: [...], count?, next?, previous? }`
//! 3. `{ data: [...], count?, next?, previous? }`
//! 4. `{ data: <rule 2 or 3> }`: one level of nesting only
//!
//! Anything else is an empty page. That is a degradation policy, not an
//! error: transport failures are reported separately by the fetch layer.
//! New envelope shapes go in as new rules ahead of the fallback, never by
//! reordering existing ones.

pub mod coerce;
mod overview;

pub use overview::{Overview, normalize_overview};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Canonical paginated result.
///
/// `results.len() <= count` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T = Value> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    /// The empty page returned for unrecognised payloads.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

impl Page<Value> {
    /// Deserialize every item into `T`, skipping items that do not fit.
    ///
    /// `count` and the cursors are kept as reported by the backend.
    pub fn into_typed<T: DeserializeOwned>(self) -> Page<T> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self
                .results
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope rules
// ---------------------------------------------------------------------------

type EnvelopeRule = fn(&Value) -> Option<Page>;

/// Detection order is load-bearing: changing it would silently reclassify
/// historical payloads.
const ENVELOPE_RULES: &[(&str, EnvelopeRule)] = &[
    ("bare-array", bare_array),
    ("results", results_envelope),
    ("data", data_envelope),
    ("nested-data", nested_envelope),
];

/// Normalize any list payload into a [`Page`]. Never panics.
pub fn normalize_list(payload: &Value) -> Page {
    detect_envelope(payload)
        .map(|(_, page)| page)
        .unwrap_or_default()
}

/// Normalize and report which envelope rule matched, if any.
pub fn detect_envelope(payload: &Value) -> Option<(&'static str, Page)> {
    ENVELOPE_RULES
        .iter()
        .find_map(|(name, rule)| rule(payload).map(|page| (*name, page)))
}

fn bare_array(payload: &Value) -> Option<Page> {
    let items = payload.as_array()?;
    Some(Page {
        count: items.len(),
        next: None,
        previous: None,
        results: items.clone(),
    })
}

fn results_envelope(payload: &Value) -> Option<Page> {
    let obj = payload.as_object()?;
    let items = obj.get("results")?.as_array()?;
    Some(page_from_envelope(obj, items))
}

fn data_envelope(payload: &Value) -> Option<Page> {
    let obj = payload.as_object()?;
    let items = obj.get("data")?.as_array()?;
    Some(page_from_envelope(obj, items))
}

fn nested_envelope(payload: &Value) -> Option<Page> {
    let inner = payload.as_object()?.get("data")?;
    if !inner.is_object() {
        return None;
    }
    results_envelope(inner).or_else(|| data_envelope(inner))
}

fn page_from_envelope(obj: &Map<String, Value>, items: &[Value]) -> Page {
    // An explicit count below the number of items would break the page
    // invariant; the items are what we actually hold.
    let count = obj
        .get("count")
        .and_then(coerce::count)
        .map_or(items.len(), |c| c.max(items.len()));

    Page {
        count,
        next: coerce::cursor(obj.get("next")),
        previous: coerce::cursor(obj.get("previous")),
        results: items.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn bare_array_counts_items() {
        let page = normalize_list(&json!([{"id": 1}, {"id": 2}]));
        assert_eq!(page.count, 2);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
        assert_eq!(page.results, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn results_envelope_keeps_count_and_cursors() {
        let page = normalize_list(&json!({
            "count": 42,
            "next": "https://api/x/?page=3",
            "previous": "https://api/x/?page=1",
            "results": [{"id": 7}]
        }));
        assert_eq!(page.count, 42);
        assert_eq!(page.next.as_deref(), Some("https://api/x/?page=3"));
        assert_eq!(page.previous.as_deref(), Some("https://api/x/?page=1"));
        assert_eq!(page.results.len(), 1);
    }

    #[test]
    fn results_envelope_without_count_uses_length() {
        let page = normalize_list(&json!({"results": [1, 2, 3], "next": 5}));
        assert_eq!(page.count, 3);
        assert_eq!(page.next, None);
    }

    #[test]
    fn data_envelope_is_recognised() {
        let (rule, page) = detect_envelope(&json!({"data": [{"id": 1}], "count": 10})).unwrap();
        assert_eq!(rule, "data");
        assert_eq!(page.count, 10);
    }

    #[test]
    fn results_rule_wins_over_data_rule() {
        let (rule, page) =
            detect_envelope(&json!({"results": [1], "data": [1, 2]})).unwrap();
        assert_eq!(rule, "results");
        assert_eq!(page.results, vec![json!(1)]);
    }

    #[test]
    fn nested_envelope_is_unwrapped_once() {
        let page = normalize_list(&json!({"data": {"results": [], "count": 0}}));
        assert_eq!(page, Page::empty());

        let (rule, page) =
            detect_envelope(&json!({"data": {"data": [{"id": 3}], "next": null}})).unwrap();
        assert_eq!(rule, "nested-data");
        assert_eq!(page.count, 1);
    }

    #[test]
    fn deeper_nesting_is_not_followed() {
        let payload = json!({"data": {"data": {"results": [1, 2]}}});
        assert!(detect_envelope(&payload).is_none());
        assert_eq!(normalize_list(&payload), Page::empty());
    }

    #[test]
    fn explicit_count_below_length_is_raised() {
        let page = normalize_list(&json!({"results": [1, 2, 3], "count": 1}));
        assert_eq!(page.count, 3);
    }

    #[test]
    fn unrecognised_payloads_degrade_to_empty() {
        for payload in [
            json!(null),
            json!(42),
            json!("results"),
            json!({}),
            json!({"results": "nope"}),
            json!({"data": null}),
            json!({"data": {"items": []}}),
        ] {
            assert_eq!(normalize_list(&payload), Page::empty(), "{payload}");
        }
    }

    #[test]
    fn into_typed_skips_mismatched_items() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
        }

        let page = normalize_list(&json!({"count": 3, "results": [{"id": 1}, {"id": "x"}, {"id": 2}]}))
            .into_typed::<Item>();
        assert_eq!(page.count, 3);
        assert_eq!(page.results, vec![Item { id: 1 }, Item { id: 2 }]);
    }
}
