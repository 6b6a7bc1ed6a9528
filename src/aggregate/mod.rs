//! Client-side totals and derived rates across grouped rows.
//!
//! Totals are plain sums of each metric in a single pass. Rates on the
//! totals row are re-derived from the summed numerators and denominators,
//! never averaged across rows: averaging per-group percentages is wrong as
//! soon as groups differ in size.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Map;

use crate::domains::DomainDescriptor;
use crate::grouped::{GroupKey, GroupedRow};

/// Key of the synthetic totals row.
pub const TOTAL_KEY: &str = "total";

/// Label of the synthetic totals row.
pub const TOTAL_LABEL: &str = "Total";

/// `part / whole * 100`, or `0` when `whole` is zero or either side is not
/// finite.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() || !part.is_finite() {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Sum every metric of `rows` and re-derive every rate.
///
/// Rows already keyed `total` are not summed again. An empty input gives a
/// totals row where every metric and rate is `0`.
pub fn compute_totals(descriptor: &DomainDescriptor, rows: &[GroupedRow]) -> GroupedRow {
    let mut metrics: BTreeMap<String, f64> = descriptor
        .metrics
        .iter()
        .map(|m| (m.name.to_string(), 0.0))
        .collect();

    for row in rows.iter().filter(|r| !r.is_total()) {
        for (name, sum) in metrics.iter_mut() {
            *sum += row.metric(name);
        }
    }

    let rates = descriptor
        .rates
        .iter()
        .map(|r| {
            let value = r.derive(|f| metrics.get(f).copied().unwrap_or(0.0));
            (r.output.to_string(), value)
        })
        .collect();

    GroupedRow {
        group_key: GroupKey::Text(TOTAL_KEY.to_string()),
        group_label: Some(TOTAL_LABEL.to_string()),
        metrics,
        rates,
        fields: Map::new(),
    }
}

/// Append a totals row to `rows`, unless the backend already sent one.
pub fn with_totals(descriptor: &DomainDescriptor, mut rows: Vec<GroupedRow>) -> Vec<GroupedRow> {
    if rows.iter().any(GroupedRow::is_total) {
        return rows;
    }
    let totals = compute_totals(descriptor, &rows);
    rows.push(totals);
    rows
}

/// The `n` rows with the highest `field` (metric or rate), highest first.
///
/// Totals rows are excluded; ties keep backend order.
pub fn top_n<'a>(rows: &'a [GroupedRow], field: &str, n: usize) -> Vec<&'a GroupedRow> {
    let mut ranked: Vec<&GroupedRow> = rows.iter().filter(|r| !r.is_total()).collect();
    ranked.sort_by(|a, b| {
        b.value(field)
            .partial_cmp(&a.value(field))
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// Share of `row` in `totals` for one metric, as a percentage.
pub fn share_of_total(row: &GroupedRow, totals: &GroupedRow, metric: &str) -> f64 {
    percentage(row.metric(metric), totals.metric(metric))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
