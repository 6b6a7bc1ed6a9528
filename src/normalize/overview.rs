//! Overview (KPI) payload normalization.
//!
//! Overview endpoints answer `{ "kpis": { ... } }` where values are scalars
//! or one more level of scalars (`{"kpis": {"statuts": {"actif": 3}}}`).
//! Older backends wrapped the same object in `data`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::coerce;

/// Nested KPI objects deeper than this are ignored.
const MAX_DEPTH: usize = 3;

/// Flattened overview KPIs, keyed by dotted path (`statuts.actif`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    pub kpis: BTreeMap<String, f64>,
}

impl Overview {
    /// A KPI value, `0` when absent.
    pub fn kpi(&self, name: &str) -> f64 {
        self.kpis.get(name).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.kpis.is_empty()
    }
}

/// Normalize an overview payload. Non-numeric KPI values are skipped;
/// unrecognised payloads give an empty overview.
pub fn normalize_overview(payload: &Value) -> Overview {
    let kpis = payload
        .get("kpis")
        .and_then(Value::as_object)
        .or_else(|| payload.get("data")?.get("kpis")?.as_object());

    let mut overview = Overview::default();
    if let Some(kpis) = kpis {
        flatten_into(&mut overview.kpis, "", kpis, 0);
    }
    overview
}

fn flatten_into(out: &mut BTreeMap<String, f64>, prefix: &str, obj: &Map<String, Value>, depth: usize) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(inner) if depth + 1 < MAX_DEPTH => {
                flatten_into(out, &path, inner, depth + 1);
            }
            other => {
                if let Some(n) = coerce::number(other) {
                    out.insert(path, n);
                }
            }
        }
    }
}
