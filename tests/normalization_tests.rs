/// Integration tests for the normalization pipeline.
///
/// Unit tests for each stage live in the module's `#[cfg(test)]` block. These
/// tests run raw payloads through the whole chain the way a dashboard widget
/// does: filters → wire params, payload → page/grouped rows → labels → totals.
use placement_stats::aggregate::{compute_totals, percentage, top_n, with_totals};
use placement_stats::domains::Domain;
use placement_stats::grouped::label::{EMPTY_LABEL, resolve_label};
use placement_stats::grouped::{GroupKey, normalize_grouped, normalize_row};
use placement_stats::normalize::{normalize_list, normalize_overview};
use placement_stats::query::{FilterSet, FilterValue, encode, encode_for};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_grouped_prospection_by_centre() {
    let descriptor = Domain::Prospection.descriptor();
    let payload = json!({
        "results": [{"group_key": 1, "total": "4", "acceptees": "2"}],
        "group_by": "centre"
    });

    let result = normalize_grouped(descriptor, &payload);
    assert_eq!(result.group_by.as_deref(), Some("centre"));
    assert_eq!(result.results.len(), 1);

    let row = &result.results[0];
    assert_eq!(row.group_key, GroupKey::Int(1));
    assert_eq!(row.metric("total"), 4.0);
    assert_eq!(row.metric("acceptees"), 2.0);
    assert_eq!(row.rate("taux_acceptation"), 50.0);
    assert_eq!(resolve_label(descriptor, row, "centre"), "Centre #1");
}

#[test]
fn scenario_bare_array_page() {
    let page = normalize_list(&json!([{"id": 1}, {"id": 2}]));
    assert_eq!(page.count, 2);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, None);
    assert_eq!(page.results, vec![json!({"id": 1}), json!({"id": 2})]);
}

#[test]
fn scenario_nested_empty_envelope() {
    let page = normalize_list(&json!({"data": {"results": [], "count": 0}}));
    assert_eq!(page.count, 0);
    assert!(page.results.is_empty());
}

#[test]
fn scenario_workshop_attendance_totals() {
    let descriptor = Domain::Workshop.descriptor();
    let rows = vec![
        normalize_row(descriptor, &json!({"group_key": "a", "present": 5, "absent": 0})),
        normalize_row(descriptor, &json!({"group_key": "b", "present": 3, "absent": 2})),
    ];

    let totals = compute_totals(descriptor, &rows);
    assert_eq!(totals.metric("present"), 8.0);
    assert_eq!(totals.metric("absent"), 2.0);
    assert_eq!(totals.rate("taux_presence"), 80.0);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn encode_never_emits_empty_values() {
    let filters = FilterSet::new()
        .with("centre", 3_i64)
        .with("statut", FilterValue::Null)
        .with("search", "")
        .with("types", FilterValue::List(Vec::new()))
        .with("departement", None::<String>)
        .with("actif", true);

    for descriptor in Domain::ALL.map(Domain::descriptor) {
        let params = encode_for(descriptor, &filters);
        for (key, value) in params.iter() {
            assert!(!value.is_empty(), "{key} encoded as empty string");
        }
        assert_eq!(params.len(), 2);
    }
    assert_eq!(encode(&filters).cache_key(), "actif=true&centre=3");
}

#[test]
fn every_envelope_counts_items_when_count_is_missing() {
    let items = json!([{"id": 1}, {"id": 2}, {"id": 3}]);
    let payloads = [
        items.clone(),
        json!({"results": items.clone()}),
        json!({"data": items.clone()}),
        json!({"data": {"results": items.clone()}}),
        json!({"data": {"data": items.clone()}}),
    ];

    for payload in &payloads {
        let page = normalize_list(payload);
        assert_eq!(page.count, 3, "payload: {payload}");
        assert_eq!(Value::Array(page.results), items, "payload: {payload}");
    }
}

#[test]
fn normalizers_absorb_garbage() {
    let garbage = [
        Value::Null,
        json!(42),
        json!("results"),
        json!({"results": "nope", "data": 7}),
        json!({"data": {"data": {"results": [1]}}}),
        json!([[[]]]),
    ];

    for payload in &garbage {
        let _ = normalize_list(payload);
        let _ = normalize_overview(payload);
        for descriptor in Domain::ALL.map(Domain::descriptor) {
            let _ = normalize_grouped(descriptor, payload);
            let row = normalize_row(descriptor, payload);
            for metric in descriptor.metrics {
                let value = row.metric(metric.name);
                assert!(value.is_finite() && value >= 0.0);
            }
            for rate in descriptor.rates {
                assert!(row.rate(rate.output).is_finite());
            }
        }
    }
}

#[test]
fn metrics_are_finite_and_non_negative() {
    let descriptor = Domain::Pairing.descriptor();
    let row = normalize_row(
        descriptor,
        &json!({
            "group_key": 9,
            "total": "1e400",
            "accepte": -3,
            "refuse": "  2 ",
            "transmis": {"n": 1},
            "taux_acceptation": "NaN"
        }),
    );

    for metric in descriptor.metrics {
        let value = row.metric(metric.name);
        assert!(value.is_finite() && value >= 0.0, "{} = {value}", metric.name);
    }
    assert_eq!(row.metric("refuse"), 2.0);
    assert_eq!(row.rate("taux_acceptation"), 0.0);
}

#[test]
fn empty_totals_are_zero() {
    for descriptor in Domain::ALL.map(Domain::descriptor) {
        let totals = compute_totals(descriptor, &[]);
        assert!(totals.metrics.values().all(|v| *v == 0.0));
        assert!(totals.rates.values().all(|v| *v == 0.0));
        assert_eq!(totals.metrics.len(), descriptor.metrics.len());
        assert_eq!(totals.rates.len(), descriptor.rates.len());
    }
}

#[test]
fn totals_ignore_row_order() {
    let descriptor = Domain::Formation.descriptor();
    let rows: Vec<_> = [(10, 20, 5), (0, 0, 0), (7, 7, 7), (3, 40, 1)]
        .iter()
        .map(|(inscrits, places, entrees)| {
            normalize_row(
                descriptor,
                &json!({"inscrits": inscrits, "places_prevues": places, "entrees": entrees}),
            )
        })
        .collect();

    let forward = compute_totals(descriptor, &rows);
    let mut reversed = rows.clone();
    reversed.reverse();
    let mut rotated = rows.clone();
    rotated.rotate_left(2);

    assert_eq!(forward, compute_totals(descriptor, &reversed));
    assert_eq!(forward, compute_totals(descriptor, &rotated));
}

#[test]
fn totals_rates_are_rederived_not_averaged() {
    let descriptor = Domain::Workshop.descriptor();
    let rows = vec![
        normalize_row(descriptor, &json!({"present": 0, "absent": 0})),
        normalize_row(descriptor, &json!({"present": 10, "absent": 0})),
    ];

    let totals = compute_totals(descriptor, &rows);
    assert_eq!(totals.rate("taux_presence"), 100.0);
    assert_eq!(percentage(10.0, 10.0), 100.0);
}

#[test]
fn label_prefers_join_name_over_id_placeholder() {
    let descriptor = Domain::Formation.descriptor();
    let row = normalize_row(
        descriptor,
        &json!({"group_key": 4, "group_label": "", "centre_nom": "Lyon", "centre_id": 4}),
    );
    assert_eq!(resolve_label(descriptor, &row, "centre"), "Lyon");

    let anonymous = normalize_row(descriptor, &json!({"group_label": "  "}));
    assert_eq!(resolve_label(descriptor, &anonymous, "centre"), EMPTY_LABEL);
}

// ---------------------------------------------------------------------------
// Widget flow
// ---------------------------------------------------------------------------

#[test]
fn grouped_table_flow_with_backend_total_row() {
    let descriptor = Domain::Candidate.descriptor();
    let payload = json!({
        "group_by": "statut",
        "results": [
            {"group_key": "actif", "group_label": "Actif", "total": 12, "admissibles": 6},
            {"group_key": "inactif", "group_label": "Inactif", "total": 8, "admissibles": 1},
            {"group_key": "Total", "total": 20, "admissibles": 7}
        ]
    });

    let rows = with_totals(descriptor, normalize_grouped(descriptor, &payload).results);
    assert_eq!(rows.len(), 3, "backend total row must not be duplicated");

    let top = top_n(&rows, "total", 5);
    let labels: Vec<String> = top
        .iter()
        .map(|row| resolve_label(descriptor, row, "statut"))
        .collect();
    assert_eq!(labels, vec!["Actif", "Inactif"]);
}

#[test]
fn date_filters_follow_domain_aliases() {
    let filters = FilterSet::new().with(
        "date_from",
        FilterValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
    );

    let prospection = encode_for(Domain::Prospection.descriptor(), &filters);
    assert_eq!(prospection.get("date_prospection__gte"), Some("2024-01-31"));

    let generic = encode(&filters);
    assert_eq!(generic.get("date_from"), Some("2024-01-31"));
}
