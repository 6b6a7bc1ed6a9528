//! Display labels for grouped rows.
//!
//! Fallback order, first non-blank candidate wins:
//!
//! 1. the row's `group_label`
//! 2. a denormalized join field of the dimension (`centre_nom`...)
//! 3. `"<Placeholder> #<id>"` from the dimension's foreign key, else the
//!    group key
//! 4. `"—"`
//!
//! A friendly name anywhere in the row must win over an id placeholder,
//! even when the backend leaves `group_label` empty for a dimension.

use super::GroupedRow;
use crate::domains::DomainDescriptor;
use crate::normalize::coerce;

/// Label shown when a row carries nothing usable.
pub const EMPTY_LABEL: &str = "—";

/// Resolve the display label of `row` grouped by `dimension`.
///
/// Unknown dimensions skip the join fields and fall back to a bare
/// `#<key>` placeholder.
pub fn resolve_label(descriptor: &DomainDescriptor, row: &GroupedRow, dimension: &str) -> String {
    if let Some(label) = row
        .group_label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        return label.to_string();
    }

    let spec = descriptor.dimension(dimension);

    if let Some(name) = spec
        .into_iter()
        .flat_map(|s| s.label_fields.iter())
        .find_map(|f| row.fields.get(*f).and_then(coerce::text))
    {
        return name;
    }

    let id = spec
        .and_then(|s| s.id_field)
        .and_then(|f| row.fields.get(f))
        .and_then(coerce::text)
        .or_else(|| key_text(row));

    match (spec, id) {
        (Some(spec), Some(id)) => format!("{} #{id}", spec.placeholder),
        (None, Some(id)) => format!("#{id}"),
        (_, None) => EMPTY_LABEL.to_string(),
    }
}

fn key_text(row: &GroupedRow) -> Option<String> {
    let key = row.group_key.to_string();
    (!key.trim().is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::Domain;
    use crate::grouped::normalize_row;
    use serde_json::{Value, json};

    fn row(domain: Domain, raw: Value) -> GroupedRow {
        normalize_row(domain.descriptor(), &raw)
    }

    #[test]
    fn group_label_wins() {
        let r = row(Domain::Formation, json!({"group_key": 1, "group_label": "Lyon Gerland", "centre_nom": "Lyon"}));
        assert_eq!(resolve_label(Domain::Formation.descriptor(), &r, "centre"), "Lyon Gerland");
    }

    #[test]
    fn blank_group_label_falls_back_to_join_field() {
        let r = row(
            Domain::Formation,
            json!({"group_key": 1, "group_label": "  ", "centre_nom": "Lyon", "centre_id": 1}),
        );
        assert_eq!(resolve_label(Domain::Formation.descriptor(), &r, "centre"), "Lyon");
    }

    #[test]
    fn numeric_group_label_is_kept() {
        let r = row(
            Domain::Formation,
            json!({"group_key": 7, "group_label": 2024, "centre_nom": "Lyon"}),
        );
        assert_eq!(r.group_label.as_deref(), Some("2024"));
        assert_eq!(resolve_label(Domain::Formation.descriptor(), &r, "centre"), "2024");
    }

    #[test]
    fn join_fields_are_tried_in_order() {
        let r = row(
            Domain::Formation,
            json!({"group_key": 1, "centre_nom": "", "centre__nom": "Villeurbanne"}),
        );
        assert_eq!(resolve_label(Domain::Formation.descriptor(), &r, "centre"), "Villeurbanne");
    }

    #[test]
    fn id_placeholder_uses_foreign_key_then_group_key() {
        let descriptor = Domain::Prospection.descriptor();
        let with_fk = row(Domain::Prospection, json!({"group_key": "x", "partenaire_id": 12}));
        assert_eq!(resolve_label(descriptor, &with_fk, "partenaire"), "Partenaire #12");

        let key_only = row(Domain::Prospection, json!({"group_key": 1, "total": "4"}));
        assert_eq!(resolve_label(descriptor, &key_only, "centre"), "Centre #1");
    }

    #[test]
    fn dimension_aliases_resolve_the_same_chain() {
        let r = row(Domain::Candidate, json!({"group_key": 2, "centre_nom": "Paris"}));
        assert_eq!(resolve_label(Domain::Candidate.descriptor(), &r, "Center"), "Paris");
    }

    #[test]
    fn unknown_dimension_uses_bare_key() {
        let r = row(Domain::Workshop, json!({"group_key": 5, "centre_nom": "Paris"}));
        assert_eq!(resolve_label(Domain::Workshop.descriptor(), &r, "planete"), "#5");
    }

    #[test]
    fn nothing_usable_gives_em_dash() {
        let r = row(Domain::Workshop, json!({"group_key": null}));
        assert_eq!(resolve_label(Domain::Workshop.descriptor(), &r, "centre"), EMPTY_LABEL);
        assert_eq!(resolve_label(Domain::Workshop.descriptor(), &r, "planete"), EMPTY_LABEL);
    }

    #[test]
    fn numeric_join_fields_make_labels() {
        let r = row(Domain::Candidate, json!({"group_key": "75", "departement": 75}));
        assert_eq!(resolve_label(Domain::Candidate.descriptor(), &r, "departement"), "75");
    }
}
