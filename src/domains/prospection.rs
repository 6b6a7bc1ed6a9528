//! Prospection (employer outreach) statistics.

use super::{
    CENTRE, DimensionSpec, Domain, DomainDescriptor, Endpoints, FORMATION, MetricField,
    PARTENAIRE, RateSpec, STATUT, metric,
};

const OWNER: DimensionSpec = DimensionSpec {
    name: "owner",
    aliases: &["user", "owner_id"],
    label_fields: &["owner_full_name", "owner_username"],
    id_field: Some("owner_id"),
    placeholder: "Utilisateur",
};

const OBJECTIF: DimensionSpec = DimensionSpec {
    name: "objectif",
    aliases: &["objective"],
    label_fields: &["objectif_display", "objectif_libelle"],
    id_field: None,
    placeholder: "Objectif",
};

const METRICS: &[MetricField] = &[
    metric("total"),
    metric("actives"),
    metric("a_relancer"),
    metric("en_cours"),
    metric("acceptees"),
    metric("refusees"),
    metric("annulees"),
    metric("non_renseigne"),
];

const RATES: &[RateSpec] = &[RateSpec {
    output: "taux_acceptation",
    numerator: &["acceptees"],
    denominator: &["total"],
}];

pub static DESCRIPTOR: DomainDescriptor = DomainDescriptor {
    domain: Domain::Prospection,
    endpoints: Endpoints {
        overview: "prospection-stats/",
        grouped: "prospection-stats/grouped/",
        list: "prospections/",
        latest: "prospection-stats/latest/",
    },
    metrics: METRICS,
    rates: RATES,
    dimensions: &[CENTRE, FORMATION, PARTENAIRE, OWNER, STATUT, OBJECTIF],
    date_aliases: &[
        ("date_from", "date_prospection__gte"),
        ("date_to", "date_prospection__lte"),
    ],
};
