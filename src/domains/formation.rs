//! Formation (training session) statistics.

use super::{
    CENTRE, DEPARTEMENT, DimensionSpec, Domain, DomainDescriptor, Endpoints, MetricField,
    RateSpec, STATUT, metric,
};

const TYPE_OFFRE: DimensionSpec = DimensionSpec {
    name: "type_offre",
    aliases: &["type", "type_offre_id"],
    label_fields: &["type_offre_nom", "type_offre_libelle", "type_offre__nom"],
    id_field: Some("type_offre_id"),
    placeholder: "Type d'offre",
};

const METRICS: &[MetricField] = &[
    metric("nb_formations"),
    metric("nb_actives"),
    metric("nb_a_venir"),
    metric("nb_terminees"),
    metric("nb_annulees"),
    metric("places_prevues"),
    metric("inscrits"),
    metric("entrees"),
    metric("places_disponibles"),
    metric("nb_candidats"),
    metric("nb_entretiens"),
];

const RATES: &[RateSpec] = &[
    // Share of planned seats taken; may exceed 100 when overbooked.
    RateSpec {
        output: "taux_saturation",
        numerator: &["inscrits"],
        denominator: &["places_prevues"],
    },
    RateSpec {
        output: "taux_transformation",
        numerator: &["entrees"],
        denominator: &["inscrits"],
    },
];

pub static DESCRIPTOR: DomainDescriptor = DomainDescriptor {
    domain: Domain::Formation,
    endpoints: Endpoints {
        overview: "formation-stats/",
        grouped: "formation-stats/grouped/",
        list: "formations/",
        latest: "formation-stats/latest/",
    },
    metrics: METRICS,
    rates: RATES,
    dimensions: &[CENTRE, DEPARTEMENT, TYPE_OFFRE, STATUT],
    date_aliases: &[("date_from", "start_date__gte"), ("date_to", "start_date__lte")],
};
