//! Workshop (atelier TRE) attendance statistics.

use super::{
    CENTRE, DEPARTEMENT, DimensionSpec, Domain, DomainDescriptor, Endpoints, MetricField,
    RateSpec, metric,
};

const TYPE_ATELIER: DimensionSpec = DimensionSpec {
    name: "type_atelier",
    aliases: &["type"],
    label_fields: &["type_atelier_display", "type_atelier_libelle"],
    id_field: None,
    placeholder: "Atelier",
};

const METRICS: &[MetricField] = &[
    metric("nb_ateliers"),
    metric("candidats_uniques"),
    metric("inscrits"),
    metric("present"),
    metric("absent"),
    metric("excuse"),
    metric("non_renseigne"),
];

const RATES: &[RateSpec] = &[RateSpec {
    output: "taux_presence",
    numerator: &["present"],
    denominator: &["present", "absent"],
}];

pub static DESCRIPTOR: DomainDescriptor = DomainDescriptor {
    domain: Domain::Workshop,
    endpoints: Endpoints {
        overview: "ateliertre-stats/",
        grouped: "ateliertre-stats/grouped/",
        list: "ateliers-tre/",
        latest: "ateliertre-stats/latest/",
    },
    metrics: METRICS,
    rates: RATES,
    dimensions: &[CENTRE, DEPARTEMENT, TYPE_ATELIER],
    date_aliases: &[
        ("date_from", "date_atelier__gte"),
        ("date_to", "date_atelier__lte"),
    ],
};
