//! Candidate statistics.

use super::{
    CENTRE, DEPARTEMENT, DimensionSpec, Domain, DomainDescriptor, Endpoints, FORMATION,
    MetricField, RateSpec, STATUT, metric,
};

const TYPE_CONTRAT: DimensionSpec = DimensionSpec {
    name: "type_contrat",
    aliases: &["contrat"],
    label_fields: &["type_contrat_display", "type_contrat_libelle"],
    id_field: None,
    placeholder: "Type de contrat",
};

const METRICS: &[MetricField] = &[
    metric("total"),
    metric("en_formation"),
    metric("en_accompagnement"),
    metric("en_appairage"),
    metric("en_attente"),
    metric("abandon"),
    metric("contrat_signe"),
    metric("inscrits_gespers"),
    metric("entretien_done"),
    metric("test_done"),
    metric("admissibles"),
    metric("rqth"),
];

const RATES: &[RateSpec] = &[
    RateSpec {
        output: "taux_admissibilite",
        numerator: &["admissibles"],
        denominator: &["total"],
    },
    RateSpec {
        output: "taux_contrat",
        numerator: &["contrat_signe"],
        denominator: &["total"],
    },
];

pub static DESCRIPTOR: DomainDescriptor = DomainDescriptor {
    domain: Domain::Candidate,
    endpoints: Endpoints {
        overview: "candidat-stats/",
        grouped: "candidat-stats/grouped/",
        list: "candidats/",
        latest: "candidat-stats/latest/",
    },
    metrics: METRICS,
    rates: RATES,
    dimensions: &[CENTRE, DEPARTEMENT, FORMATION, STATUT, TYPE_CONTRAT],
    date_aliases: &[
        ("date_from", "date_inscription__gte"),
        ("date_to", "date_inscription__lte"),
    ],
};
