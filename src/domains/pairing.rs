//! Pairing (appairage) statistics: candidates proposed to partners.

use super::{
    CENTRE, Domain, DomainDescriptor, Endpoints, FORMATION, MetricField, PARTENAIRE, RateSpec,
    STATUT, metric,
};

const METRICS: &[MetricField] = &[
    metric("total"),
    metric("nb_candidats"),
    metric("nb_partenaires"),
    metric("transmis"),
    metric("en_attente"),
    metric("accepte"),
    metric("refuse"),
    metric("annule"),
    metric("a_faire"),
    metric("contrat_a_signer"),
    metric("contrat_en_attente"),
    metric("appairage_ok"),
];

const RATES: &[RateSpec] = &[
    RateSpec {
        output: "taux_transformation",
        numerator: &["appairage_ok"],
        denominator: &["total"],
    },
    RateSpec {
        output: "taux_acceptation",
        numerator: &["accepte"],
        denominator: &["accepte", "refuse"],
    },
];

pub static DESCRIPTOR: DomainDescriptor = DomainDescriptor {
    domain: Domain::Pairing,
    endpoints: Endpoints {
        overview: "appairage-stats/",
        grouped: "appairage-stats/grouped/",
        list: "appairages/",
        latest: "appairage-stats/latest/",
    },
    metrics: METRICS,
    rates: RATES,
    dimensions: &[CENTRE, FORMATION, PARTENAIRE, STATUT],
    date_aliases: &[
        ("date_from", "date_appairage__gte"),
        ("date_to", "date_appairage__lte"),
    ],
};
