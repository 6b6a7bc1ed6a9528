//! Statistical domains and their declarative descriptors.
//!
//! Every dashboard domain (formations, candidates, prospections, pairings,
//! workshops) follows the same normalize / label / aggregate pattern. What
//! differs is data, not logic, so each domain is described once by a static
//! [`DomainDescriptor`]:
//!
//! - the metric fields a grouped row carries, with their defaults
//! - the rates derived from those metrics (numerator / denominator sums)
//! - the grouping dimensions, each with its label fallback chain
//! - the endpoint paths and date filter aliases
//!
//! The generic engine in [`crate::grouped`] and [`crate::aggregate`] is
//! instantiated with these descriptors.

pub mod candidate;
pub mod formation;
pub mod pairing;
pub mod prospection;
pub mod workshop;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// A statistical domain of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Formation,
    Candidate,
    Prospection,
    Pairing,
    Workshop,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Self::Formation,
        Self::Candidate,
        Self::Prospection,
        Self::Pairing,
        Self::Workshop,
    ];

    /// The static descriptor driving normalization for this domain.
    pub fn descriptor(self) -> &'static DomainDescriptor {
        match self {
            Self::Formation => &formation::DESCRIPTOR,
            Self::Candidate => &candidate::DESCRIPTOR,
            Self::Prospection => &prospection::DESCRIPTOR,
            Self::Pairing => &pairing::DESCRIPTOR,
            Self::Workshop => &workshop::DESCRIPTOR,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formation => write!(f, "formation"),
            Self::Candidate => write!(f, "candidate"),
            Self::Prospection => write!(f, "prospection"),
            Self::Pairing => write!(f, "pairing"),
            Self::Workshop => write!(f, "workshop"),
        }
    }
}

impl FromStr for Domain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "formation" | "formations" => Ok(Self::Formation),
            "candidate" | "candidates" | "candidat" | "candidats" => Ok(Self::Candidate),
            "prospection" | "prospections" => Ok(Self::Prospection),
            "pairing" | "pairings" | "appairage" | "appairages" => Ok(Self::Pairing),
            "workshop" | "workshops" | "atelier" | "ateliers" => Ok(Self::Workshop),
            other => anyhow::bail!(
                "unknown domain '{other}' (expected formation, candidate, prospection, pairing or workshop)"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor building blocks
// ---------------------------------------------------------------------------

/// A numeric metric carried by every grouped row of a domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricField {
    pub name: &'static str,
    /// Value used when the backend omits the field or sends garbage.
    pub default: f64,
}

/// Shorthand for a metric defaulting to zero.
pub const fn metric(name: &'static str) -> MetricField {
    MetricField { name, default: 0.0 }
}

/// A percentage derived from summed metric fields.
///
/// The rate is `sum(numerator) / max(sum(denominator), 1) * 100`, so an empty
/// group yields `0` instead of `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSpec {
    pub output: &'static str,
    pub numerator: &'static [&'static str],
    pub denominator: &'static [&'static str],
}

impl RateSpec {
    /// Derive the rate from metric values looked up by name.
    pub fn derive(&self, metric: impl Fn(&str) -> f64) -> f64 {
        let numerator: f64 = self.numerator.iter().map(|f| metric(f)).sum();
        let denominator: f64 = self.denominator.iter().map(|f| metric(f)).sum();
        let rate = numerator / denominator.max(1.0) * 100.0;
        if rate.is_finite() { rate } else { 0.0 }
    }
}

/// A grouping dimension and its label fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionSpec {
    /// Canonical `by=` value sent to the backend.
    pub name: &'static str,
    /// Other spellings accepted from callers.
    pub aliases: &'static [&'static str],
    /// Denormalized join fields holding a friendly name, in priority order.
    pub label_fields: &'static [&'static str],
    /// Foreign-key field used for the `"<placeholder> #<id>"` fallback.
    pub id_field: Option<&'static str>,
    pub placeholder: &'static str,
}

impl DimensionSpec {
    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub overview: &'static str,
    pub grouped: &'static str,
    pub list: &'static str,
    pub latest: &'static str,
}

/// Everything the generic engine needs to know about one domain.
#[derive(Debug)]
pub struct DomainDescriptor {
    pub domain: Domain,
    pub endpoints: Endpoints,
    pub metrics: &'static [MetricField],
    pub rates: &'static [RateSpec],
    pub dimensions: &'static [DimensionSpec],
    /// UI filter name → wire key, applied before the uniform encoding rules.
    pub date_aliases: &'static [(&'static str, &'static str)],
}

impl DomainDescriptor {
    /// Look up a dimension by name or alias, case-insensitively.
    pub fn dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.matches(name.trim()))
    }

    pub fn metric(&self, name: &str) -> Option<&MetricField> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn rate(&self, output: &str) -> Option<&RateSpec> {
        self.rates.iter().find(|r| r.output == output)
    }

    /// Whether `name` is a declared metric or rate.
    pub fn is_numeric_field(&self, name: &str) -> bool {
        self.metric(name).is_some() || self.rate(name).is_some()
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dimensions.iter().map(|d| d.name)
    }
}

// ---------------------------------------------------------------------------
// Dimensions shared by several domains
// ---------------------------------------------------------------------------

pub(crate) const CENTRE: DimensionSpec = DimensionSpec {
    name: "centre",
    aliases: &["center", "centre_id"],
    label_fields: &["centre_nom", "centre__nom", "nom_centre"],
    id_field: Some("centre_id"),
    placeholder: "Centre",
};

pub(crate) const DEPARTEMENT: DimensionSpec = DimensionSpec {
    name: "departement",
    aliases: &["department", "dept"],
    label_fields: &["departement_nom", "departement"],
    id_field: Some("departement_code"),
    placeholder: "Département",
};

pub(crate) const FORMATION: DimensionSpec = DimensionSpec {
    name: "formation",
    aliases: &["formation_id"],
    label_fields: &["formation_nom", "formation__nom", "nom_formation"],
    id_field: Some("formation_id"),
    placeholder: "Formation",
};

pub(crate) const PARTENAIRE: DimensionSpec = DimensionSpec {
    name: "partenaire",
    aliases: &["partner", "partenaire_id"],
    label_fields: &["partenaire_nom", "partenaire__nom"],
    id_field: Some("partenaire_id"),
    placeholder: "Partenaire",
};

pub(crate) const STATUT: DimensionSpec = DimensionSpec {
    name: "statut",
    aliases: &["status"],
    label_fields: &["statut_display", "statut_libelle", "statut_nom"],
    id_field: Some("statut_id"),
    placeholder: "Statut",
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
