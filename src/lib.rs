//! Statistics normalization and aggregation for the training & placement
//! dashboard API.
//!
//! Filters are encoded by [`query`], raw responses normalized by
//! [`normalize`] and [`grouped`], totals and rates computed by
//! [`aggregate`], all driven by the per-domain descriptors in [`domains`].
//! [`fetch`] ties them to HTTP with stale-response protection.

pub mod aggregate;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod domains;
pub mod fetch;
pub mod grouped;
pub mod normalize;
pub mod query;
