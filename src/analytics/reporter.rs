//! Activity reporter: aggregates the fetch log for `placement-stats activity`.
//!
//! Groups events per `(domain, endpoint)` and reports request volume, error
//! and discard counts, cache hits and average transport latency.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::aggregate::percentage;
use crate::analytics::events::{self, FetchEvent, FetchOutcome};

// ---------------------------------------------------------------------------
// Aggregated activity
// ---------------------------------------------------------------------------

/// Summary of the activity log.
#[derive(Debug, Default, Serialize)]
pub struct ActivitySummary {
    pub total_requests: usize,
    pub total_errors: usize,
    pub total_discarded: usize,
    pub total_cache_hits: usize,
    /// Errors as a percentage of all requests.
    pub error_rate_pct: f64,
    pub endpoints: Vec<EndpointStat>,
}

/// Per-endpoint aggregated statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStat {
    pub domain: String,
    pub endpoint: String,
    pub requests: usize,
    pub applied: usize,
    pub errors: usize,
    pub discarded: usize,
    pub cache_hits: usize,
    pub error_rate_pct: f64,
    /// Mean transport latency over events that carry one.
    pub avg_latency_ms: Option<f64>,
    /// Latest error message, if any request failed.
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Read the log at `path` (optionally the last `days` days) and aggregate it.
pub fn compute_activity(path: &Path, days: Option<u32>) -> ActivitySummary {
    let events = events::read_events_since_days(path, days);
    build_summary(&events)
}

pub fn build_summary(events: &[FetchEvent]) -> ActivitySummary {
    if events.is_empty() {
        return ActivitySummary::default();
    }

    let count = |outcome: FetchOutcome| events.iter().filter(|e| e.outcome == outcome).count();
    let total_requests = events.len();
    let total_errors = count(FetchOutcome::Error);

    ActivitySummary {
        total_requests,
        total_errors,
        total_discarded: count(FetchOutcome::Discarded),
        total_cache_hits: count(FetchOutcome::CacheHit),
        error_rate_pct: percentage(total_errors as f64, total_requests as f64),
        endpoints: compute_endpoint_stats(events),
    }
}

/// Group events by domain and endpoint.
///
/// Sorted by request count (descending), then by name for stable output.
fn compute_endpoint_stats(events: &[FetchEvent]) -> Vec<EndpointStat> {
    let mut groups: HashMap<(&str, &str), Vec<&FetchEvent>> = HashMap::new();
    for event in events {
        groups
            .entry((event.domain.as_str(), event.endpoint.as_str()))
            .or_default()
            .push(event);
    }

    let mut stats: Vec<EndpointStat> = groups
        .into_iter()
        .map(|((domain, endpoint), group)| {
            let requests = group.len();
            let count = |outcome: FetchOutcome| group.iter().filter(|e| e.outcome == outcome).count();
            let errors = count(FetchOutcome::Error);

            let latencies: Vec<u64> = group.iter().filter_map(|e| e.latency_ms).collect();
            let avg_latency_ms = if latencies.is_empty() {
                None
            } else {
                Some(latencies.iter().sum::<u64>() as f64 / latencies.len() as f64)
            };

            // Events are in log order, so the last one is the latest.
            let last_error = group.iter().rev().find_map(|e| e.error.clone());

            EndpointStat {
                domain: domain.to_string(),
                endpoint: endpoint.to_string(),
                requests,
                applied: count(FetchOutcome::Applied),
                errors,
                discarded: count(FetchOutcome::Discarded),
                cache_hits: count(FetchOutcome::CacheHit),
                error_rate_pct: percentage(errors as f64, requests as f64),
                avg_latency_ms,
                last_error,
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.requests
            .cmp(&a.requests)
            .then_with(|| a.domain.cmp(&b.domain))
            .then_with(|| a.endpoint.cmp(&b.endpoint))
    });

    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(domain: &str, endpoint: &str, outcome: FetchOutcome, latency: Option<u64>) -> FetchEvent {
        FetchEvent::new(domain, endpoint, "", outcome).with_latency(latency)
    }

    fn sample_events() -> Vec<FetchEvent> {
        vec![
            event("formation", "grouped", FetchOutcome::Applied, Some(100)),
            event("formation", "grouped", FetchOutcome::Discarded, Some(300)),
            event("formation", "grouped", FetchOutcome::CacheHit, None),
            event("formation", "grouped", FetchOutcome::Error, Some(200))
                .with_error("http://api/formation-stats/grouped/ answered HTTP 502"),
            event("candidate", "overview", FetchOutcome::Applied, Some(50)),
        ]
    }

    #[test]
    fn totals_count_outcomes() {
        let summary = build_summary(&sample_events());
        assert_eq!(summary.total_requests, 5);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.total_discarded, 1);
        assert_eq!(summary.total_cache_hits, 1);
        assert!((summary.error_rate_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn endpoints_are_grouped_and_sorted_by_volume() {
        let summary = build_summary(&sample_events());
        assert_eq!(summary.endpoints.len(), 2);

        let grouped = &summary.endpoints[0];
        assert_eq!((grouped.domain.as_str(), grouped.endpoint.as_str()), ("formation", "grouped"));
        assert_eq!(grouped.requests, 4);
        assert_eq!(grouped.applied, 1);
        assert_eq!(grouped.errors, 1);
        assert!((grouped.error_rate_pct - 25.0).abs() < 1e-9);
        assert_eq!(grouped.avg_latency_ms, Some(200.0));
        assert_eq!(
            grouped.last_error.as_deref(),
            Some("http://api/formation-stats/grouped/ answered HTTP 502")
        );

        let overview = &summary.endpoints[1];
        assert_eq!(overview.domain, "candidate");
        assert_eq!(overview.last_error, None);
    }

    #[test]
    fn cache_hits_only_have_no_latency() {
        let events = vec![event("workshop", "list", FetchOutcome::CacheHit, None)];
        let summary = build_summary(&events);
        assert_eq!(summary.endpoints[0].avg_latency_ms, None);
    }

    #[test]
    fn empty_log() {
        let summary = build_summary(&[]);
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.error_rate_pct, 0.0);
        assert!(summary.endpoints.is_empty());
    }
}
