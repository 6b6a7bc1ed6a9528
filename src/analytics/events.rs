//! Fetch activity log: one JSONL line per completed or discarded request.
//!
//! Records what every statistics query did: which domain and endpoint it
//! hit, with which encoded filters, whether the response was applied,
//! discarded as stale, served from cache or failed, and how long it took.
//! `placement-stats activity` aggregates it (see [`super::reporter`]).
//!
//! Log file: `~/.placement-stats/fetch-log.jsonl` by default (`[logging]
//! path`).

use std::fmt;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Response belonged to the current request and became the state.
    Applied,
    /// Response arrived after a newer request or a cancel; dropped.
    Discarded,
    /// Transport, status or decode failure.
    Error,
    /// Served from the response cache without a network call.
    CacheHit,
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Discarded => write!(f, "discarded"),
            Self::Error => write!(f, "error"),
            Self::CacheHit => write!(f, "cache_hit"),
        }
    }
}

/// A single fetch event. One line per request outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchEvent {
    pub timestamp: String,
    /// Statistics domain (`formation`, `candidate`, ...).
    pub domain: String,
    /// Endpoint kind: `overview`, `grouped`, `latest` or `list`.
    pub endpoint: String,
    /// Encoded filters, as used for the response cache.
    #[serde(default)]
    pub cache_key: String,
    pub outcome: FetchOutcome,
    /// Time spent in the transport (milliseconds). Not set for cache hits.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
    /// Number of rows/KPIs in an applied response.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FetchEvent {
    /// New event stamped with the current time.
    pub fn new(
        domain: impl fmt::Display,
        endpoint: impl fmt::Display,
        cache_key: &str,
        outcome: FetchOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            domain: domain.to_string(),
            endpoint: endpoint.to_string(),
            cache_key: cache_key.to_string(),
            outcome,
            latency_ms: None,
            result_count: None,
            error: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: Option<u64>) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_result_count(mut self, count: usize) -> Self {
        self.result_count = Some(count);
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append a fetch event to the activity log at `path`.
///
/// Best-effort: failures are silently ignored.
pub fn log_fetch_event(path: &Path, event: &FetchEvent) {
    let _ = append_event(path, event);
}

fn append_event(path: &Path, event: &FetchEvent) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(event)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading events
// ---------------------------------------------------------------------------

/// Read all fetch events from `path`.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_all_events(path: &Path) -> Vec<FetchEvent> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str::<FetchEvent>(&line).ok())
        .collect()
}

/// Read events filtered to a time window (last N days).
///
/// If `days` is `None`, returns all events.
pub fn read_events_since_days(path: &Path, days: Option<u32>) -> Vec<FetchEvent> {
    let events = read_all_events(path);

    let Some(days) = days else {
        return events;
    };

    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
    events
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "placement-stats-events-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("fetch-log.jsonl")
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&FetchOutcome::CacheHit).unwrap();
        assert_eq!(json, "\"cache_hit\"");
        assert_eq!(FetchOutcome::CacheHit.to_string(), "cache_hit");
    }

    #[test]
    fn optional_fields_are_skipped() {
        let event = FetchEvent::new("formation", "grouped", "by=centre", FetchOutcome::Discarded);
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("latency_ms"));
        assert!(!json.contains("error"));
        assert!(json.contains("\"outcome\":\"discarded\""));
    }

    #[test]
    fn log_then_read_back() {
        let path = temp_log("roundtrip");
        let applied = FetchEvent::new("candidate", "overview", "", FetchOutcome::Applied)
            .with_latency(Some(12))
            .with_result_count(4);
        let failed = FetchEvent::new("candidate", "overview", "", FetchOutcome::Error)
            .with_error("http://api/ answered HTTP 500");

        log_fetch_event(&path, &applied);
        log_fetch_event(&path, &failed);
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "not json"))
            .unwrap();

        let events = read_all_events(&path);
        assert_eq!(events, vec![applied, failed]);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn day_window_drops_old_events() {
        let path = temp_log("window");
        let mut old = FetchEvent::new("pairing", "list", "page=1", FetchOutcome::Applied);
        old.timestamp = "2020-01-01T00:00:00+00:00".to_string();
        let recent = FetchEvent::new("pairing", "list", "page=2", FetchOutcome::Applied);

        log_fetch_event(&path, &old);
        log_fetch_event(&path, &recent);

        assert_eq!(read_events_since_days(&path, None).len(), 2);
        assert_eq!(read_events_since_days(&path, Some(7)), vec![recent]);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn missing_file_reads_empty() {
        assert!(read_all_events(Path::new("/nonexistent/placement-stats/log.jsonl")).is_empty());
    }
}
