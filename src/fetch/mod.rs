//! Request lifecycle for statistics queries.
//!
//! A [`Resource`] owns the `{ data, is_loading, error }` state of one query
//! and a generation counter. Every request captures the generation when it
//! is issued ([`Ticket`]); its response is applied only if that generation
//! is still current. Anything else is a stale response and is discarded:
//! last issued wins, not last arrived.
//!
//! Cancelling (filters changed, widget gone) simply moves the generation
//! forward. It is not an error and never touches `error`.
//!
//! The per-domain queries built on top of this live in [`hooks`]; the HTTP
//! side is behind the [`StatsTransport`] trait.

pub mod cache;
pub mod hooks;
pub mod transport;

pub use cache::ResponseCache;
pub use hooks::{
    EndpointKind, GroupedQuery, LatestQuery, ListQuery, OverviewQuery, Query, QueryOptions,
};
pub use transport::{HttpTransport, StatsTransport};

use crate::query::WireParams;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport-level failure of a statistics request.
///
/// Payload shape problems are not errors; they are absorbed by the
/// normalizers. Cancellation is not an error either.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {code}")]
    Status { url: String, code: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

// ---------------------------------------------------------------------------
// Tickets and completion
// ---------------------------------------------------------------------------

/// Handle for one issued request.
///
/// Carries everything needed to perform the request, so it can be executed
/// away from the query that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    path: &'static str,
    params: WireParams,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Endpoint path, relative to the API base URL.
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn params(&self) -> &WireParams {
        &self.params
    }

    pub fn cache_key(&self) -> String {
        self.params.cache_key()
    }

    /// Perform the request described by this ticket.
    pub fn execute(&self, transport: &dyn StatsTransport) -> Result<serde_json::Value, FetchError> {
        transport.get_json(self.path, &self.params)
    }
}

/// What happened to a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response belonged to the current request and is now the state.
    Applied,
    /// The request was superseded or cancelled; the response was dropped.
    Discarded,
}

// ---------------------------------------------------------------------------
// Resource state
// ---------------------------------------------------------------------------

/// Observable state of a query, as exposed to widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Lifecycle of one query: current generation, state and response cache.
#[derive(Debug)]
pub struct Resource<T> {
    generation: u64,
    state: QueryState<T>,
    cache: ResponseCache<T>,
}

impl<T: Clone> Resource<T> {
    pub fn new(cache: ResponseCache<T>) -> Self {
        Self {
            generation: 0,
            state: QueryState::default(),
            cache,
        }
    }

    pub fn state(&self) -> &QueryState<T> {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issue a new request. Any request still in flight becomes stale.
    ///
    /// Previous data stays visible while loading; a previous error is
    /// cleared.
    pub fn begin(&mut self, path: &'static str, params: WireParams) -> Ticket {
        self.generation += 1;
        self.state.is_loading = true;
        self.state.error = None;
        Ticket {
            generation: self.generation,
            path,
            params,
        }
    }

    /// Whether `ticket` is still the latest issued request.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Cached response for `key`, if still fresh.
    pub fn cached(&self, key: &str) -> Option<T> {
        self.cache.get(key)
    }

    pub fn invalidate(&mut self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Apply the outcome of `ticket`, unless it has been superseded.
    pub fn complete(&mut self, ticket: &Ticket, result: Result<T, FetchError>) -> Completion {
        self.apply(ticket, result, true)
    }

    /// Apply a value taken from [`Resource::cached`] for `ticket`.
    ///
    /// The cache entry keeps its original timestamp, so it still expires
    /// `ttl_secs` after the network fetch that produced it.
    pub fn serve_cached(&mut self, ticket: &Ticket, data: T) -> Completion {
        self.apply(ticket, Ok(data), false)
    }

    fn apply(&mut self, ticket: &Ticket, result: Result<T, FetchError>, store: bool) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Discarded;
        }

        self.state.is_loading = false;
        match result {
            Ok(data) => {
                if store {
                    self.cache.insert(ticket.cache_key(), data.clone());
                }
                self.state.data = Some(data);
                self.state.error = None;
            }
            Err(err) => {
                self.state.error = Some(err);
            }
        }
        Completion::Applied
    }

    /// Cancel whatever is in flight. Not an error.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state.is_loading = false;
    }
}

impl<T: Clone> Default for Resource<T> {
    fn default() -> Self {
        Self::new(ResponseCache::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(centre: &str) -> WireParams {
        WireParams::new().with("centre", centre)
    }

    fn transport_error() -> FetchError {
        FetchError::Transport {
            url: "http://api/x".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[test]
    fn begin_marks_loading() {
        let mut resource: Resource<u32> = Resource::default();
        let ticket = resource.begin("x/", params("1"));
        assert!(resource.state().is_loading);
        assert_eq!(ticket.generation(), 1);
        assert_eq!(ticket.cache_key(), "centre=1");
    }

    #[test]
    fn current_response_is_applied() {
        let mut resource = Resource::default();
        let ticket = resource.begin("x/", params("1"));
        assert_eq!(resource.complete(&ticket, Ok(7u32)), Completion::Applied);
        assert_eq!(resource.state().data, Some(7));
        assert!(!resource.state().is_loading);
        assert_eq!(resource.cached("centre=1"), Some(7));
    }

    #[test]
    fn last_issued_wins_over_last_arrived() {
        let mut resource = Resource::default();
        let first = resource.begin("x/", params("1"));
        let second = resource.begin("x/", params("2"));

        assert_eq!(resource.complete(&second, Ok(2u32)), Completion::Applied);
        assert_eq!(resource.complete(&first, Ok(1u32)), Completion::Discarded);
        assert_eq!(resource.state().data, Some(2));
        assert_eq!(resource.cached("centre=1"), None);
    }

    #[test]
    fn stale_response_is_discarded_while_newer_is_loading() {
        let mut resource = Resource::default();
        let first = resource.begin("x/", params("1"));
        let _second = resource.begin("x/", params("2"));

        assert_eq!(resource.complete(&first, Ok(1u32)), Completion::Discarded);
        assert_eq!(resource.state().data, None);
        assert!(resource.state().is_loading);
    }

    #[test]
    fn errors_are_reported_and_keep_previous_data() {
        let mut resource = Resource::default();
        let ok = resource.begin("x/", params("1"));
        resource.complete(&ok, Ok(1u32));

        let failing = resource.begin("x/", params("2"));
        assert_eq!(resource.complete(&failing, Err(transport_error())), Completion::Applied);
        assert_eq!(resource.state().error, Some(transport_error()));
        assert_eq!(resource.state().data, Some(1));
    }

    #[test]
    fn serving_from_cache_keeps_the_entry_timestamp() {
        let mut resource = Resource::default();
        let ticket = resource.begin("x/", params("1"));
        assert_eq!(resource.serve_cached(&ticket, 5u32), Completion::Applied);
        assert_eq!(resource.state().data, Some(5));
        assert!(!resource.state().is_loading);
        // Nothing is written back to the cache.
        assert_eq!(resource.cached("centre=1"), None);

        let stale = resource.begin("x/", params("2"));
        let _newer = resource.begin("x/", params("3"));
        assert_eq!(resource.serve_cached(&stale, 6u32), Completion::Discarded);
    }

    #[test]
    fn cancellation_is_not_an_error() {
        let mut resource: Resource<u32> = Resource::default();
        let ticket = resource.begin("x/", params("1"));
        resource.cancel();

        assert!(!resource.state().is_loading);
        assert_eq!(resource.complete(&ticket, Err(transport_error())), Completion::Discarded);
        assert_eq!(resource.state().error, None);
    }

    #[test]
    fn begin_clears_previous_error() {
        let mut resource: Resource<u32> = Resource::default();
        let ticket = resource.begin("x/", params("1"));
        resource.complete(&ticket, Err(transport_error()));
        resource.begin("x/", params("1"));
        assert_eq!(resource.state().error, None);
    }

    #[test]
    fn fetch_error_messages_name_the_url() {
        let err = FetchError::Status {
            url: "http://api/formation-stats/".to_string(),
            code: 502,
        };
        assert_eq!(err.to_string(), "http://api/formation-stats/ answered HTTP 502");
    }
}
