//! Per-domain statistics queries.
//!
//! A [`Query`] binds one domain endpoint to a filter set and a
//! [`Resource`]. Changing the filters issues a request only when the
//! encoded parameters actually change; the caller then performs it (here,
//! on another thread, anywhere) and hands the outcome back with
//! [`Query::complete`]. [`Query::run`] does the whole round trip inline.
//!
//! Instances share nothing: two widgets asking for the same grouped
//! dimension with different filters get two independent queries.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;

use super::{Completion, FetchError, QueryState, Resource, ResponseCache, StatsTransport, Ticket};
use crate::aggregate;
use crate::analytics::events::{self, FetchEvent, FetchOutcome};
use crate::config::{self, StatsConfig};
use crate::domains::{Domain, DomainDescriptor};
use crate::grouped::{GroupedResult, GroupedRow, normalize_grouped};
use crate::normalize::{Overview, Page, normalize_list, normalize_overview};
use crate::query::{FilterSet, WireParams, encode_for};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings shared by the queries a consumer creates.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Response cache TTL; `None` disables caching.
    pub cache_ttl_secs: Option<u64>,
    /// Where fetch events are appended; `None` disables the activity log.
    pub activity_log: Option<PathBuf>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache_ttl_secs: Some(super::cache::DEFAULT_CACHE_TTL_SECS),
            activity_log: None,
        }
    }
}

impl QueryOptions {
    pub fn from_config(config: &StatsConfig) -> Self {
        Self {
            cache_ttl_secs: config.cache.enabled.then_some(config.cache.ttl_secs),
            activity_log: config
                .logging
                .enabled
                .then(|| config::expand_home(&config.logging.path)),
        }
    }

    fn cache<T: Clone>(&self) -> ResponseCache<T> {
        match self.cache_ttl_secs {
            Some(ttl) => ResponseCache::new(ttl),
            None => ResponseCache::disabled(),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint kinds
// ---------------------------------------------------------------------------

/// Which endpoint of a domain a query talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Overview,
    Grouped,
    Latest,
    List,
}

impl EndpointKind {
    pub fn path(self, descriptor: &DomainDescriptor) -> &'static str {
        match self {
            Self::Overview => descriptor.endpoints.overview,
            Self::Grouped => descriptor.endpoints.grouped,
            Self::Latest => descriptor.endpoints.latest,
            Self::List => descriptor.endpoints.list,
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overview => write!(f, "overview"),
            Self::Grouped => write!(f, "grouped"),
            Self::Latest => write!(f, "latest"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Decoded query payloads know how many entries they carry (for the log).
pub trait QueryData: Clone {
    fn result_count(&self) -> usize;
}

impl QueryData for Overview {
    fn result_count(&self) -> usize {
        self.kpis.len()
    }
}

impl QueryData for GroupedResult {
    fn result_count(&self) -> usize {
        self.results.len()
    }
}

impl<T: Clone> QueryData for Page<T> {
    fn result_count(&self) -> usize {
        self.results.len()
    }
}

type Decoder<T> = fn(&DomainDescriptor, &Value) -> T;

fn decode_overview(_: &DomainDescriptor, payload: &Value) -> Overview {
    normalize_overview(payload)
}

fn decode_page(_: &DomainDescriptor, payload: &Value) -> Page {
    normalize_list(payload)
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One statistics query: endpoint, filters and request lifecycle.
#[derive(Debug)]
pub struct Query<T> {
    descriptor: &'static DomainDescriptor,
    kind: EndpointKind,
    decode: Decoder<T>,
    filters: FilterSet,
    /// Endpoint parameters that are not filters (`by`, `limit`, `page`...).
    extra: WireParams,
    /// Parameters of the last request issued, if it was not cancelled.
    issued: Option<WireParams>,
    pending: Option<Ticket>,
    resource: Resource<T>,
    activity_log: Option<PathBuf>,
}

/// `{kpis}` overview of a domain.
pub type OverviewQuery = Query<Overview>;
/// Rows grouped by one dimension (`by=`).
pub type GroupedQuery = Query<GroupedResult>;
/// The `limit` most recent items.
pub type LatestQuery = Query<Page>;
/// One page of a paginated listing.
pub type ListQuery = Query<Page>;

impl<T: QueryData> Query<T> {
    fn new(
        domain: Domain,
        kind: EndpointKind,
        decode: Decoder<T>,
        extra: WireParams,
        options: &QueryOptions,
    ) -> Self {
        Self {
            descriptor: domain.descriptor(),
            kind,
            decode,
            filters: FilterSet::new(),
            extra,
            issued: None,
            pending: None,
            resource: Resource::new(options.cache()),
            activity_log: options.activity_log.clone(),
        }
    }

    pub fn descriptor(&self) -> &'static DomainDescriptor {
        self.descriptor
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn path(&self) -> &'static str {
        self.kind.path(self.descriptor)
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Effective wire parameters: encoded filters plus endpoint parameters.
    pub fn params(&self) -> WireParams {
        let mut params = encode_for(self.descriptor, &self.filters);
        params.extend(&self.extra);
        params
    }

    pub fn state(&self) -> &QueryState<T> {
        self.resource.state()
    }

    /// The request waiting to be performed, if any.
    pub fn pending(&self) -> Option<&Ticket> {
        self.pending.as_ref()
    }

    /// Replace the filter set.
    ///
    /// Returns a ticket to perform when the effective parameters changed and
    /// no fresh cached response could be served; `None` otherwise.
    pub fn set_filters(&mut self, filters: FilterSet) -> Option<Ticket> {
        self.filters = filters;
        self.sync()
    }

    /// Issue a request for the current parameters, bypassing the cache.
    pub fn refetch(&mut self) -> Ticket {
        let params = self.params();
        self.resource.invalidate(&params.cache_key());
        self.begin(params)
    }

    /// Drop whatever is in flight. Its response will be discarded.
    pub fn cancel(&mut self) {
        self.resource.cancel();
        self.pending = None;
        self.issued = None;
    }

    /// Apply the raw outcome of `ticket`.
    pub fn complete(&mut self, ticket: &Ticket, result: Result<Value, FetchError>) -> Completion {
        self.finish(ticket, result, None)
    }

    /// Perform the pending request (or a new one for the current
    /// parameters) through `transport` and apply it.
    pub fn run(&mut self, transport: &dyn StatsTransport) -> Completion {
        let ticket = match self.pending.clone() {
            Some(ticket) => ticket,
            None => match self.issue(self.params()) {
                Some(ticket) => ticket,
                None => return Completion::Applied,
            },
        };

        let started = Instant::now();
        let result = ticket.execute(transport);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.finish(&ticket, result, Some(latency_ms))
    }

    fn set_extra(&mut self, key: &str, value: String) -> Option<Ticket> {
        self.extra.insert(key, value);
        self.sync()
    }

    fn sync(&mut self) -> Option<Ticket> {
        let params = self.params();
        if self.issued.as_ref() == Some(&params) {
            return None;
        }
        self.issue(params)
    }

    /// Begin a request, serving it from cache when possible.
    fn issue(&mut self, params: WireParams) -> Option<Ticket> {
        let key = params.cache_key();
        let ticket = self.begin(params);

        let Some(hit) = self.resource.cached(&key) else {
            return Some(ticket);
        };
        let count = hit.result_count();
        self.pending = None;
        self.resource.serve_cached(&ticket, hit);
        self.log(
            FetchEvent::new(self.descriptor.domain, self.kind, &key, FetchOutcome::CacheHit)
                .with_result_count(count),
        );
        None
    }

    fn begin(&mut self, params: WireParams) -> Ticket {
        let ticket = self.resource.begin(self.path(), params.clone());
        self.issued = Some(params);
        self.pending = Some(ticket.clone());
        ticket
    }

    fn finish(
        &mut self,
        ticket: &Ticket,
        result: Result<Value, FetchError>,
        latency_ms: Option<u64>,
    ) -> Completion {
        if self.pending.as_ref() == Some(ticket) {
            self.pending = None;
        }

        let decoded = result.map(|payload| (self.decode)(self.descriptor, &payload));
        let key = ticket.cache_key();
        let event = FetchEvent::new(self.descriptor.domain, self.kind, &key, FetchOutcome::Applied)
            .with_latency(latency_ms);
        let event = match &decoded {
            _ if !self.resource.is_current(ticket) => FetchEvent {
                outcome: FetchOutcome::Discarded,
                ..event
            },
            Ok(data) => event.with_result_count(data.result_count()),
            Err(err) => FetchEvent {
                outcome: FetchOutcome::Error,
                ..event
            }
            .with_error(err),
        };

        let completion = self.resource.complete(ticket, decoded);
        self.log(event);
        completion
    }

    fn log(&self, event: FetchEvent) {
        if let Some(path) = &self.activity_log {
            events::log_fetch_event(path, &event);
        }
    }
}

impl Query<Overview> {
    pub fn overview(domain: Domain, options: &QueryOptions) -> Self {
        Self::new(
            domain,
            EndpointKind::Overview,
            decode_overview,
            WireParams::new(),
            options,
        )
    }
}

impl Query<GroupedResult> {
    /// Grouped query on `dimension`. Known aliases are sent under the
    /// dimension's canonical name; unknown names are passed through.
    pub fn grouped(domain: Domain, dimension: &str, options: &QueryOptions) -> Self {
        let by = canonical_dimension(domain.descriptor(), dimension);
        Self::new(
            domain,
            EndpointKind::Grouped,
            normalize_grouped,
            WireParams::new().with("by", by),
            options,
        )
    }

    pub fn dimension(&self) -> &str {
        self.extra.get("by").unwrap_or_default()
    }

    pub fn set_dimension(&mut self, dimension: &str) -> Option<Ticket> {
        let by = canonical_dimension(self.descriptor, dimension);
        self.set_extra("by", by)
    }

    /// Current rows with a computed totals row appended.
    pub fn rows_with_totals(&self) -> Vec<GroupedRow> {
        let rows = self
            .state()
            .data
            .as_ref()
            .map(|data| data.results.clone())
            .unwrap_or_default();
        aggregate::with_totals(self.descriptor, rows)
    }
}

impl Query<Page> {
    pub fn latest(domain: Domain, limit: usize, options: &QueryOptions) -> Self {
        Self::new(
            domain,
            EndpointKind::Latest,
            decode_page,
            WireParams::new().with("limit", limit.to_string()),
            options,
        )
    }

    pub fn list(domain: Domain, page: usize, page_size: usize, options: &QueryOptions) -> Self {
        Self::new(
            domain,
            EndpointKind::List,
            decode_page,
            WireParams::new()
                .with("page", page.max(1).to_string())
                .with("page_size", page_size.to_string()),
            options,
        )
    }

    /// Move a list query to another page (1-based).
    pub fn set_page(&mut self, page: usize) -> Option<Ticket> {
        self.set_extra("page", page.max(1).to_string())
    }
}

fn canonical_dimension(descriptor: &DomainDescriptor, dimension: &str) -> String {
    descriptor
        .dimension(dimension)
        .map(|spec| spec.name.to_string())
        .unwrap_or_else(|| dimension.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
