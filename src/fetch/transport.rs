//! HTTP access to the statistics API.
//!
//! Queries only talk to the backend through [`StatsTransport`], so tests can
//! script responses and the real client stays a thin, synchronous `ureq`
//! wrapper. Authentication is whatever bearer token the caller configured;
//! nothing here retries.

use std::io::Read;
use std::time::Duration;

use serde_json::Value;

use super::FetchError;
use crate::config::schema::ApiConfig;
use crate::query::WireParams;

/// Performs `GET <path>?<params>` and returns the decoded JSON body.
pub trait StatsTransport {
    fn get_json(&self, path: &str, params: &WireParams) -> Result<Value, FetchError>;
}

impl<F> StatsTransport for F
where
    F: Fn(&str, &WireParams) -> Result<Value, FetchError>,
{
    fn get_json(&self, path: &str, params: &WireParams) -> Result<Value, FetchError> {
        self(path, params)
    }
}

// ---------------------------------------------------------------------------
// ureq transport
// ---------------------------------------------------------------------------

/// Blocking HTTP transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Build a transport from the resolved `[api]` config.
    pub fn from_config(config: &ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();

        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        }
    }

    /// Absolute URL for an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl StatsTransport for HttpTransport {
    fn get_json(&self, path: &str, params: &WireParams) -> Result<Value, FetchError> {
        let url = self.url_for(path);

        let mut request = self.agent.get(&url).set("Accept", "application/json");
        for (key, value) in params.iter() {
            request = request.query(key, value);
        }
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status { url, code }),
            Err(ureq::Error::Transport(err)) => {
                return Err(FetchError::Transport {
                    url,
                    message: err.to_string(),
                });
            }
        };

        // `into_string` caps bodies at 10 MB; large listings must still load.
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        // An empty body is a shape anomaly, left to the normalizers.
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
