/// Configuration schema and defaults for placement-stats.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[api]`, `[cache]`, `[queries]`, `[logging]` and `[display]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Maps directly to `~/.placement-stats/config.toml` and the project-local
/// `.placement-stats.toml`. Missing sections and fields fall back to the
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub queries: QueriesConfig,
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Statistics API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined to.
    pub base_url: String,
    /// Overall request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Connection timeout (milliseconds).
    pub connect_timeout_ms: u64,
    /// Bearer token sent as `Authorization`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: 15_000,
            connect_timeout_ms: 5_000,
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// [cache]
// ---------------------------------------------------------------------------

/// Per-query response cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// How long a cached response stays fresh (seconds).
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// [queries]
// ---------------------------------------------------------------------------

/// Default sizes for list-like queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
    /// `limit` of "latest items" queries.
    pub latest_limit: usize,
    /// `page_size` of paginated list queries.
    pub page_size: usize,
    /// Rows kept by top-N views.
    pub top_n: usize,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            latest_limit: 5,
            page_size: 20,
            top_n: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch activity log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether fetch events are appended to the activity log.
    pub enabled: bool,
    /// Path to the JSONL activity log. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.placement-stats/fetch-log.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [display]
// ---------------------------------------------------------------------------

/// Output format for CLI reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse a CLI value, falling back to the table format.
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// CLI presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Default output format: `table`, `json` or `csv`.
    pub format: OutputFormat,
    /// Append a computed totals row to grouped tables.
    pub append_totals: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            append_totals: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl StatsConfig {
    /// The annotated config written by `placement-stats config init`.
    pub fn default_toml() -> String {
        r#"# placement-stats configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (PLACEMENT_STATS_*)
#   2. Project config (.placement-stats.toml in current directory)
#   3. User global config (~/.placement-stats/config.toml)
#   4. Built-in defaults

[api]
base_url = "http://localhost:8000/api"
timeout_ms = 15000
connect_timeout_ms = 5000
# token = "..."                 # Or PLACEMENT_STATS_API_TOKEN

[cache]
enabled = true
ttl_secs = 300                  # Responses reused for identical filters

[queries]
latest_limit = 5
page_size = 20
top_n = 10

[logging]
enabled = true
path = "~/.placement-stats/fetch-log.jsonl"

[display]
format = "table"                # table | json | csv
append_totals = true
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = StatsConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout_ms, 15_000);
        assert!(config.api.token.is_none());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.queries.page_size, 20);
        assert!(config.logging.enabled);
        assert_eq!(config.display.format, OutputFormat::Table);
        assert!(config.display.append_totals);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[api]
base_url = "https://rap.example.org/api"
"#;
        let config: StatsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://rap.example.org/api");
        assert_eq!(config.api.timeout_ms, 15_000); // default
        assert!(config.cache.enabled); // default
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
[api]
base_url = "https://rap.example.org/api"
timeout_ms = 2000
connect_timeout_ms = 500
token = "secret"

[cache]
enabled = false
ttl_secs = 10

[queries]
latest_limit = 3
page_size = 50
top_n = 4

[logging]
enabled = false
path = "/tmp/fetch.jsonl"

[display]
format = "csv"
append_totals = false
"#;
        let config: StatsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.connect_timeout_ms, 500);
        assert!(!config.cache.enabled);
        assert_eq!(config.queries.top_n, 4);
        assert_eq!(config.logging.path, "/tmp/fetch.jsonl");
        assert_eq!(config.display.format, OutputFormat::Csv);
        assert!(!config.display.append_totals);
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: StatsConfig = toml::from_str("").unwrap();
        assert_eq!(config, StatsConfig::default());
    }

    #[test]
    fn default_toml_parses_back() {
        let config: StatsConfig = toml::from_str(&StatsConfig::default_toml()).unwrap();
        assert_eq!(config, StatsConfig::default());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("CSV")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str_opt(Some("html")), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
