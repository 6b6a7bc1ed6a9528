/// Integration tests for configuration loading.
///
/// # Safety
///
/// `std::env::set_var` / `remove_var` are `unsafe` in Rust 2024 edition. All
/// environment mutation happens inside a single `#[test]` so it cannot race
/// with another test in this binary.
use placement_stats::config::{self, StatsConfig};
use placement_stats::fetch::{HttpTransport, QueryOptions};

const VARS: [&str; 5] = [
    "PLACEMENT_STATS_API_URL",
    "PLACEMENT_STATS_API_TOKEN",
    "PLACEMENT_STATS_TIMEOUT_MS",
    "PLACEMENT_STATS_CACHE",
    "PLACEMENT_STATS_LOGGING",
];

/// Helper: set an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn set_env(key: &str, val: &str) {
    unsafe { std::env::set_var(key, val) }
}

/// Helper: remove an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn remove_env(key: &str) {
    unsafe { std::env::remove_var(key) }
}

#[test]
fn env_vars_override_every_file_layer() {
    unsafe {
        set_env("PLACEMENT_STATS_API_URL", "https://stats.example.org/api/");
        set_env("PLACEMENT_STATS_API_TOKEN", "tok");
        set_env("PLACEMENT_STATS_TIMEOUT_MS", "1234");
        set_env("PLACEMENT_STATS_CACHE", "0");
        set_env("PLACEMENT_STATS_LOGGING", "off");
    }

    let cfg = config::load();
    assert_eq!(cfg.api.base_url, "https://stats.example.org/api/");
    assert_eq!(cfg.api.token.as_deref(), Some("tok"));
    assert_eq!(cfg.api.timeout_ms, 1234);
    assert!(!cfg.cache.enabled);
    assert!(!cfg.logging.enabled);

    let options = QueryOptions::from_config(&cfg);
    assert_eq!(options.cache_ttl_secs, None);
    assert_eq!(options.activity_log, None);

    let transport = HttpTransport::from_config(&cfg.api);
    assert_eq!(
        transport.url_for("formation-stats/"),
        "https://stats.example.org/api/formation-stats/"
    );

    // The token never shows up in `config show`.
    let shown = config::show_effective_config().unwrap();
    assert!(!shown.contains("tok\""));
    assert!(shown.contains("********"));

    // --- invalid numbers are ignored, enabled flags accept "yes" ---
    unsafe {
        set_env("PLACEMENT_STATS_TIMEOUT_MS", "soon");
        set_env("PLACEMENT_STATS_CACHE", "yes");
    }
    let cfg = config::load();
    assert_ne!(cfg.api.timeout_ms, 1234);
    assert!(cfg.cache.enabled);

    for var in VARS {
        unsafe { remove_env(var) };
    }
}

#[test]
fn default_toml_matches_built_in_defaults() {
    let parsed: StatsConfig = toml::from_str(&StatsConfig::default_toml()).unwrap();
    assert_eq!(parsed, StatsConfig::default());
}
