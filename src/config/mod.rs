/// Configuration system for placement-stats.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::StatsConfig::default()`]
/// 2. **User global config**: `~/.placement-stats/config.toml`
/// 3. **Project local config**: `.placement-stats.toml` in the current
///    working directory
/// 4. **Environment variables**: `PLACEMENT_STATS_*` overrides (highest
///    precedence)
///
/// TOML layers are merged table by table, so a project file that only sets
/// `[api] base_url` keeps everything else from the global file.
///
/// # Usage
///
/// ```rust,ignore
/// use placement_stats::config;
///
/// let cfg = config::load();
/// let transport = HttpTransport::from_config(&cfg.api);
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::StatsConfig;

/// Directory holding the global config and the activity log.
const CONFIG_DIR: &str = ".placement-stats";

/// Project-local config file name.
const PROJECT_CONFIG_FILE: &str = ".placement-stats.toml";

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Malformed files are ignored rather than failing the command.
pub fn load() -> StatsConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in [global_config_path(), project_config_path()] {
        if let Some(layer) = load_toml_value(path) {
            merge_values(&mut merged, layer);
        }
    }

    let mut config: StatsConfig = merged.try_into().unwrap_or_default();
    apply_env_overrides(&mut config);
    config
}

/// Read a TOML file as a raw value tree (if it exists and parses).
fn load_toml_value(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files that parse as TOML but not as our schema.
    value.clone().try_into::<StatsConfig>().ok()?;
    Some(value)
}

/// Merge `overlay` into `base`: tables are merged key by key, any other
/// value in the overlay replaces the base value.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.placement-stats/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join("config.toml"))
}

/// Path to the project local config in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(PROJECT_CONFIG_FILE))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `PLACEMENT_STATS_API_URL`: API base URL
/// - `PLACEMENT_STATS_API_TOKEN`: bearer token
/// - `PLACEMENT_STATS_TIMEOUT_MS`: request timeout
/// - `PLACEMENT_STATS_CACHE`: response cache on/off
/// - `PLACEMENT_STATS_LOGGING`: activity log on/off
fn apply_env_overrides(config: &mut StatsConfig) {
    if let Ok(val) = std::env::var("PLACEMENT_STATS_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Ok(val) = std::env::var("PLACEMENT_STATS_API_TOKEN")
        && !val.is_empty()
    {
        config.api.token = Some(val);
    }
    if let Ok(val) = std::env::var("PLACEMENT_STATS_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("PLACEMENT_STATS_CACHE") {
        config.cache.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("PLACEMENT_STATS_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.placement-stats/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(&path, StatsConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (`api.base_url`) in the global config file.
///
/// Starts from the existing file, or from the defaults when there is none.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&StatsConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Refuse to write something the loader would then ignore.
    root.clone()
        .try_into::<StatsConfig>()
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The existing value's type decides how `raw_value` is parsed; keys that
/// are absent from the tree (like an unset `api.token`) are written as
/// strings.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected a table above '{key}'"))?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::Table(_)) => anyhow::bail!("'{key}' is a section, not a value"),
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
///
/// The bearer token is masked.
pub fn show_effective_config() -> Result<String> {
    let mut config = load();
    if config.api.token.is_some() {
        config.api.token = Some("********".to_string());
    }
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
