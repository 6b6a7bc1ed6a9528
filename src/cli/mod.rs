//! CLI command implementations for placement-stats.
//!
//! Provides subcommand handlers for:
//! - `placement-stats overview <domain>`: flattened KPIs of a domain
//! - `placement-stats grouped <domain> --by <dim>`: labelled grouped rows
//!   with a computed totals row
//! - `placement-stats latest <domain>`: most recent items
//! - `placement-stats list <domain> --page N`: one page of a listing
//! - `placement-stats activity`: fetch log summary per endpoint
//! - `placement-stats config show|init|set|reset`: configuration management

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;

use crate::aggregate::{self, TOTAL_LABEL};
use crate::analytics::reporter::{self, ActivitySummary};
use crate::config::{self, StatsConfig};
use crate::domains::{Domain, DomainDescriptor};
use crate::fetch::hooks::QueryData;
use crate::fetch::{
    GroupedQuery, HttpTransport, LatestQuery, ListQuery, OverviewQuery, Query, QueryOptions,
};
use crate::grouped::GroupedRow;
use crate::grouped::label::resolve_label;
use crate::normalize::{Overview, Page};
use crate::query::FilterSet;

pub use crate::config::schema::OutputFormat;

/// Columns shown for list/latest items in table output.
const MAX_ITEM_COLUMNS: usize = 6;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Resolved config plus the transport and query options derived from it.
struct Session {
    config: StatsConfig,
    transport: HttpTransport,
    options: QueryOptions,
}

impl Session {
    fn load() -> Self {
        let config = config::load();
        Self {
            transport: HttpTransport::from_config(&config.api),
            options: QueryOptions::from_config(&config),
            config,
        }
    }

    /// An explicit `--format` wins over `[display] format`.
    fn format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or(self.config.display.format)
    }

    /// Run `query` once and return its data, or the fetch error.
    fn fetch<T: QueryData + Default>(&self, query: &mut Query<T>) -> Result<T> {
        query.run(&self.transport);
        let state = query.state();
        if let Some(err) = &state.error {
            return Err(err.clone()).with_context(|| {
                format!(
                    "failed to fetch {} {}",
                    query.descriptor().domain,
                    query.kind()
                )
            });
        }
        Ok(state.data.clone().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// placement-stats overview
// ---------------------------------------------------------------------------

/// Show the overview KPIs of a domain.
pub fn run_overview(domain: Domain, filters: FilterSet, format: Option<OutputFormat>) -> Result<()> {
    let session = Session::load();
    let mut query = OverviewQuery::overview(domain, &session.options);
    query.set_filters(filters);
    let overview = session.fetch(&mut query)?;

    if overview.is_empty() {
        println!("{}", format!("No KPIs returned for {domain}.").yellow());
        return Ok(());
    }

    match session.format(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&overview.kpis)?),
        OutputFormat::Csv => print_overview_csv(&overview),
        OutputFormat::Table => print_overview_table(domain, &overview),
    }

    Ok(())
}

fn print_overview_table(domain: Domain, overview: &Overview) {
    println!("{}", format!("{} — Overview", title(domain)).bold().cyan());
    println!("{}", "=".repeat(50));

    for (i, (name, value)) in overview.kpis.iter().enumerate() {
        let line = format!("  {:<34} {:>12}", truncate(name, 34), format_value(*value));
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_overview_csv(overview: &Overview) {
    println!("kpi,value");
    for (name, value) in &overview.kpis {
        println!("{},{}", csv_field(name), value);
    }
}

// ---------------------------------------------------------------------------
// placement-stats grouped
// ---------------------------------------------------------------------------

/// Options of `placement-stats grouped` beyond domain and filters.
#[derive(Debug, Clone, Default)]
pub struct GroupedArgs {
    pub by: String,
    /// Force the totals row on or off; `None` follows `[display]`.
    pub totals: Option<bool>,
    /// Keep only the N highest rows (by `sort`).
    pub top: Option<usize>,
    /// Metric or rate used by `top`; defaults to the first metric.
    pub sort: Option<String>,
}

/// A grouped row with its resolved label.
struct LabelledRow {
    label: String,
    row: GroupedRow,
}

/// Show grouped statistics with labels and a totals row.
pub fn run_grouped(
    domain: Domain,
    args: GroupedArgs,
    filters: FilterSet,
    format: Option<OutputFormat>,
) -> Result<()> {
    let session = Session::load();
    let descriptor = domain.descriptor();

    if descriptor.dimension(&args.by).is_none() {
        eprintln!(
            "{} '{}' is not a known {} dimension (known: {})",
            "warning:".yellow().bold(),
            args.by,
            domain,
            descriptor.dimension_names().collect::<Vec<_>>().join(", ")
        );
    }

    let mut query = GroupedQuery::grouped(domain, &args.by, &session.options);
    query.set_filters(filters);
    let result = session.fetch(&mut query)?;

    if result.results.is_empty() {
        println!(
            "{}",
            format!("No {domain} rows returned for by={}.", query.dimension()).yellow()
        );
        return Ok(());
    }

    let dimension = query.dimension().to_string();
    let rows = select_rows(descriptor, result.results, &args, session.config.queries.top_n)?;
    let show_totals = args.totals.unwrap_or(session.config.display.append_totals);
    let rows: Vec<LabelledRow> = rows
        .into_iter()
        .filter(|row| show_totals || !row.is_total())
        .map(|row| LabelledRow {
            label: if row.is_total() {
                TOTAL_LABEL.to_string()
            } else {
                resolve_label(descriptor, &row, &dimension)
            },
            row,
        })
        .collect();

    let columns = numeric_columns(descriptor, &rows);
    match session.format(format) {
        OutputFormat::Json => print_grouped_json(&dimension, &rows)?,
        OutputFormat::Csv => print_grouped_csv(&dimension, &columns, &rows),
        OutputFormat::Table => print_grouped_table(domain, &dimension, &columns, &rows),
    }

    Ok(())
}

/// Apply `--top`/`--sort` and append the totals row.
///
/// Totals are always computed over every row, not just the ones kept.
fn select_rows(
    descriptor: &DomainDescriptor,
    rows: Vec<GroupedRow>,
    args: &GroupedArgs,
    default_top: usize,
) -> Result<Vec<GroupedRow>> {
    let rows = aggregate::with_totals(descriptor, rows);
    if args.top.is_none() && args.sort.is_none() {
        return Ok(rows);
    }

    let field = match &args.sort {
        Some(field) if descriptor.is_numeric_field(field) => field.clone(),
        Some(field) => anyhow::bail!("'{field}' is not a metric or rate of {}", descriptor.domain),
        None => descriptor
            .metrics
            .first()
            .map(|m| m.name.to_string())
            .context("domain has no metrics to sort by")?,
    };

    let n = args.top.unwrap_or(default_top);
    let mut selected: Vec<GroupedRow> = aggregate::top_n(&rows, &field, n)
        .into_iter()
        .cloned()
        .collect();
    selected.extend(rows.into_iter().filter(GroupedRow::is_total));
    Ok(selected)
}

/// Metrics with at least one non-zero value, then every rate.
fn numeric_columns(descriptor: &DomainDescriptor, rows: &[LabelledRow]) -> Vec<&'static str> {
    let metrics = descriptor
        .metrics
        .iter()
        .map(|m| m.name)
        .filter(|name| rows.iter().any(|r| r.row.metric(name) != 0.0));
    let rates = descriptor.rates.iter().map(|r| r.output);
    metrics.chain(rates).collect()
}

fn print_grouped_table(domain: Domain, dimension: &str, columns: &[&str], rows: &[LabelledRow]) {
    println!(
        "{}",
        format!("{} — by {}", title(domain), dimension).bold().cyan()
    );
    let width = 28 + columns.len() * 13;
    println!("{}", "=".repeat(width));

    let mut header = format!("  {:<26}", truncate(dimension, 26));
    for column in columns {
        header.push_str(&format!(" {:>12}", truncate(column, 12)));
    }
    println!("{}", header.bold());
    println!("  {}", "-".repeat(width - 2));

    for (i, labelled) in rows.iter().enumerate() {
        let mut line = format!("  {:<26}", truncate(&labelled.label, 26));
        for column in columns {
            let value = labelled.row.value(column);
            let cell = if labelled.row.rates.contains_key(*column) {
                format!("{value:.1}%")
            } else {
                format_value(value)
            };
            line.push_str(&format!(" {cell:>12}"));
        }

        if labelled.row.is_total() {
            println!("  {}", "-".repeat(width - 2));
            println!("{}", line.bold());
        } else if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_grouped_json(dimension: &str, rows: &[LabelledRow]) -> Result<()> {
    let values: Vec<_> = rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "group_key": r.row.group_key,
                "label": r.label,
                "metrics": r.row.metrics,
                "rates": r.row.rates,
            })
        })
        .collect();

    let value = serde_json::json!({ "group_by": dimension, "results": values });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_grouped_csv(dimension: &str, columns: &[&str], rows: &[LabelledRow]) {
    let mut header = vec![csv_field(dimension)];
    header.extend(columns.iter().map(|c| csv_field(c)));
    println!("{}", header.join(","));

    for labelled in rows {
        let mut fields = vec![csv_field(&labelled.label)];
        fields.extend(columns.iter().map(|c| labelled.row.value(c).to_string()));
        println!("{}", fields.join(","));
    }
}

// ---------------------------------------------------------------------------
// placement-stats latest | list
// ---------------------------------------------------------------------------

/// Show the most recent items of a domain.
pub fn run_latest(
    domain: Domain,
    limit: Option<usize>,
    filters: FilterSet,
    format: Option<OutputFormat>,
) -> Result<()> {
    let session = Session::load();
    let limit = limit.unwrap_or(session.config.queries.latest_limit);
    let mut query = LatestQuery::latest(domain, limit, &session.options);
    query.set_filters(filters);
    let page = session.fetch(&mut query)?;

    let heading = format!("{} — Latest {}", title(domain), page.results.len());
    print_page(&heading, &page, session.format(format))
}

/// Show one page of a domain listing.
pub fn run_list(
    domain: Domain,
    page: usize,
    page_size: Option<usize>,
    filters: FilterSet,
    format: Option<OutputFormat>,
) -> Result<()> {
    let session = Session::load();
    let page_size = page_size.unwrap_or(session.config.queries.page_size);
    let mut query = ListQuery::list(domain, page, page_size, &session.options);
    query.set_filters(filters);
    let result = session.fetch(&mut query)?;

    let heading = format!(
        "{} — Page {} ({} of {})",
        title(domain),
        page.max(1),
        result.results.len(),
        result.count
    );
    print_page(&heading, &result, session.format(format))
}

fn print_page(heading: &str, page: &Page, format: OutputFormat) -> Result<()> {
    if page.is_empty() && format == OutputFormat::Table {
        println!("{}", "No items.".yellow());
        return Ok(());
    }

    let columns = item_columns(&page.results);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
        OutputFormat::Csv => {
            println!(
                "{}",
                columns.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(",")
            );
            for item in &page.results {
                let fields: Vec<String> = columns
                    .iter()
                    .map(|c| csv_field(&scalar_text(item.get(c.as_str()))))
                    .collect();
                println!("{}", fields.join(","));
            }
        }
        OutputFormat::Table => {
            println!("{}", heading.bold().cyan());
            let shown: Vec<&String> = columns.iter().take(MAX_ITEM_COLUMNS).collect();
            let width = shown.len() * 19;
            println!("{}", "=".repeat(width.max(20)));

            let header: String = shown.iter().map(|c| format!("  {:<17}", truncate(c, 17))).collect();
            println!("{}", header.bold());
            for (i, item) in page.results.iter().enumerate() {
                let line: String = shown
                    .iter()
                    .map(|c| format!("  {:<17}", truncate(&scalar_text(item.get(c.as_str())), 17)))
                    .collect();
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }

            if page.has_next() {
                println!();
                println!("  {}", "More items available (--page).".dimmed());
            }
        }
    }

    Ok(())
}

/// Scalar keys of the items, in first-seen order, `id` first.
fn item_columns(items: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        for (key, value) in obj {
            if !(value.is_object() || value.is_array()) && !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    if let Some(pos) = columns.iter().position(|c| c == "id") {
        let id = columns.remove(pos);
        columns.insert(0, id);
    }
    columns
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// placement-stats activity
// ---------------------------------------------------------------------------

/// Summarize the fetch activity log.
pub fn run_activity(days: Option<u32>, format: Option<OutputFormat>) -> Result<()> {
    let cfg = config::load();
    let path = config::expand_home(&cfg.logging.path);
    let summary = reporter::compute_activity(&path, days);

    if summary.total_requests == 0 {
        let hint = if cfg.logging.enabled {
            "No fetch activity recorded yet."
        } else {
            "No fetch activity recorded ([logging] enabled = false)."
        };
        println!("{}", hint.yellow());
        return Ok(());
    }

    match format.unwrap_or(cfg.display.format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Csv => print_activity_csv(&summary),
        OutputFormat::Table => print_activity_table(&summary, days),
    }

    Ok(())
}

fn print_activity_table(summary: &ActivitySummary, days: Option<u32>) {
    let heading = match days {
        Some(days) => format!("Fetch Activity — Last {days} Days"),
        None => "Fetch Activity".to_string(),
    };
    println!("{}", heading.bold().cyan());
    println!("{}", "=".repeat(72));
    println!("  {} {}", "Requests:   ".bold(), format_number(summary.total_requests));
    println!(
        "  {} {} ({:.1}%)",
        "Errors:     ".bold(),
        summary.total_errors,
        summary.error_rate_pct
    );
    println!("  {} {}", "Discarded:  ".bold(), summary.total_discarded);
    println!("  {} {}", "Cache hits: ".bold(), summary.total_cache_hits);
    println!();

    println!(
        "  {:<14} {:<10} {:>8} {:>7} {:>9} {:>7} {:>10}",
        "Domain", "Endpoint", "Requests", "Errors", "Discarded", "Cached", "Avg ms"
    );
    println!("  {}", "-".repeat(70));
    for stat in &summary.endpoints {
        let errors = if stat.errors > 0 {
            stat.errors.to_string().red()
        } else {
            stat.errors.to_string().normal()
        };
        println!(
            "  {:<14} {:<10} {:>8} {:>7} {:>9} {:>7} {:>10}",
            stat.domain,
            stat.endpoint,
            stat.requests,
            errors,
            stat.discarded,
            stat.cache_hits,
            stat.avg_latency_ms
                .map(|ms| format!("{ms:.0}"))
                .unwrap_or_else(|| "-".to_string()),
        );
        if let Some(err) = &stat.last_error {
            println!("    {} {}", "last error:".dimmed(), truncate(err, 60).dimmed());
        }
    }
}

fn print_activity_csv(summary: &ActivitySummary) {
    println!("domain,endpoint,requests,applied,errors,discarded,cache_hits,error_rate_pct,avg_latency_ms");
    for s in &summary.endpoints {
        println!(
            "{},{},{},{},{},{},{},{:.1},{}",
            csv_field(&s.domain),
            csv_field(&s.endpoint),
            s.requests,
            s.applied,
            s.errors,
            s.discarded,
            s.cache_hits,
            s.error_rate_pct,
            s.avg_latency_ms.map(|ms| format!("{ms:.1}")).unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// placement-stats config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective placement-stats Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.placement-stats/config.toml");
    print_source(project_exists, ".placement-stats.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "PLACEMENT_STATS_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(found: bool, name: &str) {
    if found {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.placement-stats/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Set [api] base_url to your statistics API.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    let shown = if key.ends_with("token") { "********" } else { value };
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), shown);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn title(domain: Domain) -> &'static str {
    match domain {
        Domain::Formation => "Formations",
        Domain::Candidate => "Candidats",
        Domain::Prospection => "Prospections",
        Domain::Pairing => "Appairages",
        Domain::Workshop => "Ateliers TRE",
    }
}

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Counts print as integers, anything else with one decimal.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value >= 0.0 && value < usize::MAX as f64 {
        format_number(value as usize)
    } else {
        format!("{value:.1}")
    }
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
