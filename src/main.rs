use anyhow::Result;
use clap::{Parser, Subcommand};

use placement_stats::cli::{self, GroupedArgs, OutputFormat};
use placement_stats::domains::Domain;
use placement_stats::query::{FilterSet, parse_filter_arg};

#[derive(Debug, Parser)]
#[command(name = "placement-stats")]
#[command(about = "Normalized statistics for the training & placement dashboard API")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the overview KPIs of a domain
    Overview {
        /// formation, candidate, prospection, pairing or workshop
        domain: String,
        /// Filter as key=value (repeatable), e.g. --filter centre=3
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        /// Output format: table (default), json, csv
        #[arg(long)]
        format: Option<String>,
    },
    /// Show grouped statistics with labels and a totals row
    Grouped {
        domain: String,
        /// Grouping dimension (centre, departement, statut, ...)
        #[arg(long)]
        by: String,
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        /// Do not append the computed totals row
        #[arg(long)]
        no_totals: bool,
        /// Keep only the N highest rows
        #[arg(long)]
        top: Option<usize>,
        /// Metric or rate used to rank rows for --top
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        format: Option<String>,
    },
    /// Show the most recent items of a domain
    Latest {
        domain: String,
        /// Number of items (default: [queries] latest_limit)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        #[arg(long)]
        format: Option<String>,
    },
    /// Show one page of a domain listing
    List {
        domain: String,
        #[arg(long, default_value = "1")]
        page: usize,
        /// Items per page (default: [queries] page_size)
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
        #[arg(long)]
        format: Option<String>,
    },
    /// Summarize the fetch activity log per endpoint
    Activity {
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        format: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.placement-stats/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `api.base_url https://host/api`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Overview {
            domain,
            filters,
            format,
        } => cli::run_overview(domain.parse()?, parse_filters(&filters)?, output_format(format)),
        Commands::Grouped {
            domain,
            by,
            filters,
            no_totals,
            top,
            sort,
            format,
        } => {
            let args = GroupedArgs {
                by,
                totals: no_totals.then_some(false),
                top,
                sort,
            };
            cli::run_grouped(
                domain.parse::<Domain>()?,
                args,
                parse_filters(&filters)?,
                output_format(format),
            )
        }
        Commands::Latest {
            domain,
            limit,
            filters,
            format,
        } => cli::run_latest(
            domain.parse()?,
            limit,
            parse_filters(&filters)?,
            output_format(format),
        ),
        Commands::List {
            domain,
            page,
            page_size,
            filters,
            format,
        } => cli::run_list(
            domain.parse()?,
            page,
            page_size,
            parse_filters(&filters)?,
            output_format(format),
        ),
        Commands::Activity { days, format } => cli::run_activity(days, output_format(format)),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

fn parse_filters(args: &[String]) -> Result<FilterSet> {
    args.iter()
        .map(|arg| parse_filter_arg(arg))
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

fn output_format(format: Option<String>) -> Option<OutputFormat> {
    format.map(|f| OutputFormat::from_str_opt(Some(&f)))
}
