use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use analyzer::{FixedClock, StatsAnalyzer};
use config::Config;
use types::Stats;

mod analyzer;
mod archive;
mod config;
mod debug_log;
mod projections;
mod report;
mod reqwest_simd_json;
mod share;
mod types;
mod utils;

#[derive(Parser)]
#[command(name = "gptwrapped")]
#[command(version)]
#[command(about = "Usage statistics from a ChatGPT conversations.json export")]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to conversations.json (shows the summary when no subcommand is given)
    file: Option<PathBuf>,

    /// Output stats as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    format: FormatArgs,

    /// Date undated messages as this RFC 3339 instant instead of the current time
    #[arg(long, global = true, value_parser = parse_instant)]
    as_of: Option<DateTime<Utc>>,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 timestamp '{value}'"))
}

/// Settings shared by every command that analyzes an archive.
struct RunContext {
    config: Config,
    format_options: utils::NumberFormatOptions,
    as_of: Option<DateTime<Utc>>,
}

impl RunContext {
    fn load(format: &FormatArgs, as_of: Option<DateTime<Utc>>) -> Result<Self> {
        let config = Config::load_or_default().context("Config error")?;
        Ok(Self {
            format_options: number_format_options(format, &config),
            config,
            as_of,
        })
    }
}

#[derive(Args, Clone, Default)]
struct FormatArgs {
    /// Use comma-separated number formatting
    #[arg(long, global = true)]
    number_comma: bool,

    /// Use human-readable number formatting (k, m, b, t)
    #[arg(short = 'H', long, global = true)]
    number_human: bool,

    /// Locale for number formatting (en, de, fr, es, it, ja, ko, zh)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Number of decimal places for human-readable formatting
    #[arg(long, global = true)]
    decimal_places: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the usage summary
    Summary(FileArgs),
    /// Output the full statistics as JSON
    Stats(StatsArgs),
    /// Weekly message counts stacked by model
    Weekly(JsonArgs),
    /// Distribution of conversation lengths
    Histogram(JsonArgs),
    /// Share anonymized aggregate statistics
    Share(ShareArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct FileArgs {
    /// Path to conversations.json
    file: PathBuf,
}

#[derive(Args)]
struct StatsArgs {
    /// Path to conversations.json
    file: PathBuf,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct JsonArgs {
    /// Path to conversations.json
    file: PathBuf,

    /// Emit JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct ShareArgs {
    /// Path to conversations.json
    file: PathBuf,

    /// Print the payload that would be sent without sending it
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (timezone, week-start, server-url, timeout-seconds, submission-id,
        /// number-comma, number-human, locale, decimal-places)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    debug_log::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Dispatch a parsed command line. The config file is only read by commands
/// that analyze an archive, so `config init --overwrite` can repair a broken one.
async fn run(cli: Cli) -> Result<()> {
    let context = || RunContext::load(&cli.format, cli.as_of);

    match cli.command {
        None => match cli.file {
            Some(file) if cli.json => run_stats(&file, true, &context()?),
            Some(file) => run_summary(&file, &context()?),
            None => {
                eprintln!("Usage: gptwrapped <conversations.json>  (see --help)");
                std::process::exit(2);
            }
        },
        Some(Commands::Summary(args)) => run_summary(&args.file, &context()?),
        Some(Commands::Stats(args)) => run_stats(&args.file, args.pretty, &context()?),
        Some(Commands::Weekly(args)) => run_weekly(&args, &context()?),
        Some(Commands::Histogram(args)) => run_histogram(&args, &context()?),
        Some(Commands::Share(args)) => run_share(args, context()?).await,
        Some(Commands::Config(args)) => handle_config_subcommand(args),
    }
}

fn number_format_options(args: &FormatArgs, config: &Config) -> utils::NumberFormatOptions {
    utils::NumberFormatOptions {
        use_comma: args.number_comma || config.formatting.number_comma,
        use_human: args.number_human || config.formatting.number_human,
        locale: args
            .locale
            .clone()
            .unwrap_or_else(|| config.formatting.locale.clone()),
        decimal_places: args
            .decimal_places
            .unwrap_or(config.formatting.decimal_places),
    }
}

fn analyze_file(path: &Path, ctx: &RunContext) -> Result<(Stats, Tz)> {
    let archive = archive::load_archive(path)
        .context("Please make sure it's a valid ChatGPT conversations.json export")?;
    let tz = ctx.config.timezone()?;

    let _timer = debug_log::Timed::new(
        "ANALYZE",
        format!("{} conversations ({tz})", archive.conversations.len()),
    );
    let analyzer = StatsAnalyzer::new()
        .with_timezone(tz)
        .with_week_start(ctx.config.analysis.week_start);
    let stats = match ctx.as_of {
        Some(now) => analyzer.with_clock(FixedClock(now)).analyze(&archive),
        None => analyzer.analyze(&archive),
    };

    Ok((stats, tz))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        simd_json::to_string_pretty(value)?
    } else {
        simd_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn run_summary(file: &Path, ctx: &RunContext) -> Result<()> {
    let (stats, tz) = analyze_file(file, ctx)?;
    report::print_summary(&stats, &tz, &ctx.format_options);
    Ok(())
}

fn run_stats(file: &Path, pretty: bool, ctx: &RunContext) -> Result<()> {
    let (stats, _) = analyze_file(file, ctx)?;
    print_json(&stats, pretty)
}

fn run_weekly(args: &JsonArgs, ctx: &RunContext) -> Result<()> {
    let (stats, _) = analyze_file(&args.file, ctx)?;
    let series = projections::weekly_series(&stats);
    if args.json {
        print_json(&series, args.pretty)
    } else {
        report::print_weekly(&series, &ctx.format_options);
        Ok(())
    }
}

fn run_histogram(args: &JsonArgs, ctx: &RunContext) -> Result<()> {
    let (stats, _) = analyze_file(&args.file, ctx)?;
    let bins = projections::length_histogram(&stats.chat_lengths);
    if args.json {
        print_json(&bins, args.pretty)
    } else {
        report::print_histogram(&bins, &ctx.format_options);
        Ok(())
    }
}

async fn run_share(args: ShareArgs, ctx: RunContext) -> Result<()> {
    let (stats, _) = analyze_file(&args.file, &ctx)?;
    let mut config = ctx.config;
    let (submission_id, created) = config.ensure_submission_id();
    let submission = share::build_submission(&stats, &submission_id, Utc::now());

    if args.dry_run {
        return print_json(&submission, true);
    }

    if config.is_server_url_missing() {
        anyhow::bail!("No share server configured. Run `gptwrapped config set server-url <URL>`");
    }
    if created {
        config
            .save(true)
            .context("Failed to persist the submission id")?;
    }

    share::submit(&submission, &config.share)
        .await
        .context("Failed to share statistics")?;
    println!(
        "✅ Shared anonymized statistics for {} conversations.",
        submission.conversation_count
    );
    Ok(())
}

fn handle_config_subcommand(config_args: ConfigArgs) -> Result<()> {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            config::create_default_config(overwrite).context("Error creating config")
        }
        ConfigSubcommands::Show => config::show_config().context("Error showing config"),
        ConfigSubcommands::Set { key, value } => {
            config::set_config_value(&key, &value).context("Error setting config")
        }
    }
}
