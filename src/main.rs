//! pmtalyzer - PowerMTA Accounting Log Analyzer
//!
//! This tool reads PowerMTA accounting-log CSV files (plain, gzip or zip),
//! classifies each delivery attempt, and reports aggregate delivery, bounce
//! and VMTA statistics with optional search and filter criteria applied.
//!
//! The tool outputs results in one of three formats: Table, CSV, or JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use pmtalyzer::config::Config;
use pmtalyzer::csv_parser::parse_accounting_csv;
use pmtalyzer::file_handlers::read_log_source;
use pmtalyzer::models::{
    parse_log_timestamp, AnalysisResult, DateRange, DeliveryStatus, FilterCriteria, SearchField,
    SearchQuery,
};
use pmtalyzer::webhook::WebhookHandler;
use pmtalyzer::{analyzer, export, filter, search};
use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// CLI arguments for pmtalyzer.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "PowerMTA accounting log analyzer in Rust",
    long_about = "pmtalyzer reads PowerMTA accounting-log CSV files (plain, gzip or zip), \
                  classifies each delivery attempt, and reports aggregate delivery, bounce \
                  and VMTA statistics.\n\n\
                  USAGE:\n  pmtalyzer <FILE> [--output <table|csv|json>] [--verbose]",
    override_usage = "pmtalyzer <FILE> [OPTIONS]"
)]
struct Cli {
    /// Path to a PowerMTA accounting log (.csv, .log, .gz or .zip)
    #[arg(value_parser)]
    file: PathBuf,

    /// Output format: table, csv, json
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep only records with this delivery status (e.g. delivered, failed)
    #[arg(long)]
    status: Option<DeliveryStatus>,

    /// Keep only records sent through this VMTA (or source IP)
    #[arg(long)]
    vmta: Option<String>,

    /// Keep only records with this bounce category
    #[arg(long)]
    bounce_category: Option<String>,

    /// Keep only records logged at or after this timestamp
    #[arg(long)]
    from: Option<String>,

    /// Keep only records logged at or before this timestamp
    #[arg(long)]
    to: Option<String>,

    /// Substring to search for (case-insensitive)
    #[arg(long)]
    search: Option<String>,

    /// Field the search runs against: recipient, sender, diagnostic, vmta, all
    #[arg(long, default_value = "all")]
    search_field: SearchField,
}

/// Supported output formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity.
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    println!(
        "{}\n{}\n",
        "pmtalyzer - PowerMTA Accounting Log Analyzer".bold().green(),
        "Parsing, classifying & aggregating delivery data".dimmed()
    );

    log::info!("Processing file: {}", cli.file.display());
    let config = Config::new().context("Failed to load configuration")?;

    let sources = read_log_source(&cli.file, &config).context("Failed to read log file")?;

    let mut records = Vec::new();
    for content in &sources {
        let parsed =
            parse_accounting_csv(content).context("Failed to parse accounting log")?;
        records.extend(parsed);
    }
    log::info!("Parsed {} delivery records", records.len());

    let criteria = build_criteria(&cli)?;
    let mut records = filter::filter(&records, &criteria);
    if let Some(term) = &cli.search {
        let query = SearchQuery {
            term: term.clone(),
            field: cli.search_field,
        };
        records = search::search(&records, &query);
    }
    log::info!("{} records after filtering", records.len());

    let analysis = analyzer::analyze(&records);

    match cli.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        OutputFormat::Csv => {
            export::write_csv(&records, std::io::stdout())?;
        }
        OutputFormat::Table => {
            print_tables(&analysis);
        }
    }

    if let Some(url) = &config.webhook_url {
        log::info!("Sending analysis to webhook: {}", url);
        let handler =
            WebhookHandler::new(url, Duration::from_secs(config.webhook_timeout), 3)?;
        handler.send(&analysis).await?;
    }

    log::info!("{}", "Analysis complete!".bold().cyan());
    Ok(())
}

/// Builds the filter criteria from the CLI flags. A `--from`/`--to` bound
/// left out is unbounded on that side.
fn build_criteria(cli: &Cli) -> Result<FilterCriteria> {
    let date_range = match (&cli.from, &cli.to) {
        (None, None) => None,
        (from, to) => {
            let start = match from {
                Some(text) => parse_cli_timestamp(text)?,
                None => DateTime::<Utc>::MIN_UTC,
            };
            let end = match to {
                Some(text) => parse_cli_timestamp(text)?,
                None => DateTime::<Utc>::MAX_UTC,
            };
            Some(DateRange { start, end })
        }
    };
    Ok(FilterCriteria {
        status: cli.status.clone(),
        vmta: cli.vmta.clone(),
        bounce_category: cli.bounce_category.clone(),
        date_range,
    })
}

fn parse_cli_timestamp(text: &str) -> Result<DateTime<Utc>> {
    parse_log_timestamp(text)
        .ok_or_else(|| anyhow::anyhow!("Unrecognized timestamp: {}", text))
}

/// Renders the analysis summary as colored tables.
fn print_tables(analysis: &AnalysisResult) {
    let overview = &analysis.overview;
    println!("{}", "Delivery Overview".bold().blue());
    println!("{}", "----------------------------".dimmed());
    println!("{}: {}", "Total".bold(), overview.total);
    println!(
        "{}: {} ({:.1}%)",
        "Delivered".bold(),
        overview.delivered,
        overview.delivery_rate
    );
    println!(
        "{}: {} ({:.1}%)",
        "Failed".bold(),
        overview.failed,
        overview.failure_rate
    );
    println!(
        "{}: {} ({:.1}%)",
        "Queued".bold(),
        overview.queued,
        overview.queued_rate
    );
    println!(
        "{}: {} ({:.1}%)",
        "Deferred".bold(),
        overview.deferred,
        overview.deferred_rate
    );
    println!("{}: {}\n", "Other".bold(), overview.other);

    if overview.total == 0 {
        println!("{}", "No delivery records found.".yellow());
        return;
    }

    println!("{}", "VMTA Performance".bold().blue());
    let mut vmta_table = Table::new();
    vmta_table.add_row(row!["VMTA", "Total", "Delivered", "Failed", "Delivery %"]);
    for (name, stats) in &analysis.vmta_performance {
        vmta_table.add_row(row![
            name,
            stats.total,
            stats.delivered,
            stats.failed,
            format!("{:.1}", stats.delivery_rate)
        ]);
    }
    vmta_table.printstd();

    if !analysis.bounce_analysis.is_empty() {
        println!("\n{}", "Bounce Categories".bold().blue());
        let mut bounce_table = Table::new();
        bounce_table.add_row(row!["Category", "Count"]);
        for (category, count) in &analysis.bounce_analysis {
            bounce_table.add_row(row![category, count]);
        }
        bounce_table.printstd();
    }

    if !analysis.time_series.is_empty() {
        println!("\n{}", "Hourly Volume".bold().blue());
        let mut series_table = Table::new();
        series_table.add_row(row!["Hour", "Total", "Delivered", "Failed"]);
        for bucket in &analysis.time_series {
            series_table.add_row(row![
                bucket.bucket,
                bucket.total,
                bucket.delivered,
                bucket.failed
            ]);
        }
        series_table.printstd();
    }

    if !analysis.top_recipients.is_empty() {
        println!("\n{}", "Top Recipients".bold().blue());
        let mut table = Table::new();
        table.add_row(row!["Recipient", "Messages"]);
        for entry in &analysis.top_recipients {
            table.add_row(row![entry.address, entry.count]);
        }
        table.printstd();
    }

    if !analysis.top_senders.is_empty() {
        println!("\n{}", "Top Senders".bold().blue());
        let mut table = Table::new();
        table.add_row(row!["Sender", "Messages"]);
        for entry in &analysis.top_senders {
            table.add_row(row![entry.address, entry.count]);
        }
        table.printstd();
    }
}
