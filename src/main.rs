//! ercot-prices - command line front end
//!
//! Lists the supported reports and runs one price query through the pipeline,
//! printing a table preview, summary statistics and the hour-of-day table.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ercot_prices::export::write_csv_file;
use ercot_prices::stats::DEFAULT_HISTOGRAM_BINS;
use ercot_prices::types::{CanonicalSeries, TIMESTAMP_FORMAT};
use ercot_prices::{
    summarize, Config, DateRange, FetchStatus, HourFilter, ReportKind, ReportQuery, ReqwestHttpClient,
    Session, SummaryOutcome, ALL_REPORTS,
};

#[derive(Parser)]
#[command(author, version, about = "ERCOT LMP/SPP price retrieval and summary")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported report types
    Reports,

    /// Fetch a price series and summarize it
    Fetch {
        /// Report type: dam-lmp, dam-spp, rtm-lmp or rtm-spp
        #[arg(long)]
        report: ReportKind,

        /// Bus or settlement point name (e.g. "HB_HOUSTON")
        #[arg(long)]
        location: String,

        /// First delivery date, YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// Last delivery date (inclusive), YYYY-MM-DD
        #[arg(long)]
        end: String,

        /// Keep sub-hourly intervals instead of hourly means
        #[arg(long)]
        no_resample: bool,

        /// Restrict statistics to hours 06:00-17:59
        #[arg(long)]
        solar_hours: bool,

        /// Histogram bins
        #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
        bins: usize,

        /// Rows shown from each end of the series
        #[arg(long, default_value_t = 5)]
        rows: usize,

        /// Write the series as CSV into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Print the result as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a str,
    location: &'a str,
    start: String,
    end: String,
    resampled: bool,
    fetch: FetchStatus,
    samples: usize,
    summary: &'a SummaryOutcome,
    csv_path: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ercot_prices=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reports => {
            print_reports();
            Ok(())
        }
        Commands::Fetch {
            report,
            location,
            start,
            end,
            no_resample,
            solar_hours,
            bins,
            rows,
            csv_dir,
            json,
        } => {
            let range = DateRange::parse(&start, &end)?;
            let config = Config::from_env().context("ERCOT API credentials are not configured")?;
            let client = ReqwestHttpClient::new(config.http_timeout).map_err(anyhow::Error::msg)?;
            let mut session = Session::new(config, client);

            let query = ReportQuery::new(report, &location, range).with_resample(!no_resample);
            let result = session.run_query(&query)?;

            let filter = if solar_hours {
                HourFilter::SolarHours
            } else {
                HourFilter::AllHours
            };
            let summary = summarize(&result.series, filter, bins);

            let csv_path = match &csv_dir {
                Some(dir) => Some(write_csv_file(
                    &result.series,
                    dir,
                    &query.location,
                    report.descriptor(),
                    &range,
                )?),
                None => None,
            };

            if json {
                let output = JsonOutput {
                    report: report.descriptor().id,
                    location: &query.location,
                    start: range.start.to_string(),
                    end: range.end.to_string(),
                    resampled: result.resampled,
                    fetch: result.status,
                    samples: result.series.len(),
                    summary: &summary,
                    csv_path: csv_path.as_ref().map(|p| p.display().to_string()),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            print_status(&result.status, result.resampled);
            print_preview(&result.series, rows);
            print_summary(&summary);
            if let Some(path) = csv_path {
                println!("\nCSV written to {}", path.display());
            }

            info!("Done");
            Ok(())
        }
    }
}

fn print_reports() {
    println!("{:<9} {:<34} {:<22} {:<16} {}", "ID", "ENDPOINT", "PRICE FIELD", "LOCATION FIELD", "RESOLUTION");
    for report in ALL_REPORTS {
        let resolution = if report.is_sub_hourly() { "sub-hourly" } else { "hourly" };
        println!(
            "{:<9} {:<34} {:<22} {:<16} {}",
            report.id, report.endpoint, report.price_field, report.location_field, resolution
        );
    }
}

fn print_status(status: &FetchStatus, resampled: bool) {
    match status {
        FetchStatus::Complete => println!("Fetch complete{}", if resampled { " (resampled to hourly)" } else { "" }),
        FetchStatus::NoRecords => println!("No records returned for this selection"),
        FetchStatus::Truncated { fetched, total } => println!(
            "WARNING: result truncated, {} of {} records fetched (raise ERCOT_MAX_PAGES or narrow the range)",
            fetched, total
        ),
    }
}

fn print_preview(series: &CanonicalSeries, rows: usize) {
    if series.is_empty() {
        return;
    }

    let location_header = series.location_field.as_deref().unwrap_or("");
    println!("\n{:<20} {:>12} {}", "timestamp", series.price_field, location_header);

    let print_row = |i: usize| {
        let sample = &series.samples[i];
        println!(
            "{:<20} {:>12.2} {}",
            sample.timestamp.format(TIMESTAMP_FORMAT),
            sample.price,
            sample.location.as_deref().unwrap_or("")
        );
    };

    match preview_split(series.len(), rows) {
        None => (0..series.len()).for_each(&print_row),
        Some(hidden) => {
            (0..rows).for_each(&print_row);
            println!("... {} more rows ...", hidden);
            (series.len() - rows..series.len()).for_each(&print_row);
        }
    }
}

/// Rows hidden between head and tail, or `None` when everything fits
fn preview_split(len: usize, rows: usize) -> Option<usize> {
    let shown = rows.saturating_mul(2);
    (len > shown).then(|| len - shown)
}

fn print_summary(outcome: &SummaryOutcome) {
    let summary = match outcome {
        SummaryOutcome::Summary(summary) => summary,
        SummaryOutcome::EmptySummary { .. } => {
            println!("\nNo data for this selection");
            return;
        }
    };

    println!("\nSummary ({:?})", summary.filter);
    println!("  count   {}", summary.count);
    println!("  mean    {:.2}", summary.mean);
    println!("  median  {:.2}", summary.median);
    println!("  max     {:.2}", summary.max);
    println!("  min     {:.2}", summary.min);

    println!("\nHistogram");
    for bin in &summary.histogram {
        println!("  [{:>9.2}, {:>9.2}]  {}", bin.lower, bin.upper, bin.count);
    }

    println!("\nHour of day");
    println!("  {:>4} {:>10} {:>6}", "hour", "mean", "count");
    for hour in &summary.hourly {
        println!("  {:>4} {:>10.2} {:>6}", hour.hour, hour.mean, hour.count);
    }
}
