//! airmerge CLI Entry Point

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use airmerge_cli::render::{
    CsvSink, Destination, HtmlSink, KmlSink, TableSink, TextSink, TextStyle,
};
use airmerge_cli::Cli;
use airmerge_core::{config::with_suffix, run, MergeError, RecordSink, RunSummary, EXIT_USAGE};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    // Initialize logging; RUST_LOG wins over -v
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute(&cli) {
        Ok(summary) => {
            print_summary(&cli, &summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e:#}", "[ERROR]".red().bold());
            let code = e
                .downcast_ref::<MergeError>()
                .map_or(EXIT_USAGE, MergeError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn execute(cli: &Cli) -> Result<RunSummary> {
    let config = cli.to_config();
    // Validated again inside the run; checked here so no sink is built for a bad config.
    config.validate()?;
    let prefix = config
        .output_prefix
        .clone()
        .context("an output prefix is required")?;

    let style = if cli.brief {
        TextStyle::Brief
    } else {
        TextStyle::Full
    };
    let text_target = if cli.stdout {
        Destination::Stdout
    } else {
        Destination::File(with_suffix(&prefix, ".txt"))
    };

    let mut csv = CsvSink::new(with_suffix(&prefix, ".csv"));
    let mut text = TextSink::new(text_target, style);
    let mut html = HtmlSink::new(with_suffix(&prefix, ".html"));
    let mut kml = KmlSink::new(with_suffix(&prefix, ".kml"));
    let mut table = TableSink::new();

    let mut sinks: Vec<&mut dyn RecordSink> = Vec::with_capacity(5);
    sinks.push(&mut csv);
    sinks.push(&mut text);
    sinks.push(&mut html);
    if cli.gps.is_some() {
        sinks.push(&mut kml);
    }
    if cli.table {
        sinks.push(&mut table);
    }

    let summary = run(config, &mut sinks)?;
    Ok(summary)
}

fn print_summary(cli: &Cli, summary: &RunSummary) {
    // Keep stdout clean when it carries the report.
    if cli.stdout {
        return;
    }
    println!(
        "{} merged {} snapshot(s): {} access points, {} stations ({})",
        "[OK]".green().bold(),
        summary.snapshots,
        summary.access_points,
        summary.stations,
        summary.merge,
    );
    println!(
        "  {} {} access points, {} stations",
        "Reported:".dimmed(),
        summary.reported_access_points,
        summary.reported_stations
    );
    if summary.suppressed_stations > 0 || summary.orphans > 0 {
        println!(
            "  {} {} stations throttled, {} remembered from earlier runs",
            "History:".dimmed(),
            summary.suppressed_stations,
            summary.orphans
        );
    }
    if let Some(placed) = summary.gps_placed {
        println!("  {} {} devices positioned", "GPS:".dimmed(), placed);
    }
    if summary.legacy_collisions > 0 {
        println!(
            "  {} {} legacy hash collisions",
            "[INFO]".blue(),
            summary.legacy_collisions
        );
    }
}
