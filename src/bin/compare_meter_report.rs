use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use nem12_validator::config::{Config, ValidationConfig};
use nem12_validator::db::{self, MeterReadingRepository, ReportIntervalRepository};
use nem12_validator::report::write_series_report;
use nem12_validator::services::{
    ValidationReport, ValidationRequest, ValidationService, ValidationSummary, EXIT_FATAL,
};
use nem12_validator::timeseries::LocfOptions;

#[derive(Parser)]
#[command(name = "compare-meter-report")]
#[command(about = "Validate a NEM12 report series against raw meter readings", long_about = None)]
struct Cli {
    /// Meter identifier in the meter database
    #[arg(long)]
    meter_id: String,

    /// Report identifier in the report database
    #[arg(long)]
    report_id: String,

    /// Window start (RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`, UTC)
    #[arg(long, value_parser = parse_timestamp)]
    start: DateTime<Utc>,

    /// Window end, exclusive
    #[arg(long, value_parser = parse_timestamp)]
    end: DateTime<Utc>,

    /// Output directory (defaults to OUTPUT_DIR)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Forward-fill missing cumulative meter readings before computing usage
    #[arg(long)]
    apply_meter_locf: bool,

    /// Aligned interval length (defaults to INTERVAL_MINUTES)
    #[arg(long)]
    interval_minutes: Option<u32>,

    /// Report quality token marking a substituted interval (repeatable)
    #[arg(long = "locf-quality")]
    locf_quality: Vec<String>,

    /// Skip the LOCF validation pass
    #[arg(long)]
    skip_locf: bool,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{s}'"))
}

async fn run(cli: Cli) -> Result<ValidationReport, Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| {
        format!("METER_DATABASE_URL and REPORT_DATABASE_URL must be set: {e}")
    })?;

    let meter_pool = db::connect("meter", &config.meter_database_url).await?;
    let report_pool = db::connect("report", &config.report_database_url).await?;

    let validation_config = ValidationConfig::default();
    let locf = if cli.skip_locf {
        None
    } else {
        let mut options = LocfOptions::from_config(&validation_config);
        options.apply_fill = cli.apply_meter_locf;
        if !cli.locf_quality.is_empty() {
            options = options.with_locf_quality_values(cli.locf_quality.clone());
        }
        Some(options)
    };

    let service = ValidationService::new(
        MeterReadingRepository::new(meter_pool.clone()),
        ReportIntervalRepository::new(report_pool.clone()),
        validation_config,
    );

    let request = ValidationRequest {
        meter_id: cli.meter_id,
        report_id: cli.report_id,
        start: cli.start,
        end: cli.end,
        interval_minutes: cli.interval_minutes.unwrap_or(config.interval_minutes),
        locf,
    };

    let validated = service.validate(request).await;
    meter_pool.close().await;
    report_pool.close().await;
    let report = validated?;

    let out_dir = cli.out.unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let paths = write_series_report(&report, &out_dir)?;
    info!("Report written to {}", out_dir.display());
    println!("Summary: {}", paths.summary.display());

    Ok(report)
}

fn print_summary(summary: &ValidationSummary) {
    println!("\n{}", "=".repeat(60));
    println!("Meter {} vs report {}", summary.meter_id, summary.report_id);
    println!(
        "Matches: {} / {} ({:.2}%)",
        summary.matches, summary.total_intervals, summary.match_percentage
    );
    println!(
        "Missing NEM: {}  Missing meter: {}",
        summary.missing_nem, summary.missing_meter
    );
    println!("Discrepancies: {}", summary.discrepancies_count);
    if let (Some(count), Some(pct)) = (summary.locf_count, summary.locf_match_percentage) {
        println!("LOCF intervals: {count} ({pct:.2}% match)");
    }
    println!("{}", "=".repeat(60));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            print_summary(&report.summary());
            ExitCode::from(report.exit_status())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}
