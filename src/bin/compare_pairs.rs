use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use nem12_validator::compare::{Discrepancy, DiffEngine};
use nem12_validator::config::{ValidationConfig, DEFAULT_FILE_TOLERANCE};
use nem12_validator::nem12::Nem12Reader;
use nem12_validator::report::{write_issues_csv, IssuesCsvHeader};

#[derive(Parser)]
#[command(name = "compare-pairs")]
#[command(about = "Compare every BEFORE/AFTER pair listed in a mapping file", long_about = None)]
struct Cli {
    /// JSON file with a `comparison_pairs` list
    #[arg(long, default_value = "config/metadata_mapping.json")]
    mapping: PathBuf,

    /// Directory holding the BEFORE files
    #[arg(long, default_value = "Data/Before_Production")]
    before_dir: PathBuf,

    /// Directory holding the AFTER files
    #[arg(long, default_value = "Data/After_Production")]
    after_dir: PathBuf,

    /// Directory for the combined results CSV
    #[arg(long, default_value = "Results")]
    out_dir: PathBuf,

    /// Absolute tolerance for numeric interval values
    #[arg(long, default_value_t = DEFAULT_FILE_TOLERANCE)]
    tolerance: f64,
}

#[derive(Debug, Deserialize)]
struct Mapping {
    #[serde(default)]
    comparison_pairs: Vec<PairEntry>,
}

#[derive(Debug, Deserialize)]
struct PairEntry {
    before_file: Option<String>,
    after_file: Option<String>,
}

#[derive(Debug, Default)]
struct RunTally {
    successful: usize,
    failed: usize,
    skipped: usize,
}

fn load_mapping(path: &Path) -> Result<Mapping, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read mapping {}: {}", path.display(), e))?;
    let mapping: Mapping = serde_json::from_str(&content)?;
    Ok(mapping)
}

fn main() -> ExitCode {
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

    let mapping = match load_mapping(&cli.mapping) {
        Ok(mapping) => mapping,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return ExitCode::from(1);
        }
    };

    if mapping.comparison_pairs.is_empty() {
        error!("No comparison_pairs configured in {}", cli.mapping.display());
        return ExitCode::from(1);
    }

    if let Err(e) = std::fs::create_dir_all(&cli.out_dir) {
        error!("Failed to create {}: {}", cli.out_dir.display(), e);
        return ExitCode::from(1);
    }

    let config = ValidationConfig::default().with_file_tolerance(cli.tolerance);
    let reader = Nem12Reader::new(&config);
    let engine = DiffEngine::new(&config);

    let total = mapping.comparison_pairs.len();
    info!("Starting comparison of {} file pair(s)", total);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut tally = RunTally::default();
    let mut all_issues: Vec<Discrepancy> = Vec::new();
    let mut last_names = (String::new(), String::new());

    for (idx, pair) in mapping.comparison_pairs.iter().enumerate() {
        let position = idx + 1;
        pb.inc(1);

        let (before_file, after_file) = match (&pair.before_file, &pair.after_file) {
            (Some(b), Some(a)) if !b.is_empty() && !a.is_empty() => (b, a),
            _ => {
                warn!("[{}/{}] Skipped: missing file names in pair", position, total);
                tally.skipped += 1;
                continue;
            }
        };
        last_names = (before_file.clone(), after_file.clone());
        pb.set_message(format!("{before_file} vs {after_file}"));

        let parsed = reader
            .read_path(&cli.before_dir.join(before_file))
            .and_then(|before| Ok((before, reader.read_path(&cli.after_dir.join(after_file))?)));

        match parsed {
            Ok((before, after)) => {
                let comparison = engine.compare(&before, &after);
                info!(
                    "[{}/{}] RUN_{:03}: {} issues",
                    position,
                    total,
                    position,
                    comparison.discrepancies.len()
                );
                all_issues.extend(comparison.discrepancies);
                tally.successful += 1;
            }
            Err(e) => {
                error!("[{}/{}] {}", position, total, e);
                tally.failed += 1;
            }
        }
    }
    pb.finish_with_message("✓ Comparisons complete");

    let out_name = format!(
        "comparison_results_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let out_path = cli.out_dir.join(out_name);
    let header = IssuesCsvHeader::new(last_names.0, last_names.1);
    let csv_path = match write_issues_csv(&out_path, &header, &all_issues) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to write results CSV: {}", e);
            return ExitCode::from(1);
        }
    };

    println!("\n{}", "=".repeat(60));
    println!("COMPARISON SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total pairs processed: {total}");
    println!("Successful: {}", tally.successful);
    println!("Failed: {}", tally.failed);
    println!("Skipped: {}", tally.skipped);
    println!("Total issues found: {}", all_issues.len());
    println!("Results CSV: {}", csv_path.display());
    println!("{}", "=".repeat(60));

    if tally.failed > 0 {
        warn!("{} comparison(s) failed", tally.failed);
        ExitCode::from(1)
    } else {
        info!("All comparisons completed successfully");
        ExitCode::SUCCESS
    }
}
