use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nem12_validator::compare::{ComparisonSummary, DiffEngine, FileComparison};
use nem12_validator::config::{ValidationConfig, DEFAULT_FILE_TOLERANCE};
use nem12_validator::nem12::{Nem12Error, Nem12Reader};
use nem12_validator::report::{write_issues_csv, IssuesCsvHeader};

#[derive(Parser)]
#[command(name = "nem12-validator")]
#[command(about = "Compare a BEFORE and an AFTER NEM12 file interval by interval", long_about = None)]
struct Cli {
    /// Reference NEM12 file
    before: PathBuf,

    /// Candidate NEM12 file
    after: PathBuf,

    /// Absolute tolerance for numeric interval values
    #[arg(long, default_value_t = DEFAULT_FILE_TOLERANCE)]
    tolerance: f64,

    /// Key intervals by NMI only, ignoring the channel
    #[arg(long)]
    no_channel: bool,

    /// Write the issues CSV to this path
    #[arg(long, env = "NEM12_ISSUES_CSV")]
    out: Option<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(cli: &Cli) -> Result<FileComparison, Box<dyn std::error::Error>> {
    let config = ValidationConfig::default()
        .with_file_tolerance(cli.tolerance)
        .with_key_by_channel(!cli.no_channel);

    let reader = Nem12Reader::new(&config);
    let before = reader.read_path(&cli.before)?;
    let after = reader.read_path(&cli.after)?;

    let comparison = DiffEngine::new(&config).compare(&before, &after);

    if let Some(out) = &cli.out {
        let header = IssuesCsvHeader::new(file_name(&cli.before), file_name(&cli.after));
        write_issues_csv(out, &header, &comparison.discrepancies)?;
    }

    Ok(comparison)
}

fn print_comparison(comparison: &FileComparison) {
    let summary = &comparison.summary;

    println!("\n{}", "=".repeat(60));
    println!("BEFORE: {}", comparison.before_file);
    println!("AFTER:  {}", comparison.after_file);
    println!("{}", "=".repeat(60));

    for discrepancy in &comparison.discrepancies {
        println!("  {discrepancy}");
    }

    println!("\n{summary}");

    if summary.is_identical() {
        println!("\n✓ Files are identical");
    } else {
        println!("\n✗ Found {} discrepancies", summary.total_issues);
    }
}

fn main() -> ExitCode {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nem12_validator=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    info!(
        "Comparing {} against {}",
        cli.after.display(),
        cli.before.display()
    );

    match run(&cli) {
        Ok(comparison) => {
            print_comparison(&comparison);
            if comparison.summary.is_identical() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            match e.downcast_ref::<Nem12Error>() {
                Some(Nem12Error::InputNotFound(path)) => error!("Input file not found: {}", path),
                _ => error!("Validation failed: {}", e),
            }
            println!("\n{}", ComparisonSummary::default());
            ExitCode::from(2)
        }
    }
}
