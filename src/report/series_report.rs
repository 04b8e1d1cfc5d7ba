use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::ReportError;
use crate::services::ValidationReport;

pub const DISCREPANCIES_FILE: &str = "discrepancies.csv";
pub const LOCF_DETAILS_FILE: &str = "locf_details.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Files produced by [`write_series_report`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub discrepancies: Option<PathBuf>,
    pub locf_details: Option<PathBuf>,
    pub summary: PathBuf,
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a validation run into `out_dir`.
///
/// The CSV files are only written when they would have rows; the summary is
/// always written.
pub fn write_series_report(
    report: &ValidationReport,
    out_dir: &Path,
) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(out_dir)?;

    let discrepancies = if report.discrepancies.is_empty() {
        None
    } else {
        let path = out_dir.join(DISCREPANCIES_FILE);
        write_rows(&path, &report.discrepancies)?;
        info!(
            "Wrote {} discrepancies to {}",
            report.discrepancies.len(),
            path.display()
        );
        Some(path)
    };

    let locf_details = match &report.locf {
        Some(locf) if !locf.details.is_empty() => {
            let path = out_dir.join(LOCF_DETAILS_FILE);
            write_rows(&path, &locf.details)?;
            info!("Wrote {} LOCF rows to {}", locf.details.len(), path.display());
            Some(path)
        }
        _ => None,
    };

    let summary = out_dir.join(SUMMARY_FILE);
    let mut writer = BufWriter::new(File::create(&summary)?);
    serde_json::to_writer_pretty(&mut writer, &report.summary())?;
    writer.flush()?;
    info!("Wrote summary to {}", summary.display());

    Ok(ReportPaths {
        discrepancies,
        locf_details,
        summary,
    })
}
