use chrono::{DateTime, Local};
use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compare::{Discrepancy, DiscrepancyKind};
use crate::report::ReportError;

pub const REPORT_NAME: &str = "NEM12 Before vs After Comparison";

/// Metadata block at the top of the issues CSV
#[derive(Debug, Clone)]
pub struct IssuesCsvHeader {
    pub before_file: String,
    pub after_file: String,
    pub generated_at: DateTime<Local>,
}

impl IssuesCsvHeader {
    pub fn new(before_file: impl Into<String>, after_file: impl Into<String>) -> Self {
        Self {
            before_file: before_file.into(),
            after_file: after_file.into(),
            generated_at: Local::now(),
        }
    }
}

fn details(issue: &Discrepancy, header: &IssuesCsvHeader) -> String {
    let interval = issue
        .interval_index
        .map(|i| i.to_string())
        .unwrap_or_default();
    match issue.kind {
        DiscrepancyKind::ValueMismatch => format!(
            "Value mismatch between BEFORE and AFTER files ({}={} vs {}={}).",
            header.before_file, issue.before_value, header.after_file, issue.after_value
        ),
        DiscrepancyKind::MissingInterval => format!(
            "Interval present in BEFORE file but missing in AFTER file for NMI {}, channel {}, date {}, interval {}.",
            issue.nmi, issue.channel, issue.date, interval
        ),
        DiscrepancyKind::ExtraInterval => format!(
            "Extra interval present only in AFTER file (not in BEFORE file) for NMI {}, channel {}, date {}, interval {}.",
            issue.nmi, issue.channel, issue.date, interval
        ),
        _ => issue.note.clone(),
    }
}

/// Write discrepancies in the issues CSV layout.
///
/// Returns the path written.
pub fn write_issues_csv<'d>(
    path: &Path,
    header: &IssuesCsvHeader,
    issues: impl IntoIterator<Item = &'d Discrepancy>,
) -> Result<PathBuf, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;

    writer.write_record(["Report_Name", REPORT_NAME])?;
    let date = header.generated_at.format("%Y-%m-%d").to_string();
    let time = header.generated_at.format("%H:%M:%S").to_string();
    writer.write_record(["Report_Date", date.as_str()])?;
    writer.write_record(["Report_Time", time.as_str()])?;
    writer.write_record(["Before_Report", header.before_file.as_str()])?;
    writer.write_record(["After_Report", header.after_file.as_str()])?;
    // The csv writer has no blank-record form, so the separator line goes
    // straight to the file
    let mut file = writer.into_inner().map_err(|e| e.into_error())?;
    file.write_all(b"\n")?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(file);

    let location_column = format!("after_cell_location ({})", header.after_file);
    writer.write_record([
        "Sr",
        "issue_type",
        "nmi",
        "record_type",
        "channel",
        "date",
        "field_name",
        location_column.as_str(),
        "before_value",
        "after_value",
        "details",
    ])?;

    let mut count = 0;
    for (idx, issue) in issues.into_iter().enumerate() {
        let field_name = match issue.kind {
            DiscrepancyKind::ValueMismatch => "IntervalValue",
            _ => "",
        };
        writer.write_record([
            (idx + 1).to_string(),
            issue.kind.as_str().to_string(),
            issue.nmi.clone(),
            issue.kind.record_type().to_string(),
            issue.channel.clone(),
            issue.date.clone(),
            field_name.to_string(),
            issue.cell_location(),
            issue.before_value.clone(),
            issue.after_value.clone(),
            details(issue, header),
        ])?;
        count += 1;
    }
    writer.flush()?;

    info!("Wrote {} issues to {}", count, path.display());
    Ok(path.to_path_buf())
}
