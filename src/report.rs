// Report writers
//
// - issues_csv: file-vs-file discrepancies with a metadata header
// - series_report: discrepancy, LOCF detail and summary files for a
//   meter/report validation run

pub mod error;
pub mod issues_csv;
pub mod series_report;

pub use error::ReportError;
pub use issues_csv::{write_issues_csv, IssuesCsvHeader};
pub use series_report::{write_series_report, ReportPaths};
