// Comparison module
//
// - diff_engine: structural and value differences between two NEM12 files
// - series: interval-by-interval comparison of an aligned report/meter series
// - discrepancy: the ordered issue records both produce
// - value: lazy numeric-or-text interpretation of raw interval values

pub mod diff_engine;
pub mod discrepancy;
pub mod series;
pub mod value;

pub use diff_engine::{ComparisonSummary, DiffEngine, FileComparison};
pub use discrepancy::{Discrepancy, DiscrepancyKind, FileSide};
pub use series::{IntervalDiscrepancy, SeriesComparison, SeriesReason, SeriesStats};
pub use value::{values_match, ReadingValue};
