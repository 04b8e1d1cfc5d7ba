// Time-series module
//
// Compares a NEM12 report series with an independently sourced meter series.
// - aligner: floors timestamps and reindexes both sides onto one timeline
// - imputation: validates LOCF-substituted intervals against meter usage

pub mod aligner;
pub mod imputation;

pub use aligner::{AlignError, AlignedRow, AlignedSeries, SeriesPoint, TimeSeriesAligner};
pub use imputation::{ImputationValidator, LocfDetail, LocfOptions, LocfValidation};
