use serde::Serialize;
use std::fmt;

use crate::nem12::{CellLocation, IntervalKey, IntervalValue};

/// Discrepancy categories, declared in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    StructuralIssue,
    MissingIdentifier,
    ExtraIdentifier,
    MissingDate,
    ExtraDate,
    MissingInterval,
    ExtraInterval,
    ValueMismatch,
}

impl DiscrepancyKind {
    /// Label used in the issues CSV
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyKind::StructuralIssue => "STRUCTURE",
            DiscrepancyKind::MissingIdentifier => "MISSING_NMI",
            DiscrepancyKind::ExtraIdentifier => "EXTRA_NMI",
            DiscrepancyKind::MissingDate => "MISSING_DATE",
            DiscrepancyKind::ExtraDate => "EXTRA_DATE",
            DiscrepancyKind::MissingInterval => "MISSING",
            DiscrepancyKind::ExtraInterval => "EXTRA",
            DiscrepancyKind::ValueMismatch => "VALUE_MISMATCH",
        }
    }

    /// NEM12 record type the issue refers to, if any
    pub fn record_type(&self) -> &'static str {
        match self {
            DiscrepancyKind::StructuralIssue => "",
            DiscrepancyKind::MissingIdentifier | DiscrepancyKind::ExtraIdentifier => "200",
            _ => "300",
        }
    }
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which input a structural issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSide {
    Before,
    After,
}

impl fmt::Display for FileSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSide::Before => f.write_str("BEFORE"),
            FileSide::After => f.write_str("AFTER"),
        }
    }
}

/// One difference between two parsed files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub nmi: String,
    pub channel: String,
    pub date: String,
    pub interval_index: Option<usize>,
    pub before_value: String,
    pub after_value: String,
    pub before_location: Option<CellLocation>,
    pub after_location: Option<CellLocation>,
    pub note: String,
}

impl Discrepancy {
    fn bare(kind: DiscrepancyKind) -> Self {
        Self {
            kind,
            nmi: String::new(),
            channel: String::new(),
            date: String::new(),
            interval_index: None,
            before_value: String::new(),
            after_value: String::new(),
            before_location: None,
            after_location: None,
            note: String::new(),
        }
    }

    fn for_key(kind: DiscrepancyKind, key: &IntervalKey) -> Self {
        Self {
            nmi: key.nmi.clone(),
            channel: key.channel_str().to_string(),
            date: key.date.clone(),
            interval_index: Some(key.interval_index),
            ..Self::bare(kind)
        }
    }

    pub fn structural(side: FileSide, problem: &str) -> Self {
        Self {
            note: format!("{side} {problem}"),
            ..Self::bare(DiscrepancyKind::StructuralIssue)
        }
    }

    pub fn missing_identifier(nmi: &str) -> Self {
        Self {
            nmi: nmi.to_string(),
            note: "NMI present in BEFORE file but missing in AFTER file".to_string(),
            ..Self::bare(DiscrepancyKind::MissingIdentifier)
        }
    }

    pub fn extra_identifier(nmi: &str) -> Self {
        Self {
            nmi: nmi.to_string(),
            note: "NMI present only in AFTER file".to_string(),
            ..Self::bare(DiscrepancyKind::ExtraIdentifier)
        }
    }

    pub fn missing_date(nmi: &str, date: &str) -> Self {
        Self {
            nmi: nmi.to_string(),
            date: date.to_string(),
            note: "Date present in BEFORE file but missing in AFTER file".to_string(),
            ..Self::bare(DiscrepancyKind::MissingDate)
        }
    }

    pub fn extra_date(nmi: &str, date: &str) -> Self {
        Self {
            nmi: nmi.to_string(),
            date: date.to_string(),
            note: "Date present only in AFTER file".to_string(),
            ..Self::bare(DiscrepancyKind::ExtraDate)
        }
    }

    pub fn missing_interval(before: &IntervalValue) -> Self {
        Self {
            before_value: before.value.clone(),
            before_location: Some(before.location),
            note: "Interval present in BEFORE file but missing in AFTER file".to_string(),
            ..Self::for_key(DiscrepancyKind::MissingInterval, &before.key)
        }
    }

    pub fn extra_interval(after: &IntervalValue) -> Self {
        Self {
            after_value: after.value.clone(),
            after_location: Some(after.location),
            note: "Extra interval present only in AFTER file".to_string(),
            ..Self::for_key(DiscrepancyKind::ExtraInterval, &after.key)
        }
    }

    pub fn value_mismatch(before: &IntervalValue, after: &IntervalValue) -> Self {
        Self {
            before_value: before.value.clone(),
            after_value: after.value.clone(),
            before_location: Some(before.location),
            after_location: Some(after.location),
            note: "Value mismatch between BEFORE and AFTER files".to_string(),
            ..Self::for_key(DiscrepancyKind::ValueMismatch, &before.key)
        }
    }

    /// Human-readable location, preferring the AFTER file
    pub fn cell_location(&self) -> String {
        let mut parts = Vec::new();
        if let Some(loc) = self.after_location.or(self.before_location) {
            parts.push(format!("row {}", loc.row));
        }
        if let Some(idx) = self.interval_index {
            parts.push(format!("interval {idx}"));
        }
        parts.join(", ")
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiscrepancyKind::StructuralIssue => write!(f, "Structure: {}", self.note),
            DiscrepancyKind::MissingIdentifier => {
                write!(f, "Missing NMI: {} (in BEFORE, not in AFTER)", self.nmi)
            }
            DiscrepancyKind::ExtraIdentifier => {
                write!(f, "Extra NMI: {} (in AFTER, not in BEFORE)", self.nmi)
            }
            DiscrepancyKind::MissingDate => write!(
                f,
                "Missing date: NMI {}, Date {} (in BEFORE, not in AFTER)",
                self.nmi, self.date
            ),
            DiscrepancyKind::ExtraDate => write!(
                f,
                "Extra date: NMI {}, Date {} (in AFTER, not in BEFORE)",
                self.nmi, self.date
            ),
            DiscrepancyKind::MissingInterval => write!(
                f,
                "Missing interval: NMI {}, Channel {}, Date {}, Index {} (BEFORE value: {})",
                self.nmi,
                self.channel,
                self.date,
                self.interval_index.unwrap_or_default(),
                self.before_value
            ),
            DiscrepancyKind::ExtraInterval => write!(
                f,
                "Extra interval: NMI {}, Channel {}, Date {}, Index {} (AFTER value: {})",
                self.nmi,
                self.channel,
                self.date,
                self.interval_index.unwrap_or_default(),
                self.after_value
            ),
            DiscrepancyKind::ValueMismatch => write!(
                f,
                "Value mismatch: NMI {}, Channel {}, Date {}, Index {} | BEFORE: '{}' | AFTER: '{}'",
                self.nmi,
                self.channel,
                self.date,
                self.interval_index.unwrap_or_default(),
                self.before_value,
                self.after_value
            ),
        }
    }
}
