use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, instrument};

use crate::compare::discrepancy::{Discrepancy, DiscrepancyKind, FileSide};
use crate::compare::value::values_match;
use crate::config::ValidationConfig;
use crate::nem12::reader::RECORD_HEADER;
use crate::nem12::ParsedFile;

/// Counters for one file-vs-file comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub before_nmis: usize,
    pub after_nmis: usize,
    pub before_intervals: usize,
    pub after_intervals: usize,
    /// Keys present in both files
    pub intervals_compared: usize,
    pub matches: usize,
    pub match_percentage: f64,
    pub value_mismatches: usize,
    pub missing_count: usize,
    pub extra_count: usize,
    pub missing_nmis: usize,
    pub extra_nmis: usize,
    pub missing_dates: usize,
    pub extra_dates: usize,
    pub structural_issues: usize,
    pub total_issues: usize,
}

impl ComparisonSummary {
    pub fn is_identical(&self) -> bool {
        self.total_issues == 0
    }
}

/// Console summary block
impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  NMIs (before/after):      {} / {}", self.before_nmis, self.after_nmis)?;
        writeln!(
            f,
            "  Intervals (before/after): {} / {}",
            self.before_intervals, self.after_intervals
        )?;
        writeln!(
            f,
            "  Matches:                  {} / {} ({:.2}%)",
            self.matches, self.intervals_compared, self.match_percentage
        )?;
        writeln!(f, "  Value mismatches:         {}", self.value_mismatches)?;
        writeln!(f, "  Missing / extra:          {} / {}", self.missing_count, self.extra_count)?;
        writeln!(f, "  Structural issues:        {}", self.structural_issues)?;
        write!(f, "  Total issues:             {}", self.total_issues)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileComparison {
    pub before_file: String,
    pub after_file: String,
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ComparisonSummary,
}

pub struct DiffEngine<'a> {
    config: &'a ValidationConfig,
}

impl<'a> DiffEngine<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        self.config
    }

    /// Compare a BEFORE file against an AFTER file.
    ///
    /// Output order: structural issues, missing then extra NMIs, missing then
    /// extra dates, missing then extra intervals, value mismatches. Each
    /// category is sorted by (nmi, channel, date, interval).
    #[instrument(skip_all, fields(before = %before.file_name, after = %after.file_name))]
    pub fn compare(&self, before: &ParsedFile, after: &ParsedFile) -> FileComparison {
        let mut discrepancies = structural_issues(before, after);

        let before_nmis = before.store.identifiers();
        let after_nmis = after.store.identifiers();
        let common: BTreeSet<&String> = before_nmis.intersection(after_nmis).collect();

        discrepancies.extend(
            before_nmis
                .difference(after_nmis)
                .map(|nmi| Discrepancy::missing_identifier(nmi)),
        );
        discrepancies.extend(
            after_nmis
                .difference(before_nmis)
                .map(|nmi| Discrepancy::extra_identifier(nmi)),
        );

        let mut missing_dates = Vec::new();
        let mut extra_dates = Vec::new();
        for nmi in &common {
            let before_dates = before.store.dates_for(nmi);
            let after_dates = after.store.dates_for(nmi);
            missing_dates.extend(
                before_dates
                    .difference(&after_dates)
                    .map(|date| Discrepancy::missing_date(nmi, date)),
            );
            extra_dates.extend(
                after_dates
                    .difference(&before_dates)
                    .map(|date| Discrepancy::extra_date(nmi, date)),
            );
        }
        discrepancies.append(&mut missing_dates);
        discrepancies.append(&mut extra_dates);

        // Store iteration is already in (nmi, channel, date, interval) order
        let mut missing_intervals = Vec::new();
        let mut value_mismatches = Vec::new();
        let mut intervals_compared = 0;
        for before_value in before.store.values() {
            if !common.contains(&before_value.key.nmi) {
                continue;
            }
            match after.store.get(&before_value.key) {
                Some(after_value) => {
                    intervals_compared += 1;
                    if !values_match(&before_value.value, &after_value.value, self.config.file_tolerance) {
                        value_mismatches.push(Discrepancy::value_mismatch(before_value, after_value));
                    }
                }
                None => missing_intervals.push(Discrepancy::missing_interval(before_value)),
            }
        }
        let mut extra_intervals: Vec<Discrepancy> = after
            .store
            .values()
            .filter(|v| common.contains(&v.key.nmi) && !before.store.contains_key(&v.key))
            .map(Discrepancy::extra_interval)
            .collect();

        discrepancies.append(&mut missing_intervals);
        discrepancies.append(&mut extra_intervals);
        discrepancies.append(&mut value_mismatches);

        let summary = summarize(before, after, &discrepancies, intervals_compared);
        info!(
            "Compared {} intervals: {} mismatches, {} missing, {} extra, {} issues total",
            summary.intervals_compared,
            summary.value_mismatches,
            summary.missing_count,
            summary.extra_count,
            summary.total_issues
        );

        FileComparison {
            before_file: before.file_name.clone(),
            after_file: after.file_name.clone(),
            discrepancies,
            summary,
        }
    }
}

fn structural_issues(before: &ParsedFile, after: &ParsedFile) -> Vec<Discrepancy> {
    let sides = [(FileSide::Before, before), (FileSide::After, after)];
    let mut issues = Vec::new();

    for (side, file) in sides {
        if file.first_record_type.as_deref() != Some(RECORD_HEADER) {
            let first = file.first_record_type.as_deref().unwrap_or("<none>");
            issues.push(Discrepancy::structural(side, &format!("first record is {first}")));
        }
    }
    for (side, file) in sides {
        if !file.has_nmi_block {
            issues.push(Discrepancy::structural(side, "missing any 200 record"));
        }
    }
    for (side, file) in sides {
        if !file.has_trailer {
            issues.push(Discrepancy::structural(side, "missing 900 record"));
        }
    }

    if !issues.is_empty() {
        debug!("{} structural issues", issues.len());
    }
    issues
}

fn summarize(
    before: &ParsedFile,
    after: &ParsedFile,
    discrepancies: &[Discrepancy],
    intervals_compared: usize,
) -> ComparisonSummary {
    let count = |kind: DiscrepancyKind| discrepancies.iter().filter(|d| d.kind == kind).count();
    let value_mismatches = count(DiscrepancyKind::ValueMismatch);
    let matches = intervals_compared - value_mismatches;

    ComparisonSummary {
        before_nmis: before.store.identifiers().len(),
        after_nmis: after.store.identifiers().len(),
        before_intervals: before.store.len(),
        after_intervals: after.store.len(),
        intervals_compared,
        matches,
        match_percentage: if intervals_compared > 0 {
            matches as f64 / intervals_compared as f64 * 100.0
        } else {
            0.0
        },
        value_mismatches,
        missing_count: count(DiscrepancyKind::MissingInterval),
        extra_count: count(DiscrepancyKind::ExtraInterval),
        missing_nmis: count(DiscrepancyKind::MissingIdentifier),
        extra_nmis: count(DiscrepancyKind::ExtraIdentifier),
        missing_dates: count(DiscrepancyKind::MissingDate),
        extra_dates: count(DiscrepancyKind::ExtraDate),
        structural_issues: count(DiscrepancyKind::StructuralIssue),
        total_issues: discrepancies.len(),
    }
}
