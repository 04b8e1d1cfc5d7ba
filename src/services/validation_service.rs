use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::compare::{DiffEngine, IntervalDiscrepancy, SeriesStats};
use crate::config::ValidationConfig;
use crate::db::{DbError, MeterReadingRepository, ReportIntervalRepository};
use crate::timeseries::{
    AlignError, ImputationValidator, LocfOptions, LocfValidation, SeriesPoint, TimeSeriesAligner,
};

/// Exit status for a run that could not connect, fetch or write its report
pub const EXIT_FATAL: u8 = 2;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Align(#[from] AlignError),
}

/// One meter/report pair over a time window
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub meter_id: String,
    pub report_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_minutes: u32,
    /// `None` skips the LOCF pass
    pub locf: Option<LocfOptions>,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub request: ValidationRequest,
    pub stats: SeriesStats,
    pub discrepancies: Vec<IntervalDiscrepancy>,
    pub locf: Option<LocfValidation>,
}

/// Flat summary written next to the discrepancy files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub meter_id: String,
    pub report_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_minutes: u32,
    pub total_intervals: usize,
    pub matches: usize,
    pub match_percentage: f64,
    pub missing_nem: usize,
    pub missing_meter: usize,
    pub discrepancies_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locf_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locf_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locf_match_percentage: Option<f64>,
}

impl ValidationReport {
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            meter_id: self.request.meter_id.clone(),
            report_id: self.request.report_id.clone(),
            start: self.request.start,
            end: self.request.end,
            interval_minutes: self.request.interval_minutes,
            total_intervals: self.stats.total_intervals,
            matches: self.stats.matches,
            match_percentage: self.stats.match_percentage,
            missing_nem: self.stats.missing_nem,
            missing_meter: self.stats.missing_meter,
            discrepancies_count: self.discrepancies.len(),
            locf_count: self.locf.as_ref().map(|l| l.count),
            locf_matches: self.locf.as_ref().map(|l| l.matches),
            locf_match_percentage: self.locf.as_ref().map(|l| l.match_percentage),
        }
    }

    pub fn has_discrepancies(&self) -> bool {
        !self.discrepancies.is_empty()
    }

    /// 0 when every interval matched, 1 when any discrepancy was found
    pub fn exit_status(&self) -> u8 {
        u8::from(self.has_discrepancies())
    }
}

#[derive(Clone)]
pub struct ValidationService {
    meter_repo: MeterReadingRepository,
    report_repo: ReportIntervalRepository,
    config: ValidationConfig,
}

impl ValidationService {
    pub fn new(
        meter_repo: MeterReadingRepository,
        report_repo: ReportIntervalRepository,
        config: ValidationConfig,
    ) -> Self {
        Self {
            meter_repo,
            report_repo,
            config,
        }
    }

    /// Fetch both series and validate them
    #[instrument(skip(self, request), fields(meter_id = %request.meter_id, report_id = %request.report_id))]
    pub async fn validate(&self, request: ValidationRequest) -> Result<ValidationReport, ValidationError> {
        let reported = self
            .report_repo
            .find_series(&request.report_id, request.start, request.end)
            .await?;
        let meter = self
            .meter_repo
            .find_series(&request.meter_id, request.start, request.end)
            .await?;

        Ok(Self::evaluate(&self.config, request, &reported, &meter)?)
    }

    /// Align already-fetched series, compare them and run the LOCF pass
    pub fn evaluate(
        config: &ValidationConfig,
        request: ValidationRequest,
        reported: &[SeriesPoint],
        meter: &[SeriesPoint],
    ) -> Result<ValidationReport, AlignError> {
        let aligner = TimeSeriesAligner::new(request.interval_minutes)?;
        let aligned = aligner.align(reported, meter);

        let comparison = DiffEngine::new(config).compare_series(&aligned);
        let locf = request
            .locf
            .as_ref()
            .map(|options| ImputationValidator::new(options.clone()).validate(&aligned));

        info!(
            "Validated {} intervals: {} discrepancies{}",
            comparison.stats.total_intervals,
            comparison.discrepancies.len(),
            locf.as_ref()
                .map(|l| format!(", {} LOCF candidates", l.count))
                .unwrap_or_default()
        );

        Ok(ValidationReport {
            request,
            stats: comparison.stats,
            discrepancies: comparison.discrepancies,
            locf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, m, 0).unwrap()
    }

    fn request(locf: Option<LocfOptions>) -> ValidationRequest {
        ValidationRequest {
            meter_id: "M123".to_string(),
            report_id: "R456".to_string(),
            start: at(0, 0),
            end: at(2, 0),
            interval_minutes: 30,
            locf,
        }
    }

    #[test]
    fn test_evaluate_with_locf() {
        let config = ValidationConfig::default();
        let meter = vec![
            SeriesPoint::new(at(0, 0), Some(100.0)),
            SeriesPoint::new(at(0, 30), Some(101.0)),
            SeriesPoint::new(at(1, 0), Some(103.0)),
        ];
        let reported = vec![
            SeriesPoint::new(at(0, 0), Some(1.0)),
            SeriesPoint::new(at(0, 30), Some(1.0)),
            SeriesPoint::new(at(1, 0), Some(2.0)),
        ];

        let report = ValidationService::evaluate(
            &config,
            request(Some(LocfOptions::from_config(&config))),
            &reported,
            &meter,
        )
        .unwrap();

        // Raw cumulative readings never equal interval usage
        assert_eq!(report.stats.total_intervals, 3);
        assert_eq!(report.stats.matches, 0);

        let locf = report.locf.as_ref().unwrap();
        assert_eq!(locf.count, 1);
        assert_eq!(locf.matches, 1);

        let summary = report.summary();
        assert_eq!(summary.discrepancies_count, 3);
        assert_eq!(summary.locf_count, Some(1));
        assert_eq!(summary.locf_match_percentage, Some(100.0));
    }

    #[test]
    fn test_evaluate_without_locf() {
        let config = ValidationConfig::default();
        let points = vec![SeriesPoint::new(at(0, 0), Some(1.0))];
        let report = ValidationService::evaluate(&config, request(None), &points, &points).unwrap();
        assert!(report.locf.is_none());
        assert!(!report.has_discrepancies());
        assert_eq!(report.exit_status(), 0);
        assert_eq!(report.summary().locf_count, None);
    }

    #[test]
    fn test_exit_status_flags_discrepancies() {
        let config = ValidationConfig::default();
        let reported = vec![
            SeriesPoint::new(at(0, 0), Some(1.0)),
            SeriesPoint::new(at(0, 30), Some(2.0)),
        ];
        let meter = vec![SeriesPoint::new(at(0, 0), Some(1.0))];
        let report = ValidationService::evaluate(&config, request(None), &reported, &meter).unwrap();
        assert!(report.has_discrepancies());
        assert_eq!(report.exit_status(), 1);
        assert_ne!(report.exit_status(), EXIT_FATAL);
    }

    #[test]
    fn test_evaluate_rejects_zero_interval() {
        let config = ValidationConfig::default();
        let mut req = request(None);
        req.interval_minutes = 0;
        let result = ValidationService::evaluate(&config, req, &[], &[]);
        assert!(matches!(result, Err(AlignError::InvalidInterval(0))));
    }
}
