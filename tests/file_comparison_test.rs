/// Integration tests for parsing and comparing NEM12 files on disk
mod common;

use common::{day_values, interval_row, nmi_row, simple_file, write_file, HEADER, TRAILER};
use nem12_validator::compare::{DiffEngine, DiscrepancyKind};
use nem12_validator::config::ValidationConfig;
use nem12_validator::nem12::{IntervalKey, Nem12Error, Nem12Reader};
use nem12_validator::report::{write_issues_csv, IssuesCsvHeader};

fn key(nmi: &str, date: &str, interval_index: usize) -> IntervalKey {
    IntervalKey {
        nmi: nmi.to_string(),
        channel: Some("E1".to_string()),
        date: date.to_string(),
        interval_index,
    }
}

#[test]
fn test_identical_copy_has_no_discrepancies() {
    let dir = tempfile::tempdir().unwrap();
    let lines = simple_file(&["NMI1", "NMI2"], "20240101");
    let before = write_file(dir.path(), "before.csv", &lines);
    let after = write_file(dir.path(), "after.csv", &lines);

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let comparison = DiffEngine::new(&config).compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );

    assert!(comparison.discrepancies.is_empty());
    assert_eq!(comparison.summary.intervals_compared, 96);
    assert_eq!(comparison.summary.matches, 96);
    assert_eq!(comparison.summary.match_percentage, 100.0);
    assert!(comparison.summary.is_identical());
}

#[test]
fn test_pipe_delimited_copy_matches_comma_file() {
    let dir = tempfile::tempdir().unwrap();
    let lines = simple_file(&["NMI1"], "20240101");
    let piped: Vec<String> = lines.iter().map(|l| l.replace(',', "|")).collect();
    let before = write_file(dir.path(), "before.csv", &lines);
    let after = write_file(dir.path(), "after.txt", &piped);

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let after_parsed = reader.read_path(&after).unwrap();
    assert_eq!(after_parsed.delimiter, b'|');

    let comparison = DiffEngine::new(&config).compare(&reader.read_path(&before).unwrap(), &after_parsed);
    assert!(comparison.discrepancies.is_empty());
}

#[test]
fn test_values_within_tolerance_match() {
    let dir = tempfile::tempdir().unwrap();
    let before_values = day_values(1.0);
    let mut after_values = before_values.clone();
    after_values[0] = "1.0005".to_string();
    after_values[1] = "1.2".to_string();

    let before = write_file(
        dir.path(),
        "before.csv",
        &[
            HEADER.to_string(),
            nmi_row("NMI1"),
            interval_row("20240101", &before_values, "A"),
            TRAILER.to_string(),
        ],
    );
    let after = write_file(
        dir.path(),
        "after.csv",
        &[
            HEADER.to_string(),
            nmi_row("NMI1"),
            interval_row("20240101", &after_values, "A"),
            TRAILER.to_string(),
        ],
    );

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let comparison = DiffEngine::new(&config).compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );

    // 1.000 vs 1.0005 is inside 1e-3; 1.100 vs 1.2 is not
    assert_eq!(comparison.discrepancies.len(), 1);
    let mismatch = &comparison.discrepancies[0];
    assert_eq!(mismatch.kind, DiscrepancyKind::ValueMismatch);
    assert_eq!(mismatch.interval_index, Some(1));
    assert_eq!(mismatch.before_value, "1.100");
    assert_eq!(mismatch.after_value, "1.2");
    assert_eq!(comparison.summary.matches, 47);
}

#[test]
fn test_duplicate_rows_keep_non_zero_value() {
    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let zeros = vec!["0".to_string(); 48];
    let fives = vec!["5".to_string(); 48];

    let zero_first = [
        HEADER.to_string(),
        nmi_row("NMI1"),
        interval_row("20240101", &zeros, "A"),
        interval_row("20240101", &fives, "A"),
        TRAILER.to_string(),
    ]
    .join("\n");
    let parsed = reader.read_bytes("zero_first.csv", zero_first.as_bytes()).unwrap();
    assert_eq!(parsed.store.len(), 48);
    assert_eq!(parsed.store.get(&key("NMI1", "20240101", 0)).unwrap().value, "5");

    let five_first = [
        HEADER.to_string(),
        nmi_row("NMI1"),
        interval_row("20240101", &fives, "A"),
        interval_row("20240101", &zeros, "A"),
        TRAILER.to_string(),
    ]
    .join("\n");
    let parsed = reader.read_bytes("five_first.csv", five_first.as_bytes()).unwrap();
    assert_eq!(parsed.store.get(&key("NMI1", "20240101", 47)).unwrap().value, "5");
}

#[test]
fn test_quality_flag_bounds_interval_values() {
    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let values: Vec<String> = (1..=4).map(|v| v.to_string()).collect();
    let content = [
        HEADER.to_string(),
        nmi_row("NMI1"),
        interval_row("20240101", &values, "E"),
        TRAILER.to_string(),
    ]
    .join("\n");

    let parsed = reader.read_bytes("short.csv", content.as_bytes()).unwrap();
    assert_eq!(parsed.store.len(), 4);
    let last = parsed.store.get(&key("NMI1", "20240101", 3)).unwrap();
    assert_eq!(last.value, "4");
    assert_eq!(last.quality, "E");
    assert!(parsed.store.get(&key("NMI1", "20240101", 4)).is_none());
}

#[test]
fn test_missing_quality_flag_truncates_short_row() {
    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    // Ten values and three trailing fields, no quality character anywhere
    let values: Vec<String> = (1..=10).map(|v| format!("{v}.5")).collect();
    let row = format!("300,20240101,{},,,", values.join(","));
    let content = [HEADER.to_string(), nmi_row("NMI1"), row, TRAILER.to_string()].join("\n");

    let parsed = reader.read_bytes("fallback.csv", content.as_bytes()).unwrap();
    assert_eq!(parsed.store.len(), 10);
    assert_eq!(parsed.store.get(&key("NMI1", "20240101", 9)).unwrap().value, "10.5");
    assert_eq!(parsed.store.get(&key("NMI1", "20240101", 0)).unwrap().quality, "");
}

#[test]
fn test_identifier_sets_report_missing_and_extra() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_file(dir.path(), "before.csv", &simple_file(&["NMI1", "NMI2"], "20240101"));
    let after = write_file(dir.path(), "after.csv", &simple_file(&["NMI2", "NMI3"], "20240101"));

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let comparison = DiffEngine::new(&config).compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );

    let kinds: Vec<(DiscrepancyKind, &str)> = comparison
        .discrepancies
        .iter()
        .map(|d| (d.kind, d.nmi.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DiscrepancyKind::MissingIdentifier, "NMI1"),
            (DiscrepancyKind::ExtraIdentifier, "NMI3"),
        ]
    );
    assert_eq!(comparison.summary.intervals_compared, 48);
    assert_eq!(comparison.summary.missing_nmis, 1);
    assert_eq!(comparison.summary.extra_nmis, 1);
}

#[test]
fn test_dates_and_intervals_reported_in_category_order() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_file(
        dir.path(),
        "before.csv",
        &[
            HEADER.to_string(),
            nmi_row("NMI1"),
            interval_row("20240101", &day_values(1.0), "A"),
            interval_row("20240102", &day_values(1.0), "A"),
            TRAILER.to_string(),
        ],
    );
    let after = write_file(
        dir.path(),
        "after.csv",
        &[
            HEADER.to_string(),
            nmi_row("NMI1"),
            interval_row("20240101", &day_values(1.0), "A"),
            interval_row("20240103", &day_values(1.0), "A"),
        ],
    );

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let comparison = DiffEngine::new(&config).compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );

    let d = &comparison.discrepancies;
    assert_eq!(d[0].kind, DiscrepancyKind::StructuralIssue);
    assert_eq!(d[0].note, "AFTER missing 900 record");
    assert_eq!(d[1].kind, DiscrepancyKind::MissingDate);
    assert_eq!(d[1].date, "20240102");
    assert_eq!(d[2].kind, DiscrepancyKind::ExtraDate);
    assert_eq!(d[2].date, "20240103");
    assert!(d[3..51].iter().all(|x| x.kind == DiscrepancyKind::MissingInterval));
    assert!(d[51..99].iter().all(|x| x.kind == DiscrepancyKind::ExtraInterval));
    assert_eq!(d.len(), 99);
    assert_eq!(comparison.summary.missing_count, 48);
    assert_eq!(comparison.summary.extra_count, 48);
}

#[test]
fn test_comparison_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_file(dir.path(), "before.csv", &simple_file(&["NMI1", "NMI2"], "20240101"));
    let after = write_file(dir.path(), "after.csv", &simple_file(&["NMI2"], "20240102"));

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let engine = DiffEngine::new(&config);
    let first = engine.compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );
    let second = engine.compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );
    assert_eq!(first, second);
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ValidationConfig::default();
    let result = Nem12Reader::new(&config).read_path(&dir.path().join("absent.csv"));
    assert!(matches!(result, Err(Nem12Error::InputNotFound(_))));
}

#[test]
fn test_issues_csv_from_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_file(dir.path(), "before.csv", &simple_file(&["NMI1", "NMI2"], "20240101"));
    let after = write_file(dir.path(), "after.csv", &simple_file(&["NMI2", "NMI3"], "20240101"));

    let config = ValidationConfig::default();
    let reader = Nem12Reader::new(&config);
    let comparison = DiffEngine::new(&config).compare(
        &reader.read_path(&before).unwrap(),
        &reader.read_path(&after).unwrap(),
    );

    let out = dir.path().join("results").join("issues.csv");
    let header = IssuesCsvHeader::new("before.csv", "after.csv");
    write_issues_csv(&out, &header, &comparison.discrepancies).unwrap();

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&out)
        .unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    // 5 metadata rows, column header, 2 issues (the blank line is skipped)
    assert_eq!(rows.len(), 8);
    assert_eq!(&rows[5][1], "issue_type");
    assert_eq!(&rows[6][1], "MISSING_NMI");
    assert_eq!(&rows[6][2], "NMI1");
    assert_eq!(&rows[6][3], "200");
    assert_eq!(&rows[7][1], "EXTRA_NMI");
}
