use std::path::{Path, PathBuf};

pub const HEADER: &str = "100,NEM12,202401021200,MDA1,RETAILER1";
pub const TRAILER: &str = "900";

/// A 200 record for a 30-minute E1 channel
pub fn nmi_row(nmi: &str) -> String {
    format!("200,{nmi},E1Q1,001,E1,N1,METSER123,kWh,30,")
}

/// A 300 record with a quality flag followed by the usual trailing fields
pub fn interval_row(date: &str, values: &[String], quality: &str) -> String {
    format!(
        "300,{date},{},{quality},,,20240102000000,",
        values.join(",")
    )
}

/// One day of 30-minute readings: `base`, `base + 0.1`, ...
pub fn day_values(base: f64) -> Vec<String> {
    (0..48)
        .map(|i| format!("{:.3}", base + i as f64 * 0.1))
        .collect()
}

/// Assemble a well-formed file with one 30-minute day per NMI
pub fn simple_file(nmis: &[&str], date: &str) -> Vec<String> {
    let mut lines = vec![HEADER.to_string()];
    for nmi in nmis {
        lines.push(nmi_row(nmi));
        lines.push(interval_row(date, &day_values(1.0), "A"));
    }
    lines.push(TRAILER.to_string());
    lines
}

pub fn write_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").expect("Failed to write NEM12 fixture");
    path
}
