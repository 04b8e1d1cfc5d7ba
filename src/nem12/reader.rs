/// NEM12 flat-file reader
///
/// Turns a delimited NEM12 export into a [`ParsedFile`]. Only the record types
/// that affect interval data are interpreted:
/// - 100: header (presence only)
/// - 200: NMI data details; sets the active NMI, channel and interval length
/// - 300: one day of interval values for the active NMI/channel
/// - 400/500: ignored
/// - 900: trailer (presence only)
use csv::{ByteRecord, ReaderBuilder};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::config::ValidationConfig;
use crate::nem12::error::Nem12Error;
use crate::nem12::store::{CellLocation, IntervalKey, IntervalStore, IntervalValue};

pub const RECORD_HEADER: &str = "100";
pub const RECORD_NMI_DETAILS: &str = "200";
pub const RECORD_INTERVAL_DATA: &str = "300";
pub const RECORD_TRAILER: &str = "900";

// Fixed column positions in a 200 record
const NMI_COLUMN: usize = 1;
const NMI_CONFIGURATION_COLUMN: usize = 2;
const NMI_SUFFIX_COLUMN: usize = 4;
const INTERVAL_LENGTH_COLUMN: usize = 8;

// Fixed column positions in a 300 record
const DATE_COLUMN: usize = 1;
const FIRST_VALUE_COLUMN: usize = 2;
// Trailing fields after the quality flag (reason code, description, timestamps)
const TRAILING_FIELDS: usize = 3;
// The backward scan starts this many fields before the end of the row
const QUALITY_SCAN_OFFSET: usize = 4;

/// Everything learned from one NEM12 file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub file_name: String,
    pub delimiter: u8,
    pub has_header: bool,
    pub has_nmi_block: bool,
    pub has_trailer: bool,
    /// Record type of the first non-blank row, `None` for an empty file
    pub first_record_type: Option<String>,
    pub store: IntervalStore,
}

impl ParsedFile {
    fn empty(file_name: String, delimiter: u8) -> Self {
        Self {
            file_name,
            delimiter,
            has_header: false,
            has_nmi_block: false,
            has_trailer: false,
            first_record_type: None,
            store: IntervalStore::new(),
        }
    }
}

/// Pick the delimiter that occurs most often in `first_line`.
///
/// Ties go to the earliest candidate, so an ambiguous line resolves to the
/// first entry (comma by default).
pub fn detect_delimiter_in(first_line: &[u8], candidates: &[u8]) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &candidate in candidates {
        let count = first_line.iter().filter(|&&b| b == candidate).count();
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((candidate, count)),
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

/// Locate the quality flag in a 300 record.
///
/// Scans backward from `len - 4` down to position 2 (inclusive) and returns
/// the first position holding a single character from the quality alphabet.
/// An interval value that happens to equal a quality character is
/// indistinguishable from the flag; position is the only disambiguation.
pub fn find_quality_flag_index(row: &[String], config: &ValidationConfig) -> Option<usize> {
    let start = row.len().checked_sub(QUALITY_SCAN_OFFSET)?;
    (FIRST_VALUE_COLUMN..=start)
        .rev()
        .find(|&i| config.is_quality_flag(&row[i]))
}

/// Slice the interval values (and quality flag) out of a 300 record.
///
/// With a quality flag at `q` the values are positions `2..q`. Without one,
/// take `intervals_per_day` values from position 2, clipped to leave three
/// trailing fields. A short row is silently truncated on that path.
pub fn extract_interval_values(
    row: &[String],
    quality_index: Option<usize>,
    intervals_per_day: usize,
) -> (&[String], &str) {
    match quality_index {
        Some(q) => (&row[FIRST_VALUE_COLUMN..q], row[q].as_str()),
        None => {
            let end = (FIRST_VALUE_COLUMN + intervals_per_day)
                .min(row.len().saturating_sub(TRAILING_FIELDS));
            if end <= FIRST_VALUE_COLUMN {
                (&[], "")
            } else {
                (&row[FIRST_VALUE_COLUMN..end], "")
            }
        }
    }
}

/// Active 200-record context while walking the file
#[derive(Debug, Clone)]
struct NmiContext {
    nmi: String,
    channel: Option<String>,
    interval_minutes: u32,
}

#[derive(Debug, Default)]
struct ParseCounters {
    rows: usize,
    interval_rows: usize,
    skipped_interval_rows: usize,
    fallback_rows: usize,
    duplicate_keys: usize,
}

pub struct Nem12Reader<'a> {
    config: &'a ValidationConfig,
}

impl<'a> Nem12Reader<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Parse a NEM12 file from disk
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn read_path(&self, path: &Path) -> Result<ParsedFile, Nem12Error> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Nem12Error::InputNotFound(path.display().to_string()),
            _ => Nem12Error::Io {
                path: path.display().to_string(),
                source: e,
            },
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.read_bytes(&file_name, &bytes)
    }

    /// Parse NEM12 content already held in memory
    pub fn read_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedFile, Nem12Error> {
        let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
        let delimiter = detect_delimiter_in(first_line, &self.config.delimiters)
            .unwrap_or_else(|| self.config.fallback_delimiter());
        debug!("Using delimiter {:?} for {}", delimiter as char, file_name);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let mut parsed = ParsedFile::empty(file_name.to_string(), delimiter);
        let mut context: Option<NmiContext> = None;
        let mut counters = ParseCounters::default();
        let mut record = ByteRecord::new();

        loop {
            let has_more = reader
                .read_byte_record(&mut record)
                .map_err(|source| Nem12Error::Csv {
                    path: file_name.to_string(),
                    source,
                })?;
            if !has_more {
                break;
            }

            counters.rows += 1;
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(counters.rows);
            let row = decode_fields(&record);

            if row.iter().all(|f| f.is_empty()) {
                continue;
            }

            let record_type = row[0].as_str();
            if parsed.first_record_type.is_none() {
                parsed.first_record_type = Some(record_type.to_string());
            }

            match record_type {
                RECORD_HEADER => parsed.has_header = true,
                RECORD_NMI_DETAILS => {
                    parsed.has_nmi_block = true;
                    context = self.read_nmi_details(&row, &mut parsed.store);
                }
                RECORD_INTERVAL_DATA => {
                    counters.interval_rows += 1;
                    match &context {
                        Some(ctx) if row.len() >= 3 => {
                            self.read_interval_data(ctx, &row, row_number, &mut parsed.store, &mut counters)
                        }
                        _ => {
                            debug!("Skipping 300 record at row {} (no active NMI or too short)", row_number);
                            counters.skipped_interval_rows += 1;
                        }
                    }
                }
                RECORD_TRAILER => parsed.has_trailer = true,
                _ => {}
            }
        }

        info!(
            "Parsed {}: {} NMIs, {} intervals from {} rows ({} skipped 300 rows, {} without quality flag, {} duplicate keys)",
            file_name,
            parsed.store.identifiers().len(),
            parsed.store.len(),
            counters.rows,
            counters.skipped_interval_rows,
            counters.fallback_rows,
            counters.duplicate_keys
        );

        Ok(parsed)
    }

    fn read_nmi_details(&self, row: &[String], store: &mut IntervalStore) -> Option<NmiContext> {
        let nmi = field(row, NMI_COLUMN);
        if nmi.is_empty() {
            debug!("200 record without NMI, clearing active context");
            return None;
        }
        store.record_identifier(nmi);

        let channel = if self.config.key_by_channel {
            Some(self.channel_for(row))
        } else {
            None
        };

        let interval_minutes = match field(row, INTERVAL_LENGTH_COLUMN).parse::<u32>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => {
                debug!(
                    "NMI {}: interval length '{}' unusable, defaulting to {}",
                    nmi,
                    field(row, INTERVAL_LENGTH_COLUMN),
                    self.config.default_interval_minutes
                );
                self.config.default_interval_minutes
            }
        };

        Some(NmiContext {
            nmi: nmi.to_string(),
            channel,
            interval_minutes,
        })
    }

    fn channel_for(&self, row: &[String]) -> String {
        [NMI_SUFFIX_COLUMN, NMI_CONFIGURATION_COLUMN]
            .iter()
            .map(|&col| field(row, col))
            .find(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.unknown_channel.clone())
    }

    fn read_interval_data(
        &self,
        ctx: &NmiContext,
        row: &[String],
        row_number: usize,
        store: &mut IntervalStore,
        counters: &mut ParseCounters,
    ) {
        let date = field(row, DATE_COLUMN);
        let quality_index = find_quality_flag_index(row, self.config);
        if quality_index.is_none() {
            counters.fallback_rows += 1;
            debug!(
                "No quality flag in 300 record at row {}, using {}-minute interval count",
                row_number, ctx.interval_minutes
            );
        }

        let expected = self.config.intervals_per_day(ctx.interval_minutes);
        let (values, quality) = extract_interval_values(row, quality_index, expected);

        for (idx, value) in values.iter().enumerate() {
            let incoming = IntervalValue {
                key: IntervalKey {
                    nmi: ctx.nmi.clone(),
                    channel: ctx.channel.clone(),
                    date: date.to_string(),
                    interval_index: idx,
                },
                value: value.clone(),
                quality: quality.to_string(),
                location: CellLocation {
                    row: row_number,
                    column: FIRST_VALUE_COLUMN + idx + 1,
                },
            };
            if store.insert(incoming) {
                counters.duplicate_keys += 1;
            }
        }
    }
}

fn decode_fields(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|f| String::from_utf8_lossy(f).trim().to_string())
        .collect()
}

fn field(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}
