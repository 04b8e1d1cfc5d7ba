use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env;

/// Runtime settings for the database-backed tools.
#[derive(Debug, Clone)]
pub struct Config {
    pub meter_database_url: String,
    pub report_database_url: String,
    pub output_dir: String,
    pub interval_minutes: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            meter_database_url: env::var("METER_DATABASE_URL")?,
            report_database_url: env::var("REPORT_DATABASE_URL")?,
            output_dir: env::var("OUTPUT_DIR").unwrap_or_else(|_| "reports".to_string()),
            interval_minutes: env::var("INTERVAL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_FILE_TOLERANCE: f64 = 1e-3;
pub const DEFAULT_SERIES_TOLERANCE: f64 = 1e-6;
pub const UNKNOWN_CHANNEL: &str = "UNKNOWN_CHANNEL";

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Constants that drive parsing and comparison.
///
/// Every core component takes this by reference so tests can swap in
/// alternate alphabets, tolerances or tables without touching globals.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Single-character quality codes recognised in record 300 rows
    pub quality_flags: BTreeSet<char>,
    /// Delimiter candidates; the first entry wins ties and read failures
    pub delimiters: Vec<u8>,
    pub default_interval_minutes: u32,
    /// Interval length (minutes) -> intervals per day
    pub intervals_per_day: BTreeMap<u32, usize>,
    pub file_tolerance: f64,
    pub series_tolerance: f64,
    pub unknown_channel: String,
    /// Include the channel in interval keys
    pub key_by_channel: bool,
    /// Meter quality token -> NEM12 quality token
    pub quality_map: HashMap<String, String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            quality_flags: ['A', 'V', 'E', 'F', 'N', 'S', 'R', 'C', 'D']
                .into_iter()
                .collect(),
            delimiters: vec![b',', b'|', b';', b'\t'],
            default_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            intervals_per_day: [(15, 96), (30, 48), (60, 24)].into_iter().collect(),
            file_tolerance: DEFAULT_FILE_TOLERANCE,
            series_tolerance: DEFAULT_SERIES_TOLERANCE,
            unknown_channel: UNKNOWN_CHANNEL.to_string(),
            key_by_channel: true,
            quality_map: ["0", "1", "2"]
                .into_iter()
                .map(|q| (q.to_string(), q.to_string()))
                .collect(),
        }
    }
}

impl ValidationConfig {
    pub fn with_file_tolerance(mut self, tolerance: f64) -> Self {
        self.file_tolerance = tolerance;
        self
    }

    pub fn with_series_tolerance(mut self, tolerance: f64) -> Self {
        self.series_tolerance = tolerance;
        self
    }

    pub fn with_key_by_channel(mut self, key_by_channel: bool) -> Self {
        self.key_by_channel = key_by_channel;
        self
    }

    pub fn with_quality_flags(mut self, flags: impl IntoIterator<Item = char>) -> Self {
        self.quality_flags = flags.into_iter().collect();
        self
    }

    pub fn with_quality_mapping(mut self, meter: impl Into<String>, nem: impl Into<String>) -> Self {
        self.quality_map.insert(meter.into(), nem.into());
        self
    }

    /// Delimiter used when detection has nothing to go on
    pub fn fallback_delimiter(&self) -> u8 {
        self.delimiters.first().copied().unwrap_or(b',')
    }

    pub fn is_quality_flag(&self, token: &str) -> bool {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.quality_flags.contains(&c),
            _ => false,
        }
    }

    /// Expected number of intervals in one day for a declared interval length.
    ///
    /// The table covers the common 15/30/60 minute lengths; anything else is
    /// `1440 / length`, never less than one.
    pub fn intervals_per_day(&self, interval_minutes: u32) -> usize {
        if let Some(count) = self.intervals_per_day.get(&interval_minutes) {
            return *count;
        }
        if interval_minutes == 0 {
            return self.intervals_per_day(self.default_interval_minutes.max(1));
        }
        ((MINUTES_PER_DAY / interval_minutes) as usize).max(1)
    }

    /// Map a meter-side quality token onto the NEM12 vocabulary.
    /// Unmapped tokens pass through unchanged.
    pub fn map_quality(&self, meter_quality: &str) -> String {
        self.quality_map
            .get(meter_quality)
            .cloned()
            .unwrap_or_else(|| meter_quality.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_per_day_table() {
        let config = ValidationConfig::default();
        assert_eq!(config.intervals_per_day(15), 96);
        assert_eq!(config.intervals_per_day(30), 48);
        assert_eq!(config.intervals_per_day(60), 24);
    }

    #[test]
    fn test_intervals_per_day_computed() {
        let config = ValidationConfig::default();
        assert_eq!(config.intervals_per_day(5), 288);
        assert_eq!(config.intervals_per_day(45), 32);
        // Longer than a day still yields one interval
        assert_eq!(config.intervals_per_day(2000), 1);
    }

    #[test]
    fn test_is_quality_flag() {
        let config = ValidationConfig::default();
        assert!(config.is_quality_flag("A"));
        assert!(config.is_quality_flag("V"));
        assert!(!config.is_quality_flag("X"));
        assert!(!config.is_quality_flag("AV"));
        assert!(!config.is_quality_flag(""));
        assert!(!config.is_quality_flag("1"));
    }

    #[test]
    fn test_alternate_quality_alphabet() {
        let config = ValidationConfig::default().with_quality_flags(['X']);
        assert!(config.is_quality_flag("X"));
        assert!(!config.is_quality_flag("A"));
    }

    #[test]
    fn test_map_quality_passthrough() {
        let config = ValidationConfig::default().with_quality_mapping("9", "A");
        assert_eq!(config.map_quality("0"), "0");
        assert_eq!(config.map_quality("9"), "A");
        assert_eq!(config.map_quality("E52"), "E52");
    }

    #[test]
    fn test_fallback_delimiter() {
        let mut config = ValidationConfig::default();
        assert_eq!(config.fallback_delimiter(), b',');
        config.delimiters.clear();
        assert_eq!(config.fallback_delimiter(), b',');
    }
}
