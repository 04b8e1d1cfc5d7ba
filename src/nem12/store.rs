/// Canonical keyed storage for parsed NEM12 interval values.
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Identifies one interval reading within a file.
///
/// Field order matters: the derived `Ord` gives the (nmi, channel, date,
/// interval_index) ordering every report uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IntervalKey {
    pub nmi: String,
    pub channel: Option<String>,
    /// `YYYYMMDD` exactly as it appeared in the file
    pub date: String,
    pub interval_index: usize,
}

impl IntervalKey {
    pub fn channel_str(&self) -> &str {
        self.channel.as_deref().unwrap_or("")
    }
}

/// Where a value came from in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellLocation {
    /// 1-based line number
    pub row: usize,
    /// 1-based column number
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalValue {
    pub key: IntervalKey,
    /// Raw text; numeric interpretation happens at comparison time
    pub value: String,
    /// Single quality character, or empty when none was found
    pub quality: String,
    pub location: CellLocation,
}

/// Decide which value survives when a key is written twice.
///
/// The first value wins unless it is empty or the literal `"0"`, in which case
/// the incoming value replaces it.
pub fn resolve(existing: IntervalValue, incoming: IntervalValue) -> IntervalValue {
    if existing.value.is_empty() || existing.value == "0" {
        incoming
    } else {
        existing
    }
}

/// Interval values keyed by [`IntervalKey`], filled once during a parse.
#[derive(Debug, Clone, Default)]
pub struct IntervalStore {
    identifiers: BTreeSet<String>,
    intervals: BTreeMap<IntervalKey, IntervalValue>,
}

impl IntervalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_identifier(&mut self, nmi: &str) {
        if !self.identifiers.contains(nmi) {
            self.identifiers.insert(nmi.to_string());
        }
    }

    /// Insert a value, applying [`resolve`] on key collisions.
    /// Returns true when the key was already present.
    pub(crate) fn insert(&mut self, incoming: IntervalValue) -> bool {
        let key = incoming.key.clone();
        match self.intervals.remove(&key) {
            Some(existing) => {
                self.intervals.insert(key, resolve(existing, incoming));
                true
            }
            None => {
                self.intervals.insert(key, incoming);
                false
            }
        }
    }

    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    pub fn get(&self, key: &IntervalKey) -> Option<&IntervalValue> {
        self.intervals.get(key)
    }

    pub fn contains_key(&self, key: &IntervalKey) -> bool {
        self.intervals.contains_key(key)
    }

    /// All keys in (nmi, channel, date, interval) order
    pub fn keys(&self) -> impl Iterator<Item = &IntervalKey> {
        self.intervals.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &IntervalValue> {
        self.intervals.values()
    }

    /// Dates that have at least one interval for `nmi`, across all channels
    pub fn dates_for(&self, nmi: &str) -> BTreeSet<&str> {
        // `channel: None` with an empty date is the smallest key for `nmi`
        let first = IntervalKey {
            nmi: nmi.to_string(),
            channel: None,
            date: String::new(),
            interval_index: 0,
        };
        self.intervals
            .range(first..)
            .map(|(k, _)| k)
            .take_while(|k| k.nmi == nmi)
            .map(|k| k.date.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(nmi: &str, date: &str, idx: usize, raw: &str, row: usize) -> IntervalValue {
        IntervalValue {
            key: IntervalKey {
                nmi: nmi.to_string(),
                channel: Some("E1".to_string()),
                date: date.to_string(),
                interval_index: idx,
            },
            value: raw.to_string(),
            quality: "A".to_string(),
            location: CellLocation {
                row,
                column: idx + 3,
            },
        }
    }

    #[test]
    fn test_resolve_keeps_first_nonzero() {
        let kept = resolve(value("N", "20240101", 0, "5", 1), value("N", "20240101", 0, "0", 2));
        assert_eq!(kept.value, "5");
        assert_eq!(kept.location.row, 1);
    }

    #[test]
    fn test_resolve_replaces_zero_sentinel() {
        let kept = resolve(value("N", "20240101", 0, "0", 1), value("N", "20240101", 0, "5", 2));
        assert_eq!(kept.value, "5");
        assert_eq!(kept.location.row, 2);
    }

    #[test]
    fn test_resolve_replaces_empty() {
        let kept = resolve(value("N", "20240101", 0, "", 1), value("N", "20240101", 0, "1.2", 2));
        assert_eq!(kept.value, "1.2");
    }

    #[test]
    fn test_resolve_zero_like_values_are_not_sentinels() {
        // Only the literal "0" counts, not "0.0" or "0.000"
        let kept = resolve(value("N", "20240101", 0, "0.0", 1), value("N", "20240101", 0, "5", 2));
        assert_eq!(kept.value, "0.0");
    }

    #[test]
    fn test_resolve_sentinel_can_be_overwritten_by_empty() {
        let kept = resolve(value("N", "20240101", 0, "0", 1), value("N", "20240101", 0, "", 2));
        assert_eq!(kept.value, "");
    }

    #[test]
    fn test_insert_reports_collisions() {
        let mut store = IntervalStore::new();
        assert!(!store.insert(value("N", "20240101", 0, "0", 1)));
        assert!(store.insert(value("N", "20240101", 0, "7", 2)));
        assert_eq!(store.len(), 1);
        let key = value("N", "20240101", 0, "", 0).key;
        assert_eq!(store.get(&key).unwrap().value, "7");
    }

    #[test]
    fn test_dates_for_spans_channels() {
        let mut store = IntervalStore::new();
        store.insert(value("N1", "20240102", 0, "1", 1));
        store.insert(value("N1", "20240101", 0, "1", 2));
        let mut other_channel = value("N1", "20240103", 0, "1", 3);
        other_channel.key.channel = Some("B1".to_string());
        store.insert(other_channel);
        store.insert(value("N2", "20240104", 0, "1", 4));

        let dates: Vec<&str> = store.dates_for("N1").into_iter().collect();
        assert_eq!(dates, vec!["20240101", "20240102", "20240103"]);
    }

    #[test]
    fn test_dates_for_stops_at_neighbouring_nmis() {
        let mut store = IntervalStore::new();
        store.insert(value("N0", "20240101", 0, "1", 1));
        store.insert(value("N1", "20240105", 0, "1", 2));
        let mut no_channel = value("N1", "20240106", 0, "1", 3);
        no_channel.key.channel = None;
        store.insert(no_channel);
        store.insert(value("N10", "20240107", 0, "1", 4));
        store.insert(value("N2", "20240108", 0, "1", 5));

        let dates: Vec<&str> = store.dates_for("N1").into_iter().collect();
        assert_eq!(dates, vec!["20240105", "20240106"]);
        assert!(store.dates_for("N3").is_empty());
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut store = IntervalStore::new();
        store.insert(value("N2", "20240101", 0, "1", 1));
        store.insert(value("N1", "20240101", 1, "1", 1));
        store.insert(value("N1", "20240101", 0, "1", 1));

        let keys: Vec<(String, usize)> = store
            .keys()
            .map(|k| (k.nmi.clone(), k.interval_index))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("N1".to_string(), 0),
                ("N1".to_string(), 1),
                ("N2".to_string(), 0)
            ]
        );
    }
}
