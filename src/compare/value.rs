/// A raw interval value, interpreted only when compared.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    Numeric(f64),
    Text(String),
}

impl ReadingValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) => ReadingValue::Numeric(n),
            Err(_) => ReadingValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReadingValue::Numeric(n) => Some(*n),
            ReadingValue::Text(_) => None,
        }
    }
}

/// Compare two raw values.
///
/// Numeric when both sides parse, equal when the absolute difference does not
/// exceed `tolerance`. Otherwise exact string equality after trimming.
pub fn values_match(before: &str, after: &str, tolerance: f64) -> bool {
    match (ReadingValue::parse(before), ReadingValue::parse(after)) {
        (ReadingValue::Numeric(a), ReadingValue::Numeric(b)) => !((a - b).abs() > tolerance),
        _ => before.trim() == after.trim(),
    }
}
