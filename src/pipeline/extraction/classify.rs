//! Reference-range classification.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::LabStatus;

/// First `low - high` pair in a reference range string.
static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*-\s*([\d.]+)").expect("valid range regex"));

/// Parsed numeric reference interval (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = RANGE_PATTERN.captures(text)?;
        let low = caps.get(1)?.as_str().parse().ok()?;
        let high = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { low, high })
    }

    pub fn classify(&self, value: f64) -> LabStatus {
        if value < self.low {
            LabStatus::Low
        } else if value > self.high {
            LabStatus::High
        } else {
            LabStatus::Normal
        }
    }
}

/// Parse a reported value. Thousands separators are ignored.
pub fn parse_value(value: &str) -> Option<f64> {
    value.replace(',', "").trim().parse().ok()
}

/// Classify a value against its reference range.
///
/// Unknown when either the value or the range cannot be read as numbers.
pub fn determine_status(value: &str, reference_range: &str) -> LabStatus {
    match (parse_value(value), ReferenceRange::parse(reference_range)) {
        (Some(v), Some(range)) => range.classify(v),
        _ => LabStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_range_is_low() {
        assert_eq!(determine_status("10.5", "12.0-15.5"), LabStatus::Low);
    }

    #[test]
    fn above_range_is_high() {
        assert_eq!(determine_status("190", "0 - 130"), LabStatus::High);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(determine_status("12.0", "12.0-15.5"), LabStatus::Normal);
        assert_eq!(determine_status("15.5", "12.0-15.5"), LabStatus::Normal);
    }

    #[test]
    fn commas_are_stripped_from_value() {
        assert_eq!(determine_status("4,500", "4000-11000"), LabStatus::Normal);
        assert_eq!(determine_status("12,500", "4000-11000"), LabStatus::High);
    }

    #[test]
    fn non_numeric_value_is_unknown() {
        assert_eq!(determine_status("<5", "0-10"), LabStatus::Unknown);
        assert_eq!(determine_status("positive", "negative"), LabStatus::Unknown);
    }

    #[test]
    fn missing_range_is_unknown() {
        assert_eq!(determine_status("95", ""), LabStatus::Unknown);
        assert_eq!(determine_status("95", "< 100"), LabStatus::Unknown);
    }

    #[test]
    fn range_found_inside_surrounding_text() {
        let range = ReferenceRange::parse("Ref. Range: 70 - 100 mg/dL").unwrap();
        assert_eq!(range, ReferenceRange { low: 70.0, high: 100.0 });
    }

    #[test]
    fn malformed_range_number_is_unknown() {
        // "1.2.3" matches the character class but is not a number
        assert_eq!(determine_status("5", "1.2.3-9"), LabStatus::Unknown);
    }
}
