//! Free-text lab row recognition.
//!
//! Each marker family has one case-insensitive pattern with four groups:
//! name, value, optional unit, and reference range. Reports that lay
//! results out as running text (rather than aligned columns) are caught here.

use std::sync::LazyLock;

use regex::Regex;

use super::classify::determine_status;
use crate::models::LabResult;

/// Marker name alternations, one pattern per family.
const MARKER_FAMILIES: &[&str] = &[
    "Hemoglobin|Hgb|Hb",
    "WBC|White Blood Cell|Leukocyte",
    "Glucose|Blood Sugar",
    "Iron|Ferritin",
    "Cholesterol|LDL|HDL",
];

/// Shared tail: value, optional unit, optional "Ref. Range:" label, range.
const ROW_TAIL: &str = r"\s*:?\s*([\d.]+)\s*([a-zA-Z/]+)?\s*(?:Ref\.?\s*Range:?\s*)?([\d.\-\s]+)";

static ROW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MARKER_FAMILIES
        .iter()
        .map(|names| Regex::new(&format!("(?i)({names}){ROW_TAIL}")).unwrap())
        .collect()
});

/// Parse lab results from running text.
///
/// Results come out grouped by marker family, in text order within a family.
pub fn parse_text(text: &str) -> Vec<LabResult> {
    let mut results = Vec::new();

    for pattern in ROW_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let group = |i: usize| caps.get(i).map(|m| m.as_str().trim()).unwrap_or("");

            let test_name = group(1);
            let value = group(2);
            let unit = group(3);
            let reference_range = group(4);

            results.push(LabResult {
                test_name: test_name.to_string(),
                value: value.to_string(),
                unit: unit.to_string(),
                reference_range: reference_range.to_string(),
                status: determine_status(value, reference_range),
            });
        }
    }

    results
}
