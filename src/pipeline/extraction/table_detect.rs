//! Column-aligned table recovery.
//!
//! pdf-extract returns plain text, so tables are reconstructed from layout:
//! consecutive lines with column separators (tabs, pipes, wide space gaps)
//! form a table whose first line is the header.

use std::sync::LazyLock;

use regex::Regex;

use super::classify::determine_status;
use super::types::Table;
use crate::models::LabResult;

/// Minimum number of consecutive tabular lines forming a table (header + one row).
const MIN_TABLE_LINES: usize = 2;

/// Cell separators: tab, pipe (with surrounding spaces), or 2+ spaces.
static CELL_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|\s*\|\s*|\s{2,}").unwrap());

const TEST_KEYWORDS: &[&str] = &["test", "name", "component"];
const VALUE_KEYWORDS: &[&str] = &["value", "result"];
const UNIT_KEYWORDS: &[&str] = &["unit", "units"];
const RANGE_KEYWORDS: &[&str] = &["range", "reference", "normal"];

/// Heuristic: a line looks tabular if it has multiple columns separated by
/// tabs, pipes, or consistent multi-space gaps.
///
/// Patterns detected:
/// - Tab-separated: "Test\tResult\tUnit"
/// - Pipe-separated: "Test | Result | Unit"
/// - Multi-space aligned: "Potassium    4.2    mmol/L"
pub fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 5 {
        return false;
    }

    if trimmed.matches('\t').count() >= 2 {
        return true;
    }

    if trimmed.matches('|').count() >= 2 {
        return true;
    }

    count_multi_space_gaps(trimmed) >= 2
}

/// Count runs of 3+ consecutive spaces that separate non-empty text segments.
fn count_multi_space_gaps(text: &str) -> usize {
    let mut count = 0;
    let mut in_gap = false;
    let mut gap_len = 0;

    for ch in text.chars() {
        if ch == ' ' {
            gap_len += 1;
            if gap_len >= 3 && !in_gap {
                in_gap = true;
                count += 1;
            }
        } else {
            in_gap = false;
            gap_len = 0;
        }
    }

    count
}

/// Split a tabular line into trimmed cells. Leading/trailing pipes produce no cells.
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_SPLIT
        .split(line.trim().trim_matches('|'))
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Find every run of tabular lines in a page.
pub fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Table = Vec::new();

    for line in text.lines() {
        if is_tabular_line(line) {
            current.push(split_cells(line));
        } else if !current.is_empty() {
            flush(&mut current, &mut tables);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

fn flush(current: &mut Table, tables: &mut Vec<Table>) {
    if current.len() >= MIN_TABLE_LINES {
        tables.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Index of the first header containing any keyword.
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| keywords.iter().any(|k| header.contains(k)))
}

/// Parse lab results from tables whose first row is a header.
///
/// A table contributes rows only when both a test-name and a value column
/// can be located.
pub fn parse_tables(tables: &[Table]) -> Vec<LabResult> {
    let mut results = Vec::new();

    for table in tables {
        if table.len() < 2 {
            continue;
        }

        let headers: Vec<String> = table[0].iter().map(|h| h.to_lowercase()).collect();

        let test_col = find_column(&headers, TEST_KEYWORDS);
        let value_col = find_column(&headers, VALUE_KEYWORDS);
        let unit_col = find_column(&headers, UNIT_KEYWORDS);
        let range_col = find_column(&headers, RANGE_KEYWORDS);

        let (Some(test_col), Some(value_col)) = (test_col, value_col) else {
            tracing::debug!(?headers, "Table skipped: no test/value columns");
            continue;
        };

        for row in &table[1..] {
            if row.len() <= test_col.max(value_col) {
                continue;
            }

            let cell = |col: Option<usize>| {
                col.and_then(|c| row.get(c))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            };

            let test_name = cell(Some(test_col));
            let value = cell(Some(value_col));
            if test_name.is_empty() || value.is_empty() {
                continue;
            }

            let reference_range = cell(range_col);
            let status = determine_status(&value, &reference_range);

            results.push(LabResult {
                test_name,
                value,
                unit: cell(unit_col),
                reference_range,
                status,
            });
        }
    }

    results
}
