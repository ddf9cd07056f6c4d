use serde::{Deserialize, Serialize};

use super::enums::LabStatus;

/// A single row extracted from an uploaded report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub test_name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub status: LabStatus,
}

/// Per-status counts shown alongside the summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStats {
    pub total: usize,
    pub normal: usize,
    pub high: usize,
    pub low: usize,
    pub unknown: usize,
}

impl ResultStats {
    pub fn from_results(results: &[LabResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                LabStatus::Normal => stats.normal += 1,
                LabStatus::High => stats.high += 1,
                LabStatus::Low => stats.low += 1,
                LabStatus::Unknown => stats.unknown += 1,
            }
        }
        stats
    }
}
