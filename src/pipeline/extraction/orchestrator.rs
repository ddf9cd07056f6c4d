use std::collections::HashSet;

use super::patterns::parse_text;
use super::table_detect::{detect_tables, parse_tables};
use super::types::PdfExtractor;
use super::ExtractionError;
use crate::models::LabResult;

/// Turns an uploaded report into classified lab rows.
///
/// Per page: tables first (more structured), then free-text patterns.
/// Rows repeated across pages or found by both passes are dropped.
pub struct LabReportExtractor<P: PdfExtractor> {
    pdf: P,
}

impl<P: PdfExtractor> LabReportExtractor<P> {
    pub fn new(pdf: P) -> Self {
        Self { pdf }
    }

    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<Vec<LabResult>, ExtractionError> {
        let pages = self.pdf.extract_text(pdf_bytes)?;
        let mut results = Vec::new();

        for page in &pages {
            let tables = detect_tables(&page.text);
            let from_tables = parse_tables(&tables);
            let from_text = parse_text(&page.text);

            tracing::debug!(
                page = page.page_number,
                tables = tables.len(),
                table_rows = from_tables.len(),
                text_rows = from_text.len(),
                "Page parsed"
            );

            results.extend(from_tables);
            results.extend(from_text);
        }

        let unique = deduplicate_results(results);
        tracing::info!(pages = pages.len(), results = unique.len(), "Lab report extracted");
        Ok(unique)
    }
}

/// Keep the first occurrence of each (test name, value) pair. Names compare case-insensitively.
pub fn deduplicate_results(results: Vec<LabResult>) -> Vec<LabResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert((r.test_name.to_lowercase(), r.value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabStatus;
    use crate::pipeline::extraction::pdf::tests::make_test_pdf;
    use crate::pipeline::extraction::{PdfTextExtractor, StaticPages};

    fn lab(name: &str, value: &str) -> LabResult {
        LabResult {
            test_name: name.into(),
            value: value.into(),
            unit: String::new(),
            reference_range: String::new(),
            status: LabStatus::Unknown,
        }
    }

    #[test]
    fn dedup_is_case_insensitive_on_name() {
        let results = vec![lab("Glucose", "95"), lab("GLUCOSE", "95"), lab("Glucose", "101")];
        let unique = deduplicate_results(results);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].test_name, "Glucose");
        assert_eq!(unique[1].value, "101");
    }

    #[test]
    fn table_and_text_passes_are_merged() {
        let page = "\
Test        Result    Units     Reference Range
Sodium      140       mmol/L    135-145
Glucose     130       mg/dL     70-100

Hemoglobin: 10.5 g/dL Ref Range: 12.0-15.5
";
        let extractor = LabReportExtractor::new(StaticPages::new([page]));
        let results = extractor.extract(b"%PDF-").unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.test_name.as_str()).collect();
        // Glucose is found by both passes but kept once, from the table
        assert_eq!(names, vec!["Sodium", "Glucose", "Hemoglobin"]);
        assert_eq!(results[1].status, LabStatus::High);
        assert_eq!(results[1].unit, "mg/dL");
        assert_eq!(results[2].status, LabStatus::Low);
    }

    #[test]
    fn results_repeated_on_later_pages_are_dropped() {
        let extractor = LabReportExtractor::new(StaticPages::new([
            "LDL: 160 mg/dL 0-130",
            "Summary repeated\nLDL: 160 mg/dL 0-130",
        ]));
        let results = extractor.extract(b"%PDF-").unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_report_yields_no_results() {
        let extractor = LabReportExtractor::new(StaticPages::new(["No numeric results"]));
        assert!(extractor.extract(b"%PDF-").unwrap().is_empty());
    }

    #[test]
    fn extracts_from_generated_pdf() {
        let pdf = make_test_pdf(&["Glucose: 130 mg/dL 70-100"]);
        let extractor = LabReportExtractor::new(PdfTextExtractor);
        let results = extractor.extract(&pdf).unwrap();

        assert!(
            results.iter().any(|r| r.test_name.eq_ignore_ascii_case("glucose") && r.value == "130"),
            "Expected glucose row, got {results:?}"
        );
    }
}
