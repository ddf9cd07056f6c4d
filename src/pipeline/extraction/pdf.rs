use super::types::{PageExtraction, PdfExtractor};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        if !is_pdf(pdf_bytes) {
            return Err(ExtractionError::NotPdf);
        }

        // pdf-extract panics on some malformed documents (e.g. a page without
        // a Resources dictionary); treat that the same as a parse error.
        let page_texts = std::panic::catch_unwind(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        })
        .map_err(|payload| ExtractionError::PdfParsing(panic_message(payload.as_ref())))?
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text,
            })
            .collect::<Vec<_>>();

        tracing::debug!(pages = pages.len(), "PDF text extracted");
        Ok(pages)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown error".into());
    tracing::warn!(%detail, "PDF parser panicked");
    format!("malformed PDF: {detail}")
}

/// Magic-byte check: `%PDF-` header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Generate a valid PDF with one text line per entry using lopdf
    /// (the library that pdf-extract uses internally).
    pub(crate) fn make_test_pdf(lines: &[&str]) -> Vec<u8> {
        build_pdf(lines, true)
    }

    /// Same document, but the page carries no Resources dictionary.
    pub(crate) fn make_pdf_without_resources(lines: &[&str]) -> Vec<u8> {
        build_pdf(lines, false)
    }

    fn build_pdf(lines: &[&str], with_resources: bool) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        // One BT/ET block per line, moving down the page
        let mut content = String::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 700 - (i as i32) * 20;
            content.push_str(&format!("BT /F1 12 Tf 72 {y} Td ({line}) Tj ET\n"));
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        };

        let mut page = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        };
        if with_resources {
            page.set("Resources", resources);
        }
        let page_id = doc.add_object(page);

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });

        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let pdf_bytes = make_test_pdf(&["Hemoglobin 10.5 g/dL"]);
        let pages = PdfTextExtractor.extract_text(&pdf_bytes).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert!(
            pages[0].text.contains("Hemoglobin"),
            "Expected text to contain 'Hemoglobin', got: {}",
            pages[0].text
        );
    }

    #[test]
    fn non_pdf_bytes_rejected_before_parsing() {
        let result = PdfTextExtractor.extract_text(b"not a pdf");
        assert!(matches!(result, Err(ExtractionError::NotPdf)));
    }

    #[test]
    fn truncated_pdf_returns_parse_error() {
        let result = PdfTextExtractor.extract_text(b"%PDF-1.4\n%garbage");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn page_without_resources_is_parse_error_not_panic() {
        let pdf_bytes = make_pdf_without_resources(&["Glucose 95 mg/dL 70-100"]);
        let result = PdfTextExtractor.extract_text(&pdf_bytes);
        assert!(
            matches!(result, Err(ExtractionError::PdfParsing(_))),
            "expected PdfParsing, got {result:?}"
        );
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("bad xref");
        assert_eq!(panic_message(boxed.as_ref()), "malformed PDF: bad xref");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("no fonts"));
        assert_eq!(panic_message(boxed.as_ref()), "malformed PDF: no fonts");
    }

    #[test]
    fn magic_bytes_detection() {
        assert!(is_pdf(b"%PDF-1.7 rest"));
        assert!(!is_pdf(b"%PD"));
        assert!(!is_pdf(&[0xFF, 0xD8, 0xFF]));
    }
}
