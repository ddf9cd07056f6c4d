use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Per-page extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// A table recovered from page text. The first row is the header.
pub type Table = Vec<Vec<String>>;

/// PDF text extraction abstraction
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

impl PdfExtractor for Box<dyn PdfExtractor + Send + Sync> {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        (**self).extract_text(pdf_bytes)
    }
}

/// Canned pages, for exercising the parsing pipeline without a real PDF.
pub struct StaticPages {
    pages: Vec<String>,
}

impl StaticPages {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }
}

impl PdfExtractor for StaticPages {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text: text.clone(),
            })
            .collect())
    }
}
