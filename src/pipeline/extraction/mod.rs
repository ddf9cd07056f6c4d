pub mod types;
pub mod pdf;
pub mod classify;
pub mod patterns;
pub mod table_detect;
pub mod orchestrator;

pub use types::*;
pub use pdf::*;
pub use classify::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Not a PDF document")]
    NotPdf,
}
