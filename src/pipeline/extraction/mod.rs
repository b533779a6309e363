pub mod types;
pub mod classify;
pub mod confidence;
pub mod sanitize;
pub mod preprocess;
pub mod ocr;
pub mod vision_ocr;
pub mod language_detect;
pub mod router;

pub use types::*;
pub use classify::*;
pub use confidence::*;
pub use sanitize::*;
pub use preprocess::*;
pub use ocr::*;
pub use vision_ocr::*;
pub use language_detect::*;
pub use router::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::remote::RemoteServiceError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("No extraction strategy registered for script label '{0}'")]
    NoStrategy(String),

    #[error("Vision interpretation failed: {0}")]
    Remote(#[from] RemoteServiceError),
}

impl ExtractionError {
    /// Remote failures leave the image with an empty result; everything
    /// else aborts that image's run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
