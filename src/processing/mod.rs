pub mod confidence;
pub mod extractors;
pub mod field_correction;
pub mod image;
pub mod ocr;
pub mod sharpen;

pub use confidence::ConfidenceScorer;
pub use extractors::{classify_method, Classification, PaymentExtractor, ReferenceMatch};
pub use field_correction::{IdCorrection, MayaIdCorrection, NoCorrection};
pub use self::image::ImageProcessor;
pub use ocr::{NoEngine, OcrWorker, TextRecognizer};
pub use sharpen::SharpeningFilter;

#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
