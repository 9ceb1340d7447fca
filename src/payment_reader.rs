use crate::models::{OcrResult, PaymentProofReport, ReaderConfig};
use crate::processing::{
    ConfidenceScorer, ImageProcessor, NoEngine, OcrWorker, PaymentExtractor, SharpeningFilter,
    TextRecognizer,
};
use crate::utils::Result;
use crate::validation::PaymentValidator;
#[cfg(feature = "tesseract")]
use crate::processing::TesseractEngine;
use image::RgbaImage;
use log::{debug, info};
use std::path::Path;

/// Reads GCash, Maya and bank transfer screenshots into an `OcrResult`.
///
/// Owns one recognition worker; the engine is created on the first read and
/// reused until `terminate` is called or the reader is dropped.
pub struct PaymentProofReader<E: TextRecognizer> {
    worker: OcrWorker<E>,
    sharpener: SharpeningFilter,
    extractor: PaymentExtractor,
    scorer: ConfidenceScorer,
}

impl<E: TextRecognizer> PaymentProofReader<E> {
    pub fn new<F>(config: ReaderConfig, engine_factory: F) -> Self
    where
        F: FnMut() -> Result<E> + Send + 'static,
    {
        PaymentProofReader {
            worker: OcrWorker::new(engine_factory),
            sharpener: SharpeningFilter::new(),
            scorer: ConfidenceScorer::new(&config.rules),
            extractor: PaymentExtractor::new(config.rules),
        }
    }

    /// Full pipeline: preprocess, sharpen, recognize, extract, score.
    ///
    /// Never fails; anything that goes wrong degrades to an empty result.
    pub fn read(&mut self, image_bytes: &[u8]) -> OcrResult {
        info!("Reading payment proof ({} bytes)", image_bytes.len());

        let bitmap = self.prepare(image_bytes);
        let recognition = self.worker.recognize(&bitmap);
        let result = self.extract_text(&recognition.text, recognition.confidence);

        info!(
            "Payment proof read: method={} confidence={:.1}",
            result.method, result.confidence
        );
        result
    }

    /// Reads an image from disk. Only failing to read the file is an error.
    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<OcrResult> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(self.read(&bytes))
    }

    pub fn read_with_expected(
        &mut self,
        image_bytes: &[u8],
        expected_amount: Option<f64>,
    ) -> PaymentProofReport {
        let result = self.read(image_bytes);
        self.review(result, expected_amount)
    }

    /// The bitmap handed to the recognition engine.
    pub fn prepare(&self, image_bytes: &[u8]) -> RgbaImage {
        let bitmap = ImageProcessor::preprocess(image_bytes);
        debug!("Preprocessed bitmap is {}x{}", bitmap.width(), bitmap.height());
        self.sharpener.apply(&bitmap)
    }

    /// Extraction and scoring over text that was already recognized.
    pub fn extract_text(&self, text: &str, native_confidence: f64) -> OcrResult {
        let details = self.extractor.extract(text);
        let confidence = self.scorer.score(native_confidence, &details);

        OcrResult {
            reference_number: details.reference_number,
            amount: details.amount,
            confidence,
            raw_text: text.to_string(),
            method: details.method,
        }
    }

    /// Attach review warnings to a result.
    pub fn review(&self, result: OcrResult, expected_amount: Option<f64>) -> PaymentProofReport {
        let warnings = PaymentValidator::validate(&result, expected_amount, self.extractor.rules());
        if !warnings.is_empty() {
            debug!("{} review warning(s) raised", warnings.len());
        }
        PaymentProofReport { result, warnings }
    }

    pub fn is_engine_ready(&self) -> bool {
        self.worker.is_initialized()
    }

    /// Releases the recognition engine; the next read re-creates it.
    pub fn terminate(&mut self) {
        self.worker.terminate();
    }
}

impl PaymentProofReader<NoEngine> {
    /// A reader for text recognized elsewhere; `read` always comes back empty.
    pub fn text_only(config: ReaderConfig) -> Self {
        Self::new(config, || Ok(NoEngine))
    }
}

#[cfg(feature = "tesseract")]
impl PaymentProofReader<TesseractEngine> {
    pub fn with_tesseract(config: ReaderConfig) -> Self {
        let settings = config.engine.clone();
        Self::new(config, move || TesseractEngine::new(settings.clone()))
    }
}
