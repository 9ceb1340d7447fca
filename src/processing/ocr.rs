use image::RgbaImage;
use log::{debug, error, info};

use crate::models::Recognition;
use crate::utils::Result;

#[cfg(feature = "tesseract")]
use crate::models::EngineSettings;
#[cfg(feature = "tesseract")]
use crate::utils::PaymentProofError;
#[cfg(feature = "tesseract")]
use log::warn;
#[cfg(feature = "tesseract")]
use tesseract::{OcrEngineMode, PageSegMode, Tesseract};

/// A text recognition engine that turns a bitmap into text plus a native
/// 0-100 confidence.
pub trait TextRecognizer {
    fn name(&self) -> &str;
    fn recognize(&mut self, bitmap: &RgbaImage) -> Result<Recognition>;
}

/// Recognizer for text-only use, where recognition happens elsewhere.
pub struct NoEngine;

impl TextRecognizer for NoEngine {
    fn name(&self) -> &str {
        "none"
    }

    fn recognize(&mut self, _bitmap: &RgbaImage) -> Result<Recognition> {
        Ok(Recognition::empty())
    }
}

type EngineFactory<E> = Box<dyn FnMut() -> Result<E> + Send>;

/// Owns at most one recognition engine and creates it on first use.
///
/// Every call takes `&mut self`, so one worker serves one caller at a time.
/// Hosts that need parallel recognition provision one worker per thread.
pub struct OcrWorker<E: TextRecognizer> {
    factory: EngineFactory<E>,
    engine: Option<E>,
}

impl<E: TextRecognizer> OcrWorker<E> {
    /// Creates the worker without initializing the engine.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> Result<E> + Send + 'static,
    {
        OcrWorker {
            factory: Box::new(factory),
            engine: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Returns the live engine, initializing it if needed.
    pub fn acquire(&mut self) -> Result<&mut E> {
        if let Some(engine) = self.engine.take() {
            return Ok(self.engine.insert(engine));
        }
        let engine = (self.factory)()?;
        info!("Initialized {} recognizer", engine.name());
        Ok(self.engine.insert(engine))
    }

    /// Recognize text in a bitmap.
    ///
    /// Failures are logged and reported as an empty recognition. A failed
    /// engine is dropped so the next call starts from a fresh one.
    pub fn recognize(&mut self, bitmap: &RgbaImage) -> Recognition {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            debug!("Empty bitmap, skipping recognition");
            return Recognition::empty();
        }

        match self.acquire().and_then(|engine| engine.recognize(bitmap)) {
            Ok(recognition) => {
                debug!(
                    "Recognized {} chars at native confidence {:.1}",
                    recognition.text.len(),
                    recognition.confidence
                );
                Recognition::new(recognition.text, recognition.confidence)
            }
            Err(e) => {
                error!("Text recognition failed: {}", e);
                self.engine = None;
                Recognition::empty()
            }
        }
    }

    /// Drops the engine. The next recognition re-initializes it.
    pub fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            debug!("Releasing {} recognizer", engine.name());
        }
    }

    pub fn terminate(&mut self) {
        self.release();
    }
}

impl<E: TextRecognizer> Drop for OcrWorker<E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Tesseract LSTM engine configured for payment receipts.
#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    api: Option<Tesseract>,
    settings: EngineSettings,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        let api = Self::init_api(&settings)?;
        Ok(TesseractEngine {
            api: Some(api),
            settings,
        })
    }

    fn init_api(settings: &EngineSettings) -> Result<Tesseract> {
        let mut api = Tesseract::new_with_oem(
            settings.tessdata_path.as_deref(),
            Some(settings.language.as_str()),
            OcrEngineMode::LstmOnly,
        )
        .map_err(|e| {
            PaymentProofError::EngineInit(format!("Failed to initialize Tesseract: {}", e))
        })?;

        for (name, value) in settings.variables() {
            api = api.set_variable(name, &value).map_err(|e| {
                PaymentProofError::EngineInit(format!("Failed to set {}: {}", name, e))
            })?;
        }
        api.set_page_seg_mode(page_seg_mode(&settings.page_seg_mode));

        Ok(api)
    }
}

#[cfg(feature = "tesseract")]
fn page_seg_mode(name: &str) -> PageSegMode {
    match name {
        "auto" => PageSegMode::PsmAuto,
        "auto_osd" => PageSegMode::PsmAutoOsd,
        "single_column" => PageSegMode::PsmSingleColumn,
        "single_block" => PageSegMode::PsmSingleBlock,
        "single_line" => PageSegMode::PsmSingleLine,
        "sparse_text" => PageSegMode::PsmSparseText,
        other => {
            warn!("Unknown page segmentation mode '{}', using auto", other);
            PageSegMode::PsmAuto
        }
    }
}

#[cfg(feature = "tesseract")]
impl TextRecognizer for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&mut self, bitmap: &RgbaImage) -> Result<Recognition> {
        let api = match self.api.take() {
            Some(api) => api,
            None => Self::init_api(&self.settings)?,
        };

        let too_large = || PaymentProofError::Recognition("Bitmap too large".to_string());
        let width = i32::try_from(bitmap.width()).map_err(|_| too_large())?;
        let height = i32::try_from(bitmap.height()).map_err(|_| too_large())?;
        let bytes_per_line = width.checked_mul(4).ok_or_else(too_large)?;

        let mut api = api
            .set_frame(bitmap.as_raw(), width, height, 4, bytes_per_line)
            .map_err(|e| PaymentProofError::Recognition(format!("Failed to set frame: {}", e)))?
            .recognize()
            .map_err(|e| PaymentProofError::Recognition(format!("Recognition failed: {}", e)))?;

        let text = api
            .get_text()
            .map_err(|e| PaymentProofError::Recognition(format!("Failed to read text: {}", e)))?;
        let confidence = api.mean_text_conf() as f64;

        self.api = Some(api);
        Ok(Recognition::new(text, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::PaymentProofError;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedRecognizer {
        text: String,
        confidence: f64,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&mut self, _bitmap: &RgbaImage) -> Result<Recognition> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PaymentProofError::Recognition("scripted failure".to_string()));
            }
            Ok(Recognition {
                text: self.text.clone(),
                confidence: self.confidence,
            })
        }
    }

    struct Counters {
        inits: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    fn worker(text: &str, confidence: f64, fail: bool) -> (OcrWorker<ScriptedRecognizer>, Counters) {
        let inits = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counters = Counters {
            inits: inits.clone(),
            calls: calls.clone(),
        };
        let text = text.to_string();
        let worker = OcrWorker::new(move || {
            inits.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedRecognizer {
                text: text.clone(),
                confidence,
                fail,
                calls: calls.clone(),
            })
        });
        (worker, counters)
    }

    fn bitmap() -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_worker_is_lazy() {
        let (worker, counters) = worker("text", 80.0, false);
        assert!(!worker.is_initialized());
        assert_eq!(counters.inits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_engine_is_reused_across_calls() {
        let (mut worker, counters) = worker("Ref No 123456", 80.0, false);
        for _ in 0..3 {
            let r = worker.recognize(&bitmap());
            assert_eq!(r.text, "Ref No 123456");
            assert_eq!(r.confidence, 80.0);
        }
        assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_release_then_recognize_reinitializes() {
        let (mut worker, counters) = worker("x", 50.0, false);
        worker.recognize(&bitmap());
        worker.terminate();
        assert!(!worker.is_initialized());
        worker.recognize(&bitmap());
        assert_eq!(counters.inits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_engine_failure_degrades_to_empty() {
        let (mut worker, counters) = worker("ignored", 90.0, true);
        let r = worker.recognize(&bitmap());
        assert_eq!(r, Recognition::empty());
        assert!(!worker.is_initialized());
        worker.recognize(&bitmap());
        assert_eq!(counters.inits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_init_failure_degrades_to_empty() {
        let mut worker: OcrWorker<ScriptedRecognizer> = OcrWorker::new(|| {
            Err(PaymentProofError::EngineInit("no language data".to_string()))
        });
        assert_eq!(worker.recognize(&bitmap()), Recognition::empty());
        assert!(worker.acquire().is_err());
    }

    #[test]
    fn test_empty_bitmap_skips_engine() {
        let (mut worker, counters) = worker("x", 50.0, false);
        let r = worker.recognize(&RgbaImage::new(0, 0));
        assert_eq!(r, Recognition::empty());
        assert!(!worker.is_initialized());
        assert_eq!(counters.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_native_confidence_is_clamped() {
        let (mut worker, _) = worker("", -1.0, false);
        assert_eq!(worker.recognize(&bitmap()).confidence, 0.0);
    }

    #[test]
    fn test_no_engine_recognizes_nothing() {
        let mut worker = OcrWorker::new(|| Ok(NoEngine));
        assert_eq!(worker.recognize(&bitmap()), Recognition::empty());
        assert!(worker.is_initialized());
    }

    #[test]
    fn test_acquire_initializes_once() {
        let (mut worker, counters) = worker("x", 50.0, false);
        assert_eq!(worker.acquire().unwrap().name(), "scripted");
        worker.acquire().unwrap();
        assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    }
}
