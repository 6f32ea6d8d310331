use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("region image rejected by recognizer: {0}")]
    ImageDecode(String),
    #[error("recognizer failed: {0}")]
    Engine(String),
    #[error("no text recognizer compiled in (enable the `tesseract` feature)")]
    NotAvailable,
}

/// Layout hint passed to the recognizer for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// A run of words on a single line.
    Line,
    /// A single token or number.
    Word,
}

impl RecognitionMode {
    /// Regions wider than `line_min_width` are read as full lines.
    pub fn for_width(width: u32, line_min_width: u32) -> Self {
        if width > line_min_width {
            RecognitionMode::Line
        } else {
            RecognitionMode::Word
        }
    }

    /// Tesseract page segmentation mode for this hint.
    pub fn page_seg_mode(self) -> &'static str {
        match self {
            RecognitionMode::Line => "7",
            RecognitionMode::Word => "8",
        }
    }
}

/// Abstraction over a character-recognition engine.
/// Implementations accept PNG bytes of one region and return whatever text
/// they read, which may be empty or garbled.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_png: &[u8], mode: RecognitionMode) -> Result<String, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Scripted recognizer. Replies with `text` unless a reply was set for the
/// requested mode, and records the mode of every call.
pub struct MockRecognizer {
    text: String,
    line_text: Option<String>,
    word_text: Option<String>,
    calls: Mutex<Vec<RecognitionMode>>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_text: None,
            word_text: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mode_text(mut self, mode: RecognitionMode, text: impl Into<String>) -> Self {
        match mode {
            RecognitionMode::Line => self.line_text = Some(text.into()),
            RecognitionMode::Word => self.word_text = Some(text.into()),
        }
        self
    }

    /// Modes requested so far, in call order.
    pub fn calls(&self) -> Vec<RecognitionMode> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image_png: &[u8], mode: RecognitionMode) -> Result<String, OcrError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(mode);
        let scripted = match mode {
            RecognitionMode::Line => self.line_text.as_ref(),
            RecognitionMode::Word => self.word_text.as_ref(),
        };
        Ok(scripted.unwrap_or(&self.text).clone())
    }
}

/// Stand-in used when no engine is compiled in. Every call fails.
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image_png: &[u8], _mode: RecognitionMode) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrError, RecognitionMode, TextRecognizer};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, image_png: &[u8], mode: RecognitionMode) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, mode.page_seg_mode())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
