pub mod enhance;
pub mod parser;
pub mod pipeline;
pub mod recognizer;
pub mod regions;

pub use enhance::{enhance, EnhanceError};
pub use parser::{LineReject, ReceiptParser, IGNORE_KEYWORDS};
pub use pipeline::{ScanConfig, ScanError, ScanOutcome, ScanPipeline};
pub use recognizer::{
    MockRecognizer, OcrError, RecognitionMode, TextRecognizer, UnavailableRecognizer,
};
pub use regions::{Region, RegionDetector};
