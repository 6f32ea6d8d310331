pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use splitbill_core::BillState;
use splitbill_ocr::{ScanPipeline, TextRecognizer};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, RecognizerConfig, ServerConfig};
pub use error::ApiError;

/// Shared by every handler. The bill sits behind a single mutex so scans
/// and assignments never interleave mid-update.
#[derive(Clone)]
pub struct AppState {
    pub bill: Arc<Mutex<BillState>>,
    pub pipeline: Arc<ScanPipeline>,
}

impl AppState {
    pub fn new(pipeline: ScanPipeline) -> Self {
        Self {
            bill: Arc::new(Mutex::new(BillState::new())),
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/scan-bill", post(handlers::scan_bill))
        .route("/save-bill", post(handlers::save_bill))
        .route("/add-person", post(handlers::add_person))
        .route("/get-persons", get(handlers::get_persons))
        .route("/remove-person", post(handlers::remove_person))
        .route("/get-items", get(handlers::get_items))
        .route("/add-item", post(handlers::add_item))
        .route("/remove-item", post(handlers::remove_item))
        .route("/assign-item", post(handlers::assign_item))
        .route("/split-summary", get(handlers::split_summary))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The recognizer compiled into this binary.
#[cfg(feature = "tesseract")]
pub fn default_recognizer(config: &RecognizerConfig) -> Arc<dyn TextRecognizer> {
    use splitbill_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    Arc::new(TesseractRecognizer::new(
        config.tessdata_path.clone(),
        &config.lang,
    ))
}

/// The recognizer compiled into this binary.
#[cfg(not(feature = "tesseract"))]
pub fn default_recognizer(_config: &RecognizerConfig) -> Arc<dyn TextRecognizer> {
    tracing::warn!("Built without the `tesseract` feature; scans will find no text");
    Arc::new(splitbill_ocr::UnavailableRecognizer)
}
