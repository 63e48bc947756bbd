//! SwiftAttend core.
//!
//! A QR-code attendance tracker: the scanner samples camera frames until a
//! code decodes, the pipeline resolves the payload to a student, enforces the
//! one-login-per-student/subject/day rule, and commits the record to SQLite.
//! Camera capture and QR decoding are injected behind traits; see
//! [`scanner::capture`].

pub mod db;
pub mod pipeline;
pub mod scanner;
pub mod settings;
mod utils;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

pub use db::{AttendanceRecord, AttendanceStatus, Database, RegisteredCode, Subject};
pub use pipeline::{
    LogNotifier, NoticeKind, NotificationSink, ScanContext, ScanFailure, ScanOutcome,
    ScanProcessor, ScanRejection,
};
pub use scanner::{CameraDevice, CameraError, CameraFacing, CodeDecoder, ScannerController};
pub use settings::{ScannerSettings, SettingsStore};

/// Everything a front end needs, wired together over one data directory.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub processor: ScanProcessor,
    pub scanner: ScannerController,
}

impl AppState {
    pub fn new(
        data_dir: &Path,
        camera: Arc<dyn CameraDevice>,
        decoder: Arc<dyn CodeDecoder>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let db = Database::new(data_dir.join("swiftattend.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let cooldown = Duration::from_millis(settings.scanner().cooldown_ms);

        let store = Arc::new(db.clone());
        let processor = ScanProcessor::new(
            store.clone(),
            store,
            Arc::new(LogNotifier),
            cooldown,
        );
        let scanner = ScannerController::new(camera, decoder);

        Ok(Self {
            db,
            settings,
            processor,
            scanner,
        })
    }
}

/// Initialize logging (reads RUST_LOG env var). Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
