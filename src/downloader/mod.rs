// Downloader module: catalog building, progress normalization, sessions

pub mod backends;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use errors::DownloadError;
pub use format_selector::{CatalogPolicy, FormatSelector};
pub use models::{DownloadConfig, DownloadRequest, FormatOption, MediaMetadata, SessionEvent, StreamDescriptor};
pub use orchestrator::Downloader;
pub use traits::{DownloadEngine, EventSink, ExtractionEngine};
