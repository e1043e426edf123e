pub mod archive;
pub mod batch;
pub mod config;
pub mod discovery;
pub mod metrics;
pub mod origin;
pub mod progress;
pub mod renamer;
pub mod spreadsheet;
pub mod testing;

pub use archive::{archive_found_images, ArchiveError, ZipBuilder, BATCH_ARCHIVE_NAME};
pub use batch::{BatchError, BatchOrchestrator, BatchResult, TaskStarted};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use discovery::{
    DiscoveryEngine, DiscoveryError, PatternGenerator, PatternRules, ProductCode, SearchResult,
};
pub use origin::{FetchError, Fetcher, HttpOrigin, Prober};
pub use progress::{
    InMemoryProgressStore, ProgressError, ProgressSnapshot, ProgressStore, ProgressTracker,
    TaskStatus,
};
pub use renamer::{
    MappingError, MappingRefresher, MappingStore, RenameError, RenameSessionStore, Renamer,
    SqliteMappingStore, UploadedFile,
};
pub use spreadsheet::SpreadsheetError;
