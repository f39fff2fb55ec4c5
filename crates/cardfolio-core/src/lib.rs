//! cardfolio-core: the client-side card ingestion pipeline
//!
//! This library turns a photographed business card into a persisted,
//! correctly counted, searchable contact record:
//! - Capture orchestration: photo → blob upload → remote recognition →
//!   optional voice note → in-memory draft → explicit persist
//! - Card repository: CRUD and move/delete semantics for cards and
//!   categories over a non-transactional document store, including the
//!   denormalized folder counters
//! - Search: debounced, filtered full-text lookup with a small local
//!   query history
//!
//! Recognition, transcription, and blob storage are external HTTP services
//! reached through the traits in [`recognition`] and [`blob`]; the durable
//! backend is anything implementing `cardfolio_store::DocumentStore`.

pub mod blob;
pub mod capture;
pub mod config;
pub mod http;
pub mod recognition;
pub mod repository;
pub mod search;

pub use blob::{BlobError, BlobPath, BlobStore, HttpBlobStore};
pub use capture::{
    AudioClip, CaptureError, CaptureOrchestrator, CaptureStage, CaptureStep, CardDraft, PhotoFrame,
};
pub use config::{ApiConfig, CaptureConfig, ConfigError, CoreConfig, SearchConfig, UploadConfig};
pub use http::{HttpClient, HttpError, HttpResponse, RateLimiter};
pub use recognition::{
    HttpRecognitionClient, Recognized, RecognitionError, RecognitionResult, RecognitionService,
    Transcription,
};
pub use repository::{
    CardRepository, DeleteCategoryMode, FilterCounts, MovePhase, RepositoryError,
};
pub use search::{
    DebouncedSearch, HistoryError, HistoryStore, JsonFileHistory, MemoryHistory, SearchClient,
    SearchError, SearchFilters, SearchHistory, SearchSnapshot,
};
