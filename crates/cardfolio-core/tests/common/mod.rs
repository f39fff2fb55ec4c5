//! Shared fakes and fixtures for integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cardfolio_core::blob::{BlobError, BlobPath, BlobStore};
use cardfolio_core::recognition::{
    Recognized, RecognitionError, RecognitionResult, RecognitionService, Transcription,
};
use cardfolio_core::repository::CardRepository;
use cardfolio_core::search::{MemoryHistory, SearchClient, SearchHistory};
use cardfolio_core::CoreConfig;
use cardfolio_domain::ContactFields;
use cardfolio_store::MemoryStore;

pub type AnalyzeOutcome = Result<Recognized<RecognitionResult>, RecognitionError>;
pub type TranscribeOutcome = Result<Recognized<Transcription>, RecognitionError>;

/// Recognition fake that replays a queue of scripted outcomes.
#[derive(Default)]
pub struct ScriptedRecognition {
    analyze: Mutex<VecDeque<AnalyzeOutcome>>,
    transcribe: Mutex<VecDeque<TranscribeOutcome>>,
}

impl ScriptedRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_analyze(&self, outcome: AnalyzeOutcome) {
        self.analyze.lock().unwrap().push_back(outcome);
    }

    pub fn push_transcribe(&self, outcome: TranscribeOutcome) {
        self.transcribe.lock().unwrap().push_back(outcome);
    }

    fn next_analyze(&self) -> AnalyzeOutcome {
        self.analyze
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Recognized::Genuine(RecognitionResult::default())))
    }
}

impl RecognitionService for ScriptedRecognition {
    async fn analyze_image_url(
        &self,
        _image_url: &str,
    ) -> Result<Recognized<RecognitionResult>, RecognitionError> {
        self.next_analyze()
    }

    async fn analyze_image(
        &self,
        _bytes: Vec<u8>,
        _filename: &str,
    ) -> Result<Recognized<RecognitionResult>, RecognitionError> {
        self.next_analyze()
    }

    async fn transcribe(
        &self,
        _bytes: Vec<u8>,
        _filename: &str,
    ) -> Result<Recognized<Transcription>, RecognitionError> {
        self.transcribe
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Recognized::Genuine(Transcription::default())))
    }
}

/// Blob store fake that records uploads and can fail on demand.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub uploads: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &BlobPath,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BlobError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BlobError::Transport {
                message: "scripted failure".to_string(),
            });
        }
        let url = format!("mem://{path}");
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }
}

pub fn repository() -> Arc<CardRepository> {
    Arc::new(CardRepository::new(Arc::new(MemoryStore::new())))
}

pub fn search_client(repository: Arc<CardRepository>) -> Arc<SearchClient> {
    let config = CoreConfig::default();
    Arc::new(SearchClient::new(
        repository,
        SearchHistory::new(Box::new(MemoryHistory::new()), config.search.history_limit),
        config.search.high_quality_threshold,
    ))
}

pub fn jane_doe_result() -> RecognitionResult {
    RecognitionResult {
        card_id: Some("remote-1".to_string()),
        fields: ContactFields {
            name: Some("Jane Doe".to_string()),
            company: Some("Acme".to_string()),
            email: Some("jane@acme.example".to_string()),
            ..Default::default()
        },
        qa_score: Some(0.92),
        qa_status: cardfolio_domain::QaStatus::Passed,
        ..Default::default()
    }
}
