//! Capture orchestration
//!
//! Drives one photograph from shutter press to persisted card:
//! photo preview → blob upload → recognition → optional voice note →
//! reviewable draft → explicit persist. Nothing touches durable storage
//! until the user confirms the draft; the only write path is
//! `CardRepository::add_card` inside [`CaptureOrchestrator::persist`].
//!
//! The orchestrator holds at most one in-flight draft. The long-running
//! steps (upload, recognize, upload voice, transcribe, persist) are the
//! transient states of the flow; a failed step is reported with its
//! [`CaptureStep`] so the caller can decide between retry and abandon,
//! and no step is retried automatically.

use std::mem;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use cardfolio_domain::{Card, CategoryId, ContactFields, NewCard, QaStatus, UserId, VoiceNote};

use crate::blob::{BlobPath, BlobStore};
use crate::config::{CaptureConfig, CoreConfig, UploadConfig};
use crate::recognition::{RecognitionService, Recognized, Transcription};
use crate::repository::CardRepository;

/// One captured camera frame.
#[derive(Clone, Debug)]
pub struct PhotoFrame {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PhotoFrame {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/jpeg".to_string(),
        }
    }
}

/// A finished voice recording handed in by the caller.
#[derive(Clone, Debug)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub duration_secs: f64,
}

impl AudioClip {
    pub fn m4a(bytes: Vec<u8>, duration_secs: f64) -> Self {
        Self {
            bytes,
            content_type: "audio/m4a".to_string(),
            duration_secs,
        }
    }
}

/// Observable position in the capture flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStage {
    Idle,
    PhotoPreview,
    /// Photo uploaded but recognition failed; retry or discard.
    PhotoUploaded,
    VoicePrompt,
    DraftReady,
    Persisted,
}

/// The long-running step an error occurred in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStep {
    UploadPhoto,
    Recognize,
    UploadVoice,
    Transcribe,
    Persist,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("a capture is already in progress; discard or persist it first")]
    CaptureInProgress,

    #[error("operation requires the {expected} stage")]
    WrongStage { expected: &'static str },

    #[error("photo exceeds the {limit}-byte upload limit")]
    ImageTooLarge { limit: usize },

    #[error("recording exceeds the {limit}-byte upload limit")]
    AudioTooLarge { limit: usize },

    #[error("voice note exceeds the {limit_secs}-second maximum")]
    VoiceTooLong { limit_secs: f64 },

    #[error("capture step {step:?} failed")]
    Step {
        step: CaptureStep,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn step_err(
    step: CaptureStep,
    source: impl std::error::Error + Send + Sync + 'static,
) -> CaptureError {
    CaptureError::Step {
        step,
        source: Box::new(source),
    }
}

/// An unpersisted card assembled during capture. Lives only in memory;
/// editable until persisted, discardable at any point.
#[derive(Clone, Debug, PartialEq)]
pub struct CardDraft {
    pub owner: UserId,
    pub image_url: String,
    pub fields: ContactFields,
    pub qa_score: Option<f64>,
    pub qa_status: Option<QaStatus>,
    pub category: Option<(CategoryId, String)>,
    pub voice_note: Option<VoiceNote>,
    pub captured_at: DateTime<Utc>,
}

impl CardDraft {
    fn to_new_card(&self) -> NewCard {
        let (category_id, category_name) = match &self.category {
            Some((id, name)) => (Some(id.clone()), Some(name.clone())),
            None => (None, None),
        };
        NewCard {
            user_id: self.owner.clone(),
            category_id,
            category_name,
            fields: self.fields.clone(),
            qa_score: self.qa_score,
            qa_status: self.qa_status,
            image_url: Some(self.image_url.clone()),
            voice_note: self.voice_note.clone(),
            created_at: Some(self.captured_at),
        }
    }
}

enum Session {
    Idle,
    PhotoPreview {
        photo: PhotoFrame,
        target: Option<(CategoryId, String)>,
    },
    PhotoUploaded {
        image_url: String,
        target: Option<(CategoryId, String)>,
    },
    VoicePrompt {
        draft: CardDraft,
    },
    DraftReady {
        draft: CardDraft,
    },
    Persisted {
        card: Card,
    },
}

pub struct CaptureOrchestrator<R, B> {
    recognition: R,
    blobs: B,
    repository: Arc<CardRepository>,
    upload: UploadConfig,
    capture: CaptureConfig,
    owner: UserId,
    session: Session,
}

impl<R: RecognitionService, B: BlobStore> CaptureOrchestrator<R, B> {
    pub fn new(
        recognition: R,
        blobs: B,
        repository: Arc<CardRepository>,
        config: &CoreConfig,
        owner: UserId,
    ) -> Self {
        Self {
            recognition,
            blobs,
            repository,
            upload: config.upload.clone(),
            capture: config.capture.clone(),
            owner,
            session: Session::Idle,
        }
    }

    pub fn stage(&self) -> CaptureStage {
        match &self.session {
            Session::Idle => CaptureStage::Idle,
            Session::PhotoPreview { .. } => CaptureStage::PhotoPreview,
            Session::PhotoUploaded { .. } => CaptureStage::PhotoUploaded,
            Session::VoicePrompt { .. } => CaptureStage::VoicePrompt,
            Session::DraftReady { .. } => CaptureStage::DraftReady,
            Session::Persisted { .. } => CaptureStage::Persisted,
        }
    }

    /// The in-memory draft, once recognition has produced one.
    pub fn draft(&self) -> Option<&CardDraft> {
        match &self.session {
            Session::VoicePrompt { draft } | Session::DraftReady { draft } => Some(draft),
            _ => None,
        }
    }

    /// Mutable access to a reviewable draft, for field edits before save.
    pub fn draft_mut(&mut self) -> Option<&mut CardDraft> {
        match &mut self.session {
            Session::DraftReady { draft } => Some(draft),
            _ => None,
        }
    }

    /// Start a capture with one camera frame. `target` is the folder the
    /// user is capturing into, if any. Fails while an earlier capture is
    /// still unconfirmed.
    pub fn begin(
        &mut self,
        photo: PhotoFrame,
        target: Option<(CategoryId, String)>,
    ) -> Result<(), CaptureError> {
        match self.session {
            Session::Idle | Session::Persisted { .. } => {}
            _ => return Err(CaptureError::CaptureInProgress),
        }
        if photo.bytes.len() > self.upload.max_image_bytes {
            return Err(CaptureError::ImageTooLarge {
                limit: self.upload.max_image_bytes,
            });
        }
        self.session = Session::PhotoPreview { photo, target };
        Ok(())
    }

    /// Drop the in-flight capture, whatever its state. Already-uploaded
    /// blobs are left behind; they are content-addressed and harmless.
    pub fn discard(&mut self) {
        if !matches!(self.session, Session::Idle) {
            tracing::debug!(stage = ?self.stage(), "capture discarded");
        }
        self.session = Session::Idle;
    }

    /// Upload the previewed photo, then run recognition on the uploaded
    /// URL. An upload failure returns to the preview; a recognition
    /// failure keeps the upload so recognition alone can be retried.
    pub async fn confirm_photo(&mut self) -> Result<(), CaptureError> {
        let (photo, target) = match mem::replace(&mut self.session, Session::Idle) {
            Session::PhotoPreview { photo, target } => (photo, target),
            other => {
                self.session = other;
                return Err(CaptureError::WrongStage {
                    expected: "photo preview",
                });
            }
        };

        let path = BlobPath::card_photo();
        let image_url = match self
            .blobs
            .upload(&path, photo.bytes.clone(), &photo.content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.session = Session::PhotoPreview { photo, target };
                return Err(step_err(CaptureStep::UploadPhoto, e));
            }
        };
        tracing::info!(%image_url, "card photo uploaded");

        self.recognize(image_url, target).await
    }

    /// Re-run recognition on the already-uploaded photo.
    pub async fn retry_recognition(&mut self) -> Result<(), CaptureError> {
        let (image_url, target) = match mem::replace(&mut self.session, Session::Idle) {
            Session::PhotoUploaded { image_url, target } => (image_url, target),
            other => {
                self.session = other;
                return Err(CaptureError::WrongStage {
                    expected: "uploaded photo",
                });
            }
        };
        self.recognize(image_url, target).await
    }

    async fn recognize(
        &mut self,
        image_url: String,
        target: Option<(CategoryId, String)>,
    ) -> Result<(), CaptureError> {
        let recognized = match self.recognition.analyze_image_url(&image_url).await {
            Ok(recognized) => recognized,
            Err(e) => {
                self.session = Session::PhotoUploaded { image_url, target };
                return Err(step_err(CaptureStep::Recognize, e));
            }
        };
        if recognized.is_fallback() {
            tracing::warn!("recognition fell back to a placeholder result");
        }
        let result = recognized.into_inner();

        let draft = CardDraft {
            owner: self.owner.clone(),
            image_url,
            fields: result.fields,
            qa_score: result.qa_score,
            qa_status: Some(result.qa_status),
            category: target,
            voice_note: None,
            captured_at: Utc::now(),
        };
        self.session = Session::VoicePrompt { draft };
        Ok(())
    }

    /// The user declined to record a note; the draft is ready for review.
    pub fn decline_voice(&mut self) -> Result<(), CaptureError> {
        match mem::replace(&mut self.session, Session::Idle) {
            Session::VoicePrompt { draft } => {
                self.session = Session::DraftReady { draft };
                Ok(())
            }
            other => {
                self.session = other;
                Err(CaptureError::WrongStage {
                    expected: "voice prompt",
                })
            }
        }
    }

    /// Upload and transcribe a recorded note, merging it into the draft.
    /// Transcription trouble never fails the capture: the draft proceeds
    /// with a placeholder note instead.
    pub async fn attach_voice(&mut self, clip: AudioClip) -> Result<(), CaptureError> {
        if clip.duration_secs > self.capture.max_voice_note_secs {
            return Err(CaptureError::VoiceTooLong {
                limit_secs: self.capture.max_voice_note_secs,
            });
        }
        if clip.bytes.len() > self.upload.max_audio_bytes {
            return Err(CaptureError::AudioTooLarge {
                limit: self.upload.max_audio_bytes,
            });
        }
        let mut draft = match mem::replace(&mut self.session, Session::Idle) {
            Session::VoicePrompt { draft } => draft,
            other => {
                self.session = other;
                return Err(CaptureError::WrongStage {
                    expected: "voice prompt",
                });
            }
        };

        let path = BlobPath::voice_note();
        let audio_url = match self
            .blobs
            .upload(&path, clip.bytes.clone(), &clip.content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.session = Session::VoicePrompt { draft };
                return Err(step_err(CaptureStep::UploadVoice, e));
            }
        };

        let note = match self
            .recognition
            .transcribe(clip.bytes, "recording.m4a")
            .await
        {
            Ok(Recognized::Genuine(t)) => transcription_note(t, &audio_url, clip.duration_secs),
            Ok(Recognized::Fallback(_)) => {
                VoiceNote::placeholder(audio_url, clip.duration_secs)
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed, attaching placeholder note");
                VoiceNote::placeholder(audio_url, clip.duration_secs)
            }
        };
        draft.voice_note = Some(note);
        self.session = Session::DraftReady { draft };
        Ok(())
    }

    /// Persist the reviewed draft. The sole transition that writes to the
    /// repository, and idempotent: once persisted, calling it again
    /// returns the same card instead of creating another.
    pub fn persist(&mut self) -> Result<Card, CaptureError> {
        let draft = match mem::replace(&mut self.session, Session::Idle) {
            Session::DraftReady { draft } => draft,
            Session::Persisted { card } => {
                let result = card.clone();
                self.session = Session::Persisted { card };
                return Ok(result);
            }
            other => {
                self.session = other;
                return Err(CaptureError::WrongStage {
                    expected: "reviewed draft",
                });
            }
        };

        match self.repository.add_card(draft.to_new_card()) {
            Ok(card) => {
                self.session = Session::Persisted { card: card.clone() };
                Ok(card)
            }
            Err(e) => {
                self.session = Session::DraftReady { draft };
                Err(step_err(CaptureStep::Persist, e))
            }
        }
    }
}

fn transcription_note(t: Transcription, audio_url: &str, clip_duration: f64) -> VoiceNote {
    VoiceNote {
        text: t.text,
        audio_url: audio_url.to_string(),
        language: t.language.unwrap_or_else(|| "und".to_string()),
        duration_secs: t.duration_secs.unwrap_or(clip_duration),
    }
}
