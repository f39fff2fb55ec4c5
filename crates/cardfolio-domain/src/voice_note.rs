//! Voice note annotation attached to a card during capture

use serde::{Deserialize, Serialize};

/// A transcribed spoken note. Attached once, before the card is first
/// persisted; there is no re-recording flow, so the note is immutable
/// afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceNote {
    pub text: String,
    pub audio_url: String,
    /// BCP-47 tag reported by the transcription service, e.g. "en-US".
    pub language: String,
    #[serde(rename = "duration")]
    pub duration_secs: f64,
}

impl VoiceNote {
    /// Placeholder note used when transcription failed but the recording
    /// itself uploaded fine.
    pub fn placeholder(audio_url: String, duration_secs: f64) -> Self {
        Self {
            text: "Voice note recorded".to_string(),
            audio_url,
            language: "und".to_string(),
            duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_keeps_audio_url() {
        let note = VoiceNote::placeholder("https://blobs/voice-notes/1.m4a".into(), 10.0);
        assert_eq!(note.audio_url, "https://blobs/voice-notes/1.m4a");
        assert_eq!(note.language, "und");
        assert!(!note.text.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let note = VoiceNote {
            text: "call back tuesday".into(),
            audio_url: "https://blobs/voice-notes/2.m4a".into(),
            language: "en-US".into(),
            duration_secs: 8.5,
        };
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("audioUrl").is_some());
        assert_eq!(json.get("duration"), Some(&serde_json::json!(8.5)));
    }
}
