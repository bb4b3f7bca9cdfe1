//! Contracts for the external speech and language services.
//!
//! Both are opaque to the core: audio capture, speech-to-text and LLM prompting live
//! behind these traits. Closures implement [`IntentProvider`], which keeps tests and
//! simple embeddings free of boilerplate.

use super::payload::RawIntentPayload;
use crate::error::Result;
use crate::model::Document;

/// Natural-language understanding service.
pub trait IntentProvider {
    fn interpret(&self, text: &str, document: &Document) -> Result<RawIntentPayload>;
}

impl<F> IntentProvider for F
where
    F: Fn(&str, &Document) -> Result<RawIntentPayload>,
{
    fn interpret(&self, text: &str, document: &Document) -> Result<RawIntentPayload> {
        self(text, document)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub success: bool,
    pub text: String,
}

impl Transcription {
    /// The usable transcript, if the service produced one.
    pub fn usable_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (self.success && !text.is_empty()).then_some(text)
    }
}

/// Speech-to-text service. `Audio` is whatever handle the capture layer produces.
pub trait TranscriptionProvider {
    type Audio;

    fn transcribe(&self, audio: &Self::Audio) -> Result<Transcription>;
}
