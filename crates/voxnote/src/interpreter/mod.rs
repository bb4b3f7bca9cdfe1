//! # Command Interpreter
//!
//! Turns one transcript into exactly one [`EditIntent`]. Interpretation never fails:
//! anything that cannot be understood becomes [`EditIntent::Unrecognized`], which the
//! session records as a plain paragraph so the user's speech is never lost.
//!
//! ## Stages
//!
//! ```text
//! transcript ──► local grammar ──match──► intent
//!                    │ no match
//!                    ▼
//!               IntentProvider ──valid payload──► intent
//!                    │ error / timeout / malformed payload
//!                    ▼
//!               Unrecognized { raw_text }
//! ```
//!
//! The grammar ([`grammar`]) is rule-based and instant. The provider is optional and
//! may be slow; a configured timeout discards late answers.
//!
//! Block references become [`BlockSelector`]s, never concrete ids: the document
//! handed in is a snapshot and the executor resolves selectors against the live one.

mod grammar;
pub mod intent;
pub mod payload;
pub mod provider;

use std::time::{Duration, Instant};

pub use intent::{BlockSelector, EditIntent, StyleName, StyleValue, Target, TextRange};
pub use payload::RawIntentPayload;
pub use provider::{IntentProvider, Transcription, TranscriptionProvider};

use crate::config::VoxConfig;
use crate::error::{Result, VoxError};
use crate::model::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterSettings {
    /// Try the built-in grammar before the provider.
    pub local_grammar: bool,
    pub default_page_title: String,
    pub default_page_icon: String,
    /// Provider answers slower than this are discarded.
    pub provider_timeout: Option<Duration>,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            local_grammar: true,
            default_page_title: "Untitled".to_string(),
            default_page_icon: "📄".to_string(),
            provider_timeout: None,
        }
    }
}

impl From<&VoxConfig> for InterpreterSettings {
    fn from(config: &VoxConfig) -> Self {
        Self {
            local_grammar: config.local_grammar,
            default_page_title: config.default_page_title.clone(),
            default_page_icon: config.default_page_icon.clone(),
            provider_timeout: (config.provider_timeout_ms > 0)
                .then(|| Duration::from_millis(config.provider_timeout_ms)),
        }
    }
}

/// Which stage produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    Grammar,
    Provider,
    Fallback,
}

/// An intent plus how it was obtained. `failure` explains a fallback caused by the
/// provider, for an informational notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub intent: EditIntent,
    pub source: IntentSource,
    pub failure: Option<String>,
}

#[derive(Default)]
pub struct CommandInterpreter {
    settings: InterpreterSettings,
    provider: Option<Box<dyn IntentProvider>>,
}

impl CommandInterpreter {
    pub fn new(settings: InterpreterSettings) -> Self {
        Self {
            settings,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: impl IntentProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn settings(&self) -> &InterpreterSettings {
        &self.settings
    }

    pub fn interpret(&self, transcript: &str, document: &Document) -> EditIntent {
        self.interpret_with_source(transcript, document).intent
    }

    pub fn interpret_with_source(&self, transcript: &str, document: &Document) -> Interpretation {
        let text = transcript.trim();
        if text.is_empty() {
            return Interpretation {
                intent: EditIntent::unrecognized(transcript),
                source: IntentSource::Fallback,
                failure: None,
            };
        }

        if self.settings.local_grammar {
            if let Some(intent) = grammar::parse(text, &self.settings) {
                tracing::debug!(intent = intent.name(), "matched local grammar");
                return Interpretation {
                    intent,
                    source: IntentSource::Grammar,
                    failure: None,
                };
            }
        }

        let mut failure = None;
        if let Some(provider) = &self.provider {
            match self.ask_provider(provider.as_ref(), text, document) {
                Ok(intent) => {
                    tracing::debug!(intent = intent.name(), "provider intent accepted");
                    return Interpretation {
                        intent,
                        source: IntentSource::Provider,
                        failure: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "intent provider failed, falling back");
                    failure = Some(e.to_string());
                }
            }
        }

        Interpretation {
            intent: EditIntent::unrecognized(text),
            source: IntentSource::Fallback,
            failure,
        }
    }

    fn ask_provider(
        &self,
        provider: &dyn IntentProvider,
        text: &str,
        document: &Document,
    ) -> Result<EditIntent> {
        let started = Instant::now();
        let payload = provider.interpret(text, document)?;
        let elapsed = started.elapsed();
        if let Some(limit) = self.settings.provider_timeout {
            if elapsed > limit {
                return Err(VoxError::Interpretation(format!(
                    "provider answered after {} ms, limit is {} ms",
                    elapsed.as_millis(),
                    limit.as_millis()
                )));
            }
        }
        payload.normalize(text, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockType;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_blank_transcript_is_unrecognized() {
        let interpreter = CommandInterpreter::default();
        for blank in ["", "   ", "\n\t"] {
            assert!(matches!(
                interpreter.interpret(blank, &Document::new()),
                EditIntent::Unrecognized { .. }
            ));
        }
    }

    #[test]
    fn test_grammar_wins_over_provider() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let interpreter = CommandInterpreter::new(InterpreterSettings::default()).with_provider(
            move |_: &str, _: &Document| -> Result<RawIntentPayload> {
                seen.set(seen.get() + 1);
                Ok(json!({ "intent": "redo" }).into())
            },
        );

        let result = interpreter.interpret_with_source("undo", &Document::new());
        assert_eq!(result.intent, EditIntent::Undo { steps: 1 });
        assert_eq!(result.source, IntentSource::Grammar);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_provider_handles_what_grammar_cannot() {
        let interpreter = CommandInterpreter::default().with_provider(
            |text: &str, _: &Document| -> Result<RawIntentPayload> {
                assert_eq!(text, "jot down that milk is low");
                Ok(json!({
                    "intent": "insertContent",
                    "blocks": [ { "type": "paragraph", "text": "Milk is low" } ]
                })
                .into())
            },
        );

        let result = interpreter.interpret_with_source("jot down that milk is low", &Document::new());
        assert_eq!(result.source, IntentSource::Provider);
        let EditIntent::InsertContent { blocks } = result.intent else {
            panic!("expected insertContent");
        };
        assert_eq!(blocks[0].block_type(), BlockType::Paragraph);
    }

    #[test]
    fn test_provider_errors_fall_back_to_unrecognized() {
        let interpreter = CommandInterpreter::default().with_provider(
            |_: &str, _: &Document| -> Result<RawIntentPayload> {
                Err(VoxError::Interpretation("service unavailable".to_string()))
            },
        );

        let result = interpreter.interpret_with_source("hum a tune", &Document::new());
        assert_eq!(result.intent, EditIntent::unrecognized("hum a tune"));
        assert_eq!(result.source, IntentSource::Fallback);
        assert!(result.failure.unwrap().contains("service unavailable"));
    }

    #[test]
    fn test_malformed_payload_falls_back() {
        let interpreter = CommandInterpreter::default().with_provider(
            |_: &str, _: &Document| -> Result<RawIntentPayload> { Ok(json!({ "nope": true }).into()) },
        );
        assert_eq!(
            interpreter.interpret("hum a tune", &Document::new()),
            EditIntent::unrecognized("hum a tune")
        );
    }

    #[test]
    fn test_slow_provider_is_discarded() {
        let settings = InterpreterSettings {
            provider_timeout: Some(Duration::from_millis(1)),
            ..InterpreterSettings::default()
        };
        let interpreter = CommandInterpreter::new(settings).with_provider(
            |_: &str, _: &Document| -> Result<RawIntentPayload> {
                std::thread::sleep(Duration::from_millis(20));
                Ok(json!({ "intent": "undo" }).into())
            },
        );

        let result = interpreter.interpret_with_source("hum a tune", &Document::new());
        assert_eq!(result.source, IntentSource::Fallback);
        assert!(result.failure.is_some());
    }

    #[test]
    fn test_disabled_grammar_goes_straight_to_provider() {
        let settings = InterpreterSettings {
            local_grammar: false,
            ..InterpreterSettings::default()
        };
        let interpreter = CommandInterpreter::new(settings);
        assert_eq!(
            interpreter.interpret("undo", &Document::new()),
            EditIntent::unrecognized("undo")
        );
    }
}
