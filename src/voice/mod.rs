//! Voice capture for the assistant.
//!
//! Recognition itself happens elsewhere (usually in the client's browser);
//! this module only tracks the listening state and turns a final transcript
//! into a navigation URL carrying the text in the `voice` query parameter.

use crate::i18n::Language;
use log::{ debug, info, warn };
use url::{ form_urlencoded, Url };

pub const VOICE_PARAM: &str = "voice";
pub const RECOGNITION_LOCALE: &str = "en-IN";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voice capture is not available")]
    Unavailable,
    #[error("voice capture is already active")]
    AlreadyListening,
    #[error("voice capture is not active")]
    NotListening,
    #[error("recognizer failed to start: {0}")]
    Recognizer(String),
}

/// A single-shot speech recogniser: one `start` yields at most one result.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&mut self, locale: &str) -> Result<(), VoiceError>;
    fn stop(&mut self);
}

pub enum SpeechCapability {
    Available(Box<dyn SpeechRecognizer>),
    Unavailable,
}

impl SpeechCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, SpeechCapability::Available(_))
    }
}

/// Recogniser running on the connected client. Starting and stopping only
/// acknowledge; results arrive as client messages.
#[derive(Debug, Default)]
pub struct ClientRecognizer {
    running: bool,
}

impl SpeechRecognizer for ClientRecognizer {
    fn start(&mut self, locale: &str) -> Result<(), VoiceError> {
        debug!("Client recognizer started ({})", locale);
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Inactive,
    Listening,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSubmission {
    pub transcript: String,
    pub language: Language,
    pub url: Url,
}

pub struct VoiceCapture {
    capability: SpeechCapability,
    state: VoiceState,
    assistant_url: Url,
    language: Language,
}

impl VoiceCapture {
    pub fn new(capability: SpeechCapability, assistant_url: Url) -> Self {
        Self {
            capability,
            state: VoiceState::Inactive,
            assistant_url,
            language: Language::En,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    /// `language` is captured now and used for the submission, even if the
    /// preference changes while listening.
    pub fn start(&mut self, language: Language) -> Result<(), VoiceError> {
        let recognizer = match &mut self.capability {
            SpeechCapability::Available(r) => r,
            SpeechCapability::Unavailable => {
                return Err(VoiceError::Unavailable);
            }
        };
        if self.state == VoiceState::Listening {
            return Err(VoiceError::AlreadyListening);
        }
        recognizer.start(RECOGNITION_LOCALE)?;
        self.language = language;
        self.state = VoiceState::Listening;
        info!("Voice capture listening ({})", language);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let SpeechCapability::Available(r) = &mut self.capability {
            r.stop();
        }
        self.state = VoiceState::Inactive;
    }

    pub fn on_result(&mut self, transcript: &str) -> Result<Option<VoiceSubmission>, VoiceError> {
        if self.state != VoiceState::Listening {
            return Err(VoiceError::NotListening);
        }
        self.stop();
        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("Empty transcript, nothing to submit");
            return Ok(None);
        }
        Ok(
            Some(VoiceSubmission {
                transcript: transcript.to_string(),
                language: self.language,
                url: voice_redirect_url(&self.assistant_url, transcript),
            })
        )
    }

    pub fn on_error(&mut self, message: &str) {
        warn!("Voice recognition error: {}", message);
        self.stop();
    }
}

pub fn voice_redirect_url(assistant_url: &Url, transcript: &str) -> Url {
    let mut url = assistant_url.clone();
    url.query_pairs_mut().append_pair(VOICE_PARAM, transcript);
    url
}

/// Reads a query parameter from a raw query string, decoded.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    form_urlencoded
        ::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn voice_query(query: Option<&str>) -> Option<String> {
    query_param(query, VOICE_PARAM).filter(|v| !v.trim().is_empty())
}
