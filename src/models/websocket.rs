use crate::i18n::Language;
use crate::models::chat::ConversationTurn;
use serde::{ Serialize, Deserialize };

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
        #[serde(default)]
        language: Option<String>,
    },
    #[serde(rename = "set_language")] SetLanguage {
        language: String,
    },
    #[serde(rename = "suggestion")] Suggestion {
        index: usize,
    },
    #[serde(rename = "submit_draft")]
    SubmitDraft,
    #[serde(rename = "history")]
    History,
    #[serde(rename = "voice_start")]
    VoiceStart,
    #[serde(rename = "voice_result")] VoiceResult {
        transcript: String,
    },
    #[serde(rename = "voice_error")] VoiceError {
        message: String,
    },
    #[serde(rename = "voice_stop")]
    VoiceStop,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")] Welcome {
        session_id: String,
        language: Language,
        voice_available: bool,
        suggestions: Vec<String>,
    },
    #[serde(rename = "response")] Response {
        content: String,
        timestamp: i64,
    },
    #[serde(rename = "history")] History {
        turns: Vec<ConversationTurn>,
    },
    #[serde(rename = "draft")] Draft {
        content: String,
    },
    #[serde(rename = "listening")] Listening {
        active: bool,
    },
    #[serde(rename = "navigate")] Navigate {
        url: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}
