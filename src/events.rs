//! Event vocabulary exchanged between the page/terminal client and the server.
//!
//! Every frame on the socket is a JSON text message of the form
//! `{"event": <name>, "data": <payload>}`; `data` is omitted for events that
//! carry no payload (`thinking`, `done`).

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the single outbound event.
pub const SUMMARIZE_VIDEO: &str = "summarize_video";

/// Summary lengths (in characters) the server accepts.
pub const ALLOWED_LENGTHS: &[u32] = &[100, 200, 500, 1000];

/// Length used when the request omits one or sends something unsupported.
pub const DEFAULT_LENGTH: u32 = 200;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Payload of `summarize_video`.
///
/// Covers both request shapes: `{url, language, summaryLength}` and
/// `{url, prompt}`. Unset fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default, deserialize_with = "lenient_url")]
    pub url: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub language: Option<String>,
    #[serde(
        rename = "summaryLength",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u32"
    )]
    pub summary_length: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub prompt: Option<String>,
}

/// Events sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SummarizeVideo(SummarizeRequest),
}

impl ClientEvent {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(frame).map_err(DecodeError::from)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events streamed back by the server while a request is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The server accepted the request and started working.
    Thinking,
    /// Human-readable progress message.
    Status(String),
    /// One chunk of streamed model output.
    PartialResponse(String),
    /// The complete summary; replaces everything streamed so far.
    FinalResponse(String),
    Error(String),
    /// Terminal event for a request, sent after success and after errors.
    Done,
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Thinking => "thinking",
            ServerEvent::Status(_) => "status",
            ServerEvent::PartialResponse(_) => "partial_response",
            ServerEvent::FinalResponse(_) => "final_response",
            ServerEvent::Error(_) => "error",
            ServerEvent::Done => "done",
        }
    }

    /// True for the events that end a request on the client side.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Done)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(frame).map_err(DecodeError::from)
    }
}

/// A frame that could not be decoded into a known event.
#[derive(Debug, thiserror::Error)]
#[error("malformed event frame: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

// ---------------------------------------------------------------------------
// Validated options (server side)
// ---------------------------------------------------------------------------

/// Summary language. Anything other than `ko`/`en` falls back to Korean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ko" => Some(Language::Ko),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Code used for subtitle selection (`--sub-langs`).
    pub fn code(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ko => "Korean",
            Language::En => "English",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A request after server-side validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    pub url: String,
    pub language: Language,
    pub summary_length: u32,
    /// Custom instruction; replaces the generated one when set.
    pub prompt: Option<String>,
}

impl SummaryOptions {
    /// Validate a raw request. Returns `None` when the URL is missing or blank;
    /// unsupported language/length values silently fall back to defaults.
    pub fn from_request(req: &SummarizeRequest) -> Option<Self> {
        let url = req.url.trim();
        if url.is_empty() {
            return None;
        }
        let language = req
            .language
            .as_deref()
            .and_then(Language::from_code)
            .unwrap_or_default();
        let summary_length = req
            .summary_length
            .filter(|n| ALLOWED_LENGTHS.contains(n))
            .unwrap_or(DEFAULT_LENGTH);
        let prompt = req
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Some(SummaryOptions {
            url: url.to_string(),
            language,
            summary_length,
            prompt,
        })
    }

    /// Instruction sent to the model ahead of the extracted material.
    pub fn instruction(&self) -> String {
        match &self.prompt {
            Some(p) => p.clone(),
            None => format!(
                "Summarize this video in {} within {} characters, based on the subtitles and keyframe images below.",
                self.language.display_name(),
                self.summary_length
            ),
        }
    }
}

// Browsers send `NaN` lengths as `null` and sometimes strings; treat anything
// that is not a plain non-negative integer as absent instead of failing the frame.
fn lenient_u32<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_u64().and_then(|n| u32::try_from(n).ok()))
}

// A `null` or non-string URL is a missing URL, which the server answers
// with an error instead of dropping the frame.
fn lenient_url<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(de)?.unwrap_or_default())
}

fn lenient_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_str().map(str::to_string))
}
