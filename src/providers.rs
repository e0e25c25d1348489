use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

pub const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Backend that writes the summary.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local `gemini` CLI, streamed from stdout.
    #[default]
    Gemini,
    Openai,
    Anthropic,
}

impl Provider {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "openai" => Some(Provider::Openai),
            "anthropic" => Some(Provider::Anthropic),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => DEFAULT_GEMINI_MODEL,
            Provider::Openai => DEFAULT_OPENAI_MODEL,
            Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }

    /// Environment variable holding the API key, for HTTP backends.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => None,
            Provider::Openai => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Openai => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

// -- OpenAI SSE types -------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OpenAIChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<OpenAIChatMessage>,
    pub stream: bool,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIDelta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub delta: OpenAIDelta,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChunk {
    pub choices: Vec<OpenAIChoice>,
}

// -- Anthropic SSE types ----------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub stream: bool,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicContentDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub delta: Option<AnthropicContentDelta>,
}

// -- SSE line decoding ------------------------------------------------------

/// Text delta carried by one OpenAI SSE line, if any.
pub fn openai_delta(line: &str) -> Option<String> {
    let json = line.trim().strip_prefix("data: ")?;
    if json == "[DONE]" {
        return None;
    }
    let chunk: OpenAIChunk = serde_json::from_str(json).ok()?;
    chunk.choices.into_iter().next()?.delta.content
}

/// Text delta carried by one Anthropic SSE line, if any.
pub fn anthropic_delta(line: &str) -> Option<String> {
    let json = line.trim().strip_prefix("data: ")?;
    let event: AnthropicStreamEvent = serde_json::from_str(json).ok()?;
    if event.event_type != "content_block_delta" {
        return None;
    }
    event.delta?.text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::Gemini.to_string(), "gemini");
        assert_eq!(Provider::Openai.to_string(), "openai");
        assert_eq!(Provider::Anthropic.to_string(), "anthropic");
    }

    #[test]
    fn test_provider_default_is_gemini() {
        assert_eq!(Provider::default(), Provider::Gemini);
    }

    #[test]
    fn test_provider_from_str_loose() {
        assert_eq!(Provider::from_str_loose(" OpenAI "), Some(Provider::Openai));
        assert_eq!(Provider::from_str_loose("gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str_loose("llama"), None);
    }

    #[test]
    fn test_provider_api_key_vars() {
        assert_eq!(Provider::Gemini.api_key_var(), None);
        assert_eq!(Provider::Openai.api_key_var(), Some("OPENAI_API_KEY"));
        assert_eq!(Provider::Anthropic.api_key_var(), Some("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_openai_delta_extracts_content() {
        let line = r#"data: {"id":"chatcmpl-abc","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        assert_eq!(openai_delta(line).as_deref(), Some("Hi"));
    }

    #[test]
    fn test_openai_delta_done_and_empty() {
        assert_eq!(openai_delta("data: [DONE]"), None);
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(openai_delta(line), None);
        assert_eq!(openai_delta(": keep-alive"), None);
    }

    #[test]
    fn test_anthropic_delta_only_from_content_block_delta() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        assert_eq!(anthropic_delta(line).as_deref(), Some("Hello"));
        let ping = r#"data: {"type":"ping"}"#;
        assert_eq!(anthropic_delta(ping), None);
        let stop = r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#;
        assert_eq!(anthropic_delta(stop), None);
    }

    #[test]
    fn test_anthropic_event_ping() {
        let json = r#"{"type":"ping"}"#;
        let event: AnthropicStreamEvent = serde_json::from_str(json).expect("deser");
        assert_eq!(event.event_type, "ping");
        assert!(event.delta.is_none());
    }

    #[test]
    fn test_openai_request_serializes() {
        let req = OpenAIChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![OpenAIChatMessage { role: "user".into(), content: "hi".into() }],
            stream: true,
            temperature: 0.3,
        };
        let v: serde_json::Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["stream"], true);
        assert_eq!(v["messages"][0]["role"], "user");
    }
}
