//! Summary generation with streamed output.
//!
//! Output is forwarded line by line as `partial_response` events whichever
//! backend produces it: the `gemini` CLI already writes lines, the HTTP APIs
//! stream token deltas that are re-assembled into lines first.

use std::path::PathBuf;
use std::process::Stdio;

use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SummarizerError};
use crate::events::ServerEvent;
use crate::providers::*;

pub const STATUS_SUMMARIZING: &str = "AI is summarizing...";

/// Name used in errors for the CLI backend.
const GEMINI_CLI: &str = "Gemini CLI";

/// Compose the model prompt from the instruction and the extracted material.
pub fn build_prompt(instruction: &str, subtitles: &str, keyframes: &[PathBuf]) -> String {
    let mut prompt = instruction.to_string();
    if !subtitles.is_empty() {
        prompt.push_str("\n\nSubtitles:\n");
        prompt.push_str(subtitles);
    }
    if !keyframes.is_empty() {
        prompt.push_str("\n\nKeyframe image files:");
        for (i, frame) in keyframes.iter().enumerate() {
            prompt.push_str(&format!("\nImage {}: {}", i + 1, frame.display()));
        }
    }
    prompt
}

/// Splits a stream of text deltas into complete lines.
#[derive(Debug, Default)]
pub struct LineChunker {
    buffer: String,
}

impl LineChunker {
    /// Feed a delta; returns every line it completed (without the newline).
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut lines = Vec::new();
        while let Some(end) = self.buffer.find('\n') {
            let line = self.buffer[..end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=end);
            lines.push(line);
        }
        lines
    }

    /// Remaining partial line, if any.
    pub fn finish(self) -> Option<String> {
        (!self.buffer.is_empty()).then_some(self.buffer)
    }
}

pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    /// Streaming endpoint for the HTTP providers.
    endpoint: String,
    pub provider: Provider,
    pub model: String,
    pub gemini_bin: String,
}

impl LlmClient {
    /// Build a client for the configured provider. HTTP providers need their
    /// API key in the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = match config.provider.api_key_var() {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                SummarizerError::Config(format!(
                    "{} not set. Export it or pass via environment.",
                    var
                ))
            })?),
            None => None,
        };
        Ok(Self::new(config, api_key))
    }

    pub fn new(config: &Config, api_key: Option<String>) -> Self {
        let endpoint = match config.provider {
            Provider::Gemini => String::new(),
            Provider::Openai => OPENAI_URL.to_string(),
            Provider::Anthropic => ANTHROPIC_URL.to_string(),
        };
        LlmClient {
            client: Client::new(),
            api_key,
            endpoint,
            provider: config.provider,
            model: config.model.clone(),
            gemini_bin: config.gemini_bin.clone(),
        }
    }

    /// Send HTTP provider requests to `url` instead of the public API.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Generate a summary for `prompt`, streaming lines through `tx`.
    /// Returns the full trimmed output.
    pub async fn summarize(
        &self,
        prompt: &str,
        tx: &mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<String> {
        let _ = tx.send(ServerEvent::Status(STATUS_SUMMARIZING.to_string()));
        info!(provider = %self.provider, model = %self.model, prompt_chars = prompt.chars().count(), "summarizing");

        let response = match self.provider {
            Provider::Gemini => self.stream_gemini_cli(prompt, tx).await?,
            Provider::Openai => self.stream_openai(prompt, tx).await?,
            Provider::Anthropic => self.stream_anthropic(prompt, tx).await?,
        };
        Ok(response.trim().to_string())
    }

    // -----------------------------------------------------------------------
    // gemini CLI
    // -----------------------------------------------------------------------

    async fn stream_gemini_cli(
        &self,
        prompt: &str,
        tx: &mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<String> {
        let mut child = tokio::process::Command::new(&self.gemini_bin)
            .args(["-m", self.model.as_str(), "-p", prompt])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SummarizerError::spawn(&self.gemini_bin, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SummarizerError::Protocol("gemini stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SummarizerError::Protocol("gemini stderr not captured".into()))?;

        // Drain stderr concurrently so a chatty CLI cannot block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut response = String::new();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            response.push_str(&line);
            response.push('\n');
            emit_line(tx, &line);
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(SummarizerError::Tool {
                tool: GEMINI_CLI.to_string(),
                detail: if stderr_text.trim().is_empty() {
                    status.to_string()
                } else {
                    stderr_text.trim().to_string()
                },
            });
        }
        debug!(chars = response.len(), "gemini CLI finished");
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // OpenAI streaming
    // -----------------------------------------------------------------------

    async fn stream_openai(
        &self,
        prompt: &str,
        tx: &mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<String> {
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAIChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: true,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(SummarizerError::Api {
                provider: "OpenAI".to_string(),
                detail: error_text,
            });
        }

        forward_sse(response, tx, openai_delta).await
    }

    // -----------------------------------------------------------------------
    // Anthropic streaming
    // -----------------------------------------------------------------------

    async fn stream_anthropic(
        &self,
        prompt: &str,
        tx: &mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 4096,
            stream: true,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(SummarizerError::Api {
                provider: "Anthropic".to_string(),
                detail: error_text,
            });
        }

        forward_sse(response, tx, anthropic_delta).await
    }
}

/// Read an SSE body, decode deltas with `decode`, and emit whole lines.
///
/// Bytes are buffered until a full SSE line is available, so a multibyte
/// character split across network chunks is decoded intact.
async fn forward_sse(
    response: reqwest::Response,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    decode: fn(&str) -> Option<String>,
) -> Result<String> {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunker = LineChunker::default();
    let mut response_text = String::new();

    let mut handle_line = |raw: &[u8], response_text: &mut String| {
        let line = String::from_utf8_lossy(raw);
        if let Some(delta) = decode(line.trim()) {
            response_text.push_str(&delta);
            for complete in chunker.push(&delta) {
                emit_line(tx, &complete);
            }
        }
    };

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=line_end).collect();
            handle_line(&line, &mut response_text);
        }
    }
    if !buffer.is_empty() {
        handle_line(&buffer, &mut response_text);
    }

    if let Some(rest) = chunker.finish() {
        emit_line(tx, &rest);
    }
    Ok(response_text)
}

fn emit_line(tx: &mpsc::UnboundedSender<ServerEvent>, line: &str) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        let _ = tx.send(ServerEvent::PartialResponse(trimmed.to_string()));
    }
}
