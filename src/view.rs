//! Click-to-stream view-controller.
//!
//! `SummaryView` holds the handful of UI flags the page toggles (submit
//! button, status line, loading indicator, result area) and applies inbound
//! [`ServerEvent`]s to them. Rendering is left to the caller: the terminal
//! client prints from it, the embedded page mirrors the same rules in its
//! script.
//!
//! ```text
//! Idle --(submit, URL non-empty)--> Waiting --(thinking|status|partial|final)--> Waiting
//! Waiting --(error|done)--> Idle
//! ```

use crate::events::{SummarizeRequest, ServerEvent};

/// Text of the blocking alert shown when the URL field is empty.
pub const EMPTY_URL_ALERT: &str = "Please enter a YouTube URL.";
/// Label prepended to server-reported errors in the status area.
pub const ERROR_LABEL: &str = "Error: ";
/// Loading text shown once the server reports `thinking`.
pub const THINKING_TEXT: &str = "AI is analyzing...";
/// Loading text shown right after a submit, before the server answers.
pub const SUBMITTED_TEXT: &str = "Request sent...";
/// Error shown by the page when its socket closes mid-request.
pub const CONNECTION_LOST_TEXT: &str = "Connection to the server was lost.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
}

/// Options collected alongside the URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormOptions {
    pub language: Option<String>,
    pub summary_length: Option<u32>,
    pub prompt: Option<String>,
}

/// Why a submit did not produce a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("{}", EMPTY_URL_ALERT)]
    EmptyUrl,
    #[error("a summary request is already in progress")]
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    phase: Phase,
    submit_enabled: bool,
    status_text: String,
    status_visible: bool,
    status_error: bool,
    loading_text: String,
    loading_visible: bool,
    result: String,
}

impl Default for SummaryView {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryView {
    pub fn new() -> Self {
        SummaryView {
            phase: Phase::Idle,
            submit_enabled: true,
            status_text: String::new(),
            status_visible: false,
            status_error: false,
            loading_text: String::new(),
            loading_visible: false,
            result: String::new(),
        }
    }

    /// Handle a click on the summarize control.
    ///
    /// A blank URL leaves the view untouched and yields
    /// [`SubmitRejected::EmptyUrl`]; the caller shows the alert. A submit
    /// while a request is outstanding is refused, so at most one request is
    /// ever in flight regardless of how the submit was triggered.
    pub fn submit(
        &mut self,
        url_input: &str,
        options: &FormOptions,
    ) -> Result<SummarizeRequest, SubmitRejected> {
        if self.phase == Phase::Waiting {
            return Err(SubmitRejected::InFlight);
        }
        let url = url_input.trim();
        if url.is_empty() {
            return Err(SubmitRejected::EmptyUrl);
        }

        self.phase = Phase::Waiting;
        self.submit_enabled = false;
        self.result.clear();
        self.status_visible = false;
        self.loading_text = SUBMITTED_TEXT.to_string();
        self.loading_visible = true;

        Ok(SummarizeRequest {
            url: url.to_string(),
            language: options.language.clone(),
            summary_length: options.summary_length,
            prompt: options.prompt.clone(),
        })
    }

    /// Apply one inbound event.
    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Thinking => {
                self.loading_text = THINKING_TEXT.to_string();
                self.loading_visible = true;
            }
            ServerEvent::Status(message) => {
                self.status_text = message.clone();
                self.status_visible = true;
                self.status_error = false;
                self.loading_visible = false;
            }
            ServerEvent::PartialResponse(text) => {
                self.result.push_str(text);
                self.result.push('\n');
            }
            ServerEvent::FinalResponse(summary) => {
                self.result = summary.clone();
            }
            ServerEvent::Error(message) => {
                self.status_text = format!("{}{}", ERROR_LABEL, message);
                self.status_error = true;
                self.status_visible = true;
                self.loading_visible = false;
                self.submit_enabled = true;
                self.phase = Phase::Idle;
            }
            ServerEvent::Done => {
                self.submit_enabled = true;
                self.loading_visible = false;
                self.status_visible = false;
                self.phase = Phase::Idle;
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn status_visible(&self) -> bool {
        self.status_visible
    }

    pub fn status_is_error(&self) -> bool {
        self.status_error
    }

    pub fn loading_text(&self) -> &str {
        &self.loading_text
    }

    pub fn loading_visible(&self) -> bool {
        self.loading_visible
    }

    pub fn result(&self) -> &str {
        &self.result
    }
}
