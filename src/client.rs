//! Terminal client: drives a [`SummaryView`] over a real WebSocket.

use colored::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

use crate::events::{ClientEvent, ServerEvent};
use crate::view::{FormOptions, Phase, SubmitRejected, SummaryView, CONNECTION_LOST_TEXT, ERROR_LABEL};

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5000/ws";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Rejected(#[from] SubmitRejected),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Submit `url_input` to the server at `server_url` and follow the event
/// stream until `done` or until the server closes the socket.
///
/// `on_event` sees every decoded event together with the view it produced.
/// The URL is validated before any connection is made.
pub async fn run<F>(
    server_url: &str,
    url_input: &str,
    options: &FormOptions,
    mut on_event: F,
) -> Result<SummaryView, ClientError>
where
    F: FnMut(&ServerEvent, &SummaryView),
{
    let mut view = SummaryView::new();
    let request = view.submit(url_input, options)?;
    let frame = ClientEvent::SummarizeVideo(request).encode()?;

    let (mut ws, _) = connect_async(server_url).await?;
    debug!(server = server_url, "connected");
    ws.send(Message::Text(frame)).await?;

    while let Some(msg) = ws.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let event = match ServerEvent::decode(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "ignoring frame");
                continue;
            }
        };
        view.apply(&event);
        on_event(&event, &view);
        if event.is_terminal() {
            break;
        }
    }

    // The stream ended without `done`: fail the request the way the page does.
    if view.phase() == Phase::Waiting {
        let lost = ServerEvent::Error(CONNECTION_LOST_TEXT.to_string());
        view.apply(&lost);
        on_event(&lost, &view);
    }

    let _ = ws.close(None).await;
    Ok(view)
}

/// Terminal rendering of one event, or `None` for events that only change
/// the loading indicator.
pub fn render_event(event: &ServerEvent) -> Option<String> {
    match event {
        ServerEvent::Thinking | ServerEvent::Done => None,
        ServerEvent::Status(message) => Some(format!("{}", message.bright_yellow())),
        ServerEvent::PartialResponse(text) => Some(text.clone()),
        ServerEvent::FinalResponse(summary) => Some(format!(
            "{}\n{}",
            "=".repeat(50).bright_blue(),
            summary.bright_green().bold()
        )),
        ServerEvent::Error(message) => Some(format!(
            "{}{}",
            ERROR_LABEL.bright_red().bold(),
            message.bright_red()
        )),
    }
}

pub fn print_header(server_url: &str, url: &str, options: &FormOptions) {
    println!("{}", "VIDEO SUMMARIZER".bright_cyan().bold());
    println!("{}: {}", "Server".bright_yellow(), server_url);
    println!("{}: {}", "Video".bright_yellow(), url.trim());
    match &options.prompt {
        Some(prompt) => println!("{}: {}", "Prompt".bright_yellow(), prompt),
        None => {
            if let Some(language) = &options.language {
                println!("{}: {}", "Language".bright_yellow(), language);
            }
            if let Some(length) = options.summary_length {
                println!("{}: {}", "Length".bright_yellow(), length);
            }
        }
    }
    println!("{}", "=".repeat(50).bright_blue());
}
