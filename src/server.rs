//! HTTP + WebSocket front door and the per-connection session loop.
//!
//! ## Routes
//! - `GET /`: the embedded page ([`crate::web::INDEX_HTML`])
//! - `GET /health`: plain `ok`
//! - `GET /ws`: WebSocket upgrade, one session per connection
//!
//! ## Session
//! A session accepts `summarize_video` frames and streams [`ServerEvent`]s
//! back. Requests run one at a time per connection: a request that arrives
//! while another is still running is answered with `error` + `done` and
//! otherwise ignored. Closing the socket cancels the running request, which
//! kills any external tool it spawned.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::Result;
use crate::events::{ClientEvent, ServerEvent, SummarizeRequest, SummaryOptions};
use crate::llm::{build_prompt, LlmClient};
use crate::pipeline::VideoProcessor;
use crate::web::INDEX_HTML;

pub const MSG_NO_URL: &str = "No YouTube URL was provided.";
pub const MSG_NOTHING_EXTRACTED: &str = "Failed to extract subtitles or keyframes. Check the video.";
pub const MSG_IN_FLIGHT: &str = "A summary is already in progress on this connection.";
pub const SERVER_ERROR_PREFIX: &str = "Server error: ";

/// Largest request head accepted before routing.
const HEAD_LIMIT: usize = 8192;
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);
const PEEK_RETRY: Duration = Duration::from_millis(10);

/// Everything a request needs, shared by all connections.
pub struct AppState {
    pub config: Config,
    pub processor: VideoProcessor,
    pub llm: LlmClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let llm = LlmClient::from_config(&config)?;
        Ok(AppState {
            processor: VideoProcessor::new(config.clone()),
            llm,
            config,
        })
    }
}

/// Bind `config.bind` and serve until the process stops.
pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    let state = Arc::new(AppState::new(config)?);
    serve_on(listener, state).await
}

/// Accept loop on an already-bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, provider = %state.llm.provider, "video summarizer listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

/// Request line and upgrade flag taken from the head of an HTTP request.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub websocket: bool,
}

/// How far a peeked buffer got towards a complete request head.
#[derive(Debug, PartialEq, Eq)]
enum HeadStatus {
    Complete(RequestHead),
    Partial,
    Invalid,
}

fn head_status(buf: &[u8]) -> HeadStatus {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(buf) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return HeadStatus::Partial,
        Err(_) => return HeadStatus::Invalid,
    }
    let (Some(method), Some(path)) = (req.method, req.path) else {
        return HeadStatus::Invalid;
    };
    let websocket = req.headers.iter().any(|h| {
        h.name.eq_ignore_ascii_case("upgrade")
            && std::str::from_utf8(h.value)
                .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
                .unwrap_or(false)
    });
    HeadStatus::Complete(RequestHead {
        method: method.to_string(),
        path: path.to_string(),
        websocket,
    })
}

/// Parse the head of an HTTP request. Returns `None` until the head is
/// complete or when the bytes are not HTTP at all.
pub fn parse_head(buf: &[u8]) -> Option<RequestHead> {
    match head_status(buf) {
        HeadStatus::Complete(head) => Some(head),
        HeadStatus::Partial | HeadStatus::Invalid => None,
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> Result<()> {
    // Peek so the WebSocket handshake can still read the full request. The
    // head may arrive over several segments, so peek again until it is whole.
    let mut peek_buf = vec![0u8; HEAD_LIMIT];
    let peeked = tokio::time::timeout(HEAD_TIMEOUT, async {
        loop {
            let n = stream.peek(&mut peek_buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            match head_status(&peek_buf[..n]) {
                HeadStatus::Partial if n < peek_buf.len() => {
                    tokio::time::sleep(PEEK_RETRY).await;
                }
                status => return Ok(Some(status)),
            }
        }
    })
    .await;

    let head = match peeked {
        Ok(Ok(None)) => return Ok(()),
        Ok(Ok(Some(HeadStatus::Complete(head)))) => head,
        Ok(Ok(Some(status))) => {
            debug!(?status, "unparseable request head");
            return reject_head(stream).await;
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            debug!("request head timed out");
            return reject_head(stream).await;
        }
    };
    let path = head.path.split('?').next().unwrap_or("/").to_string();

    if head.websocket && path == "/ws" {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        run_session(ws, state).await;
        return Ok(());
    }

    let mut buf = vec![0u8; 8192];
    let _ = stream.read(&mut buf).await?;

    let response = match (head.method.as_str(), path.as_str()) {
        ("GET", "/") => http_response("200 OK", "text/html; charset=utf-8", INDEX_HTML),
        ("GET", "/health") => http_response("200 OK", "text/plain", "ok"),
        _ => http_response("404 Not Found", "text/plain", "Not Found"),
    };
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

async fn reject_head(mut stream: TcpStream) -> Result<()> {
    // Consume what arrived so closing does not reset the connection.
    let mut buf = vec![0u8; HEAD_LIMIT];
    let _ = stream.try_read(&mut buf);
    let response = http_response("400 Bad Request", "text/plain", "Bad Request");
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Drive one WebSocket connection until the peer goes away.
pub async fn run_session<S>(ws: WebSocketStream<S>, state: Arc<AppState>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let session_id = uuid::Uuid::new_v4();
    let span = info_span!("session", %session_id);
    session_loop(ws, state).instrument(span).await;
}

async fn session_loop<S>(ws: WebSocketStream<S>, state: Arc<AppState>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    info!("client connected");
    let (mut ws_sink, mut ws_stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut job: Option<tokio::task::JoinHandle<()>> = None;
    let mut in_flight = false;

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let req = match ClientEvent::decode(&text) {
                            Ok(ClientEvent::SummarizeVideo(req)) => req,
                            Err(e) => {
                                warn!(error = %e, "ignoring frame");
                                continue;
                            }
                        };
                        if in_flight {
                            warn!(url = %req.url, "request rejected: another one is running");
                            let rejected = [ServerEvent::Error(MSG_IN_FLIGHT.to_string()), ServerEvent::Done];
                            if send_events(&mut ws_sink, &rejected).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        in_flight = true;
                        job = Some(tokio::spawn(
                            process_request(Arc::clone(&state), req, tx.clone()).in_current_span(),
                        ));
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            Some(event) = rx.recv() => {
                if event.is_terminal() {
                    in_flight = false;
                }
                if send_events(&mut ws_sink, std::slice::from_ref(&event)).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(handle) = job {
        if !handle.is_finished() {
            info!("client left mid-request; cancelling");
        }
        handle.abort();
    }
    info!("client disconnected");
}

async fn send_events<W>(sink: &mut W, events: &[ServerEvent]) -> std::result::Result<(), ()>
where
    W: futures_util::Sink<WsMessage> + Unpin,
{
    for event in events {
        let json = match event.encode() {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to encode event");
                continue;
            }
        };
        sink.send(WsMessage::Text(json)).await.map_err(|_| ())?;
    }
    Ok(())
}

/// Run one summary request, always finishing with `done`.
pub async fn process_request(
    state: Arc<AppState>,
    req: SummarizeRequest,
    tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("request", %request_id);
    async {
        let Some(opts) = SummaryOptions::from_request(&req) else {
            warn!("request without URL");
            let _ = tx.send(ServerEvent::Error(MSG_NO_URL.to_string()));
            let _ = tx.send(ServerEvent::Done);
            return;
        };

        let _ = tx.send(ServerEvent::Thinking);
        info!(
            url = %opts.url,
            language = %opts.language,
            summary_length = opts.summary_length,
            custom_prompt = opts.prompt.is_some(),
            "summary requested"
        );

        match summarize(&state, &opts, &tx).await {
            Ok(Some(summary)) => {
                info!(chars = summary.chars().count(), "summary finished");
                let _ = tx.send(ServerEvent::FinalResponse(summary));
            }
            Ok(None) => {
                warn!("neither subtitles nor keyframes could be extracted");
                let _ = tx.send(ServerEvent::Error(MSG_NOTHING_EXTRACTED.to_string()));
            }
            Err(e) => {
                error!(error = %e, "summary failed");
                let _ = tx.send(ServerEvent::Error(format!("{}{}", SERVER_ERROR_PREFIX, e)));
            }
        }
        let _ = tx.send(ServerEvent::Done);
    }
    .instrument(span)
    .await
}

/// `Ok(None)` when there was nothing to summarize.
async fn summarize(
    state: &AppState,
    opts: &SummaryOptions,
    tx: &mpsc::UnboundedSender<ServerEvent>,
) -> Result<Option<String>> {
    let extraction = state.processor.process(opts, tx).await?;
    if extraction.is_empty() {
        return Ok(None);
    }
    let prompt = build_prompt(&opts.instruction(), &extraction.subtitles, &extraction.keyframes);
    let summary = state.llm.summarize(&prompt, tx).await?;
    // The work directory (and its keyframes) goes away with `extraction`.
    drop(extraction);
    Ok(Some(summary))
}
