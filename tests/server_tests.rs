//! End-to-end: real listener, real WebSocket, fake external tools.

#![cfg(unix)]

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeTools, Scenario, GEMINI_STDERR, SUBTITLE_LINE};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use video_summarizer::client;
use video_summarizer::config::Config;
use video_summarizer::events::{ClientEvent, ServerEvent, SummarizeRequest};
use video_summarizer::llm::STATUS_SUMMARIZING;
use video_summarizer::pipeline::{STATUS_CHECKING, STATUS_KEYFRAMES, STATUS_SUBTITLES};
use video_summarizer::server::*;
use video_summarizer::view::{FormOptions, Phase};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new(config).unwrap());
    tokio::spawn(serve_on(listener, state));
    addr
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send_request(ws: &mut Ws, url: &str) {
    let frame = ClientEvent::SummarizeVideo(SummarizeRequest {
        url: url.to_string(),
        ..Default::default()
    })
    .encode()
    .unwrap();
    ws.send(Message::Text(frame)).await.unwrap();
}

/// Read events until `dones` `done` events were seen.
async fn collect(ws: &mut Ws, dones: usize) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    let mut seen = 0;
    tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(msg) = ws.next().await {
            if let Message::Text(text) = msg.unwrap() {
                let event = ServerEvent::decode(&text).unwrap();
                let done = event.is_terminal();
                events.push(event);
                if done {
                    seen += 1;
                    if seen == dones {
                        break;
                    }
                }
            }
        }
    })
    .await
    .expect("timed out waiting for done");
    events
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).to_string()
}

#[tokio::test]
async fn test_full_session_event_sequence() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "https://www.youtube.com/watch?v=abc").await;
    let events = collect(&mut ws, 1).await;

    assert_eq!(
        events,
        vec![
            ServerEvent::Thinking,
            ServerEvent::Status(STATUS_CHECKING.into()),
            ServerEvent::Status(STATUS_SUBTITLES.into()),
            ServerEvent::Status(STATUS_KEYFRAMES.into()),
            ServerEvent::Status(STATUS_SUMMARIZING.into()),
            ServerEvent::PartialResponse("Point one".into()),
            ServerEvent::PartialResponse("Point two".into()),
            ServerEvent::FinalResponse("Point one\nPoint two".into()),
            ServerEvent::Done,
        ]
    );

    let prompt = tools.last_prompt();
    assert!(prompt.starts_with("Summarize this video in Korean within 200 characters"));
    assert!(prompt.contains(SUBTITLE_LINE));
    assert!(prompt.contains("Image 1: "));
    assert!(prompt.contains("Image 2: "));
    assert_eq!(tools.leftover_jobs(), 0);
}

#[tokio::test]
async fn test_session_serves_requests_one_after_another() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    for _ in 0..2 {
        send_request(&mut ws, "https://youtu.be/abc").await;
        let events = collect(&mut ws, 1).await;
        assert_eq!(events.last(), Some(&ServerEvent::Done));
        assert!(events.contains(&ServerEvent::FinalResponse("Point one\nPoint two".into())));
    }
}

#[tokio::test]
async fn test_empty_url_yields_error_then_done() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "   ").await;
    let events = collect(&mut ws, 1).await;
    assert_eq!(
        events,
        vec![ServerEvent::Error(MSG_NO_URL.into()), ServerEvent::Done]
    );
}

#[tokio::test]
async fn test_null_or_numeric_url_yields_error_then_done() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    for url in ["null", "42"] {
        let frame = format!(
            r#"{{"event":"summarize_video","data":{{"url":{},"language":"ko","summaryLength":200}}}}"#,
            url
        );
        ws.send(Message::Text(frame)).await.unwrap();
        let events = collect(&mut ws, 1).await;
        assert_eq!(
            events,
            vec![ServerEvent::Error(MSG_NO_URL.into()), ServerEvent::Done]
        );
    }
}

#[tokio::test]
async fn test_second_request_while_busy_is_rejected() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "https://youtu.be/first").await;
    send_request(&mut ws, "https://youtu.be/second").await;
    let events = collect(&mut ws, 2).await;

    assert!(events.contains(&ServerEvent::Error(MSG_IN_FLIGHT.into())));
    assert_eq!(
        events.iter().filter(|e| **e == ServerEvent::Thinking).count(),
        1
    );
    assert!(events.contains(&ServerEvent::FinalResponse("Point one\nPoint two".into())));
    assert_eq!(events.last(), Some(&ServerEvent::Done));
}

#[tokio::test]
async fn test_too_long_video_reports_server_error() {
    let tools = FakeTools::install(Scenario {
        duration: 9000,
        ..Scenario::default()
    });
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "https://youtu.be/long").await;
    let events = collect(&mut ws, 1).await;
    let n = events.len();
    match &events[n - 2] {
        ServerEvent::Error(msg) => {
            assert!(msg.starts_with(SERVER_ERROR_PREFIX), "{}", msg);
            assert!(msg.contains("9000"), "{}", msg);
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(events[n - 1], ServerEvent::Done);
}

#[tokio::test]
async fn test_nothing_extracted_error() {
    let tools = FakeTools::install(Scenario {
        subtitles: false,
        ffmpeg_fails: true,
        ..Scenario::default()
    });
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "https://youtu.be/abc").await;
    let events = collect(&mut ws, 1).await;
    assert!(events.ends_with(&[
        ServerEvent::Error(MSG_NOTHING_EXTRACTED.into()),
        ServerEvent::Done
    ]));
    assert!(!events.contains(&ServerEvent::Status(STATUS_SUMMARIZING.into())));
}

#[tokio::test]
async fn test_gemini_failure_reports_stderr() {
    let tools = FakeTools::install(Scenario {
        gemini_fails: true,
        ..Scenario::default()
    });
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    send_request(&mut ws, "https://youtu.be/abc").await;
    let events = collect(&mut ws, 1).await;
    assert!(events.ends_with(&[
        ServerEvent::Error(format!("{}Gemini CLI failed: {}", SERVER_ERROR_PREFIX, GEMINI_STDERR)),
        ServerEvent::Done
    ]));
    assert_eq!(tools.leftover_jobs(), 0);
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"event":"other","data":{}}"#.into()))
        .await
        .unwrap();
    send_request(&mut ws, "").await;
    let events = collect(&mut ws, 1).await;
    assert_eq!(
        events,
        vec![ServerEvent::Error(MSG_NO_URL.into()), ServerEvent::Done]
    );
}

#[tokio::test]
async fn test_http_routes() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;

    let index = http_get(addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200 OK"));
    assert!(index.contains("text/html"));
    assert!(index.contains("id=\"summarize-btn\""));

    let health = http_get(addr, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200 OK"));
    assert!(health.ends_with("ok"));

    let missing = http_get(addr, "/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"));
}

#[tokio::test]
async fn test_request_head_split_across_writes() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /he").await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream
        .write_all(b"alth HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf);
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{}", response);
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn test_garbage_request_gets_bad_request() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"\x00\x01 not http\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 400 Bad Request"));
}

#[tokio::test]
async fn test_terminal_client_end_to_end() {
    let tools = FakeTools::install(Scenario::default());
    let addr = start(tools.config()).await;
    let options = FormOptions {
        language: Some("en".into()),
        summary_length: Some(500),
        prompt: None,
    };

    let mut seen = Vec::new();
    let view = client::run(
        &format!("ws://{}/ws", addr),
        "  https://youtu.be/abc  ",
        &options,
        |event, _| seen.push(event.clone()),
    )
    .await
    .unwrap();

    assert_eq!(view.phase(), Phase::Idle);
    assert!(view.submit_enabled());
    assert!(!view.status_visible());
    assert!(!view.loading_visible());
    assert!(!view.status_is_error());
    assert_eq!(view.result(), "Point one\nPoint two");
    assert_eq!(seen.last(), Some(&ServerEvent::Done));
    assert!(tools
        .last_prompt()
        .starts_with("Summarize this video in English within 500 characters"));
}

#[tokio::test]
async fn test_terminal_client_sees_server_error() {
    let tools = FakeTools::install(Scenario {
        gemini_fails: true,
        ..Scenario::default()
    });
    let addr = start(tools.config()).await;

    let view = client::run(
        &format!("ws://{}/ws", addr),
        "https://youtu.be/abc",
        &FormOptions::default(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert!(view.status_is_error());
    assert!(view.submit_enabled());
}
