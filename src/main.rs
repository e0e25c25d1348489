use std::io::{self, Write};
use std::path::Path;

use clap::Parser;
use colored::*;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use video_summarizer::cli::Args;
use video_summarizer::client::{self, ClientError};
use video_summarizer::config::Config;
use video_summarizer::events::ServerEvent;
use video_summarizer::server;
use video_summarizer::view::SubmitRejected;

const DEFAULT_FILTER: &str = "video_summarizer=info";

/// Server logging: stderr plus a daily rolling `app.log` under `log_dir`.
/// The returned guard flushes the file writer and must outlive the server.
fn init_server_logging(log_dir: &Path) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();
    Ok(guard)
}

/// Client logging stays quiet unless asked for; stdout is for the summary.
fn init_client_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Server mode
    if args.serve {
        let mut config = Config::load(args.config.as_deref())?;
        args.apply_overrides(&mut config);
        let _guard = init_server_logging(&config.log_dir)?;
        info!(
            version = env!("CARGO_PKG_VERSION"),
            bind = %config.bind,
            provider = %config.provider,
            model = %config.model,
            "starting video summarizer"
        );
        server::serve(config).await?;
        return Ok(());
    }

    init_client_logging();
    let url = args.url.clone().unwrap_or_default();
    let options = args.form_options();
    if !url.trim().is_empty() {
        client::print_header(&args.server, &url, &options);
    }

    let result = client::run(&args.server, &url, &options, |event, view| {
        if let Some(line) = client::render_event(event) {
            println!("{}", line);
        } else if matches!(event, ServerEvent::Thinking) {
            println!("{}", view.loading_text().dimmed());
        }
        let _ = io::stdout().flush();
    })
    .await;

    match result {
        Ok(view) if view.status_is_error() => std::process::exit(1),
        Ok(_) => Ok(()),
        Err(ClientError::Rejected(SubmitRejected::EmptyUrl)) => {
            eprintln!("{}", SubmitRejected::EmptyUrl.to_string().bright_red());
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
