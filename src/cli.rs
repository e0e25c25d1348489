use std::path::PathBuf;

use crate::client::DEFAULT_SERVER_URL;
use crate::config::Config;
use crate::providers::Provider;
use crate::view::FormOptions;
use clap::Parser;

#[derive(Parser)]
#[command(name = "video-summarizer")]
#[command(version)]
#[command(about = "Summarize YouTube videos from subtitles and keyframes, streamed over WebSocket")]
pub struct Args {
    /// YouTube URL to summarize (client mode)
    pub url: Option<String>,

    /// Run the HTTP/WebSocket server instead of the terminal client
    #[arg(long)]
    pub serve: bool,

    /// Port for the server; replaces the port of the configured bind address
    #[arg(long)]
    pub port: Option<u16>,

    /// WebSocket endpoint the client connects to
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Summary language: ko or en
    #[arg(long, short)]
    pub language: Option<String>,

    /// Target summary length in characters (100, 200, 500, 1000)
    #[arg(long = "length", short = 'n')]
    pub summary_length: Option<u32>,

    /// Custom prompt; replaces language and length
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Path to a TOML config file (defaults to ./video-summarizer.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// LLM backend used by the server
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Model name (e.g. gemini-2.5-pro, gpt-4o-mini, claude-sonnet-4-20250514)
    #[arg(long)]
    pub model: Option<String>,
}

impl Args {
    /// Fold command-line overrides into a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.bind = with_port(&config.bind, port);
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        match &self.model {
            Some(model) => config.model = model.clone(),
            None => config.model = resolve_model(&config.provider, &config.model),
        }
    }

    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            language: self.language.clone(),
            summary_length: self.summary_length,
            prompt: self.prompt.clone(),
        }
    }
}

/// Select the provider's default model when the configured model is still
/// another provider's default (i.e. the user never chose one).
pub fn resolve_model(provider: &Provider, model: &str) -> String {
    let is_some_default = [Provider::Gemini, Provider::Openai, Provider::Anthropic]
        .iter()
        .any(|p| p.default_model() == model);
    if is_some_default {
        provider.default_model().to_string()
    } else {
        model.to_string()
    }
}

fn with_port(bind: &str, port: u16) -> String {
    let host = match bind.rsplit_once(':') {
        Some((host, _)) => host,
        None => bind,
    };
    format!("{}:{}", host, port)
}
