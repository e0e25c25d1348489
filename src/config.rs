//! Server configuration: defaults, then an optional TOML file, then
//! environment overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SummarizerError};
use crate::providers::Provider;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "video-summarizer.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP/WebSocket server listens on.
    pub bind: String,
    /// Parent directory for per-request working directories.
    pub temp_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Longest video accepted, in seconds.
    pub max_video_length: u64,
    /// Seconds between extracted keyframes.
    pub keyframe_interval: u64,
    pub max_keyframes: usize,
    /// Subtitle text is cut to this many characters before prompting.
    pub subtitle_max_length: usize,
    pub provider: Provider,
    pub model: String,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub gemini_bin: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:5000".to_string(),
            temp_dir: PathBuf::from("temp"),
            log_dir: PathBuf::from("logs"),
            max_video_length: 7200,
            keyframe_interval: 600,
            max_keyframes: 10,
            subtitle_max_length: 10_000,
            provider: Provider::Gemini,
            model: crate::providers::DEFAULT_GEMINI_MODEL.to_string(),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            gemini_bin: "gemini".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
    /// read when present. Environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SummarizerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| SummarizerError::Config(e.to_string()))
    }

    /// Apply `SUMMARIZER_*` and tool-path overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SUMMARIZER_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("SUMMARIZER_TEMP_DIR") {
            self.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SUMMARIZER_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SUMMARIZER_PROVIDER") {
            self.provider = Provider::from_str_loose(&v)
                .ok_or_else(|| SummarizerError::Config(format!("unknown provider '{}'", v)))?;
        }
        if let Some(v) = lookup("SUMMARIZER_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("YTDLP_BIN") {
            self.ytdlp_bin = v;
        }
        if let Some(v) = lookup("FFMPEG_BIN") {
            self.ffmpeg_bin = v;
        }
        if let Some(v) = lookup("GEMINI_BIN") {
            self.gemini_bin = v;
        }
        Ok(())
    }
}
