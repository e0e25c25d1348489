//! Video extraction: duration check, subtitles and keyframes.
//!
//! Every request works inside its own temporary directory under
//! `Config::temp_dir`. The directory lives as long as the returned
//! [`Extraction`], so keyframe paths stay valid until summarization is done
//! and disappear with it.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tempfile::TempDir;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SummarizerError};
use crate::events::{Language, ServerEvent, SummaryOptions};
use crate::subtitles::{truncate_chars, vtt_to_text};

pub const STATUS_CHECKING: &str = "Checking video...";
pub const STATUS_SUBTITLES: &str = "Extracting subtitles...";
pub const STATUS_KEYFRAMES: &str = "Extracting keyframes...";

/// Video format requested for keyframe sampling; 720p keeps downloads small.
const VIDEO_FORMAT: &str = "best[height<=720]";

/// Material extracted from one video.
#[derive(Debug)]
pub struct Extraction {
    pub subtitles: String,
    /// Absolute paths, in frame order.
    pub keyframes: Vec<PathBuf>,
    workdir: TempDir,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty() && self.keyframes.is_empty()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }
}

#[derive(Debug, Clone)]
pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        VideoProcessor { config }
    }

    /// Check the duration, then pull subtitles and keyframes for `opts.url`.
    ///
    /// A failed subtitle or keyframe step is logged and reported as empty so
    /// the other source can still be used. A missing tool or an over-long
    /// video aborts the whole extraction.
    pub async fn process(
        &self,
        opts: &SummaryOptions,
        tx: &mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<Extraction> {
        let workdir = self.create_workdir().await?;
        debug!(dir = %workdir.path().display(), "created work directory");

        let _ = tx.send(ServerEvent::Status(STATUS_CHECKING.to_string()));
        self.check_duration(&opts.url).await?;

        let _ = tx.send(ServerEvent::Status(STATUS_SUBTITLES.to_string()));
        let subtitles = match self
            .extract_subtitles(&opts.url, opts.language, workdir.path())
            .await
        {
            Ok(text) => text,
            Err(e @ SummarizerError::ToolMissing(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "subtitle extraction failed");
                String::new()
            }
        };

        let _ = tx.send(ServerEvent::Status(STATUS_KEYFRAMES.to_string()));
        let keyframes = match self.extract_keyframes(&opts.url, workdir.path()).await {
            Ok(frames) => frames,
            Err(e @ SummarizerError::ToolMissing(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "keyframe extraction failed");
                Vec::new()
            }
        };

        info!(
            subtitle_chars = subtitles.chars().count(),
            keyframes = keyframes.len(),
            "extraction finished"
        );

        Ok(Extraction {
            subtitles,
            keyframes,
            workdir,
        })
    }

    async fn create_workdir(&self) -> Result<TempDir> {
        let parent = std::path::absolute(&self.config.temp_dir)?;
        tokio::fs::create_dir_all(&parent).await?;
        let dir = tempfile::Builder::new().prefix("job-").tempdir_in(&parent)?;
        Ok(dir)
    }

    /// Reject videos longer than `max_video_length`. An unknown duration
    /// (live streams, failed lookup) is let through.
    async fn check_duration(&self, url: &str) -> Result<()> {
        let args = [
            "--skip-download",
            "--no-warnings",
            "--print",
            "duration",
            url,
        ];
        let output = match run_tool(&self.config.ytdlp_bin, &args).await {
            Ok(out) => out,
            Err(e @ SummarizerError::ToolMissing(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "duration lookup failed");
                return Ok(());
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(seconds) = parse_duration(&stdout) {
            debug!(seconds, "video duration");
            if seconds > self.config.max_video_length {
                return Err(SummarizerError::VideoTooLong {
                    seconds,
                    max: self.config.max_video_length,
                });
            }
        }
        Ok(())
    }

    async fn extract_subtitles(&self, url: &str, language: Language, dir: &Path) -> Result<String> {
        let template = dir.join("subtitles");
        let template = template.to_string_lossy();
        let args = [
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            language.code(),
            "--sub-format",
            "vtt",
            "-o",
            &*template,
            url,
        ];
        run_tool(&self.config.ytdlp_bin, &args).await?;

        let Some(path) = find_subtitle_file(dir, language).await? else {
            info!(language = %language, "no subtitles available");
            return Ok(String::new());
        };
        let raw = tokio::fs::read_to_string(&path).await?;
        let text = vtt_to_text(&raw);
        Ok(truncate_chars(&text, self.config.subtitle_max_length).to_string())
    }

    async fn extract_keyframes(&self, url: &str, dir: &Path) -> Result<Vec<PathBuf>> {
        let video = dir.join("video.mp4");
        let video_str = video.to_string_lossy();
        run_tool(
            &self.config.ytdlp_bin,
            &["-f", VIDEO_FORMAT, "-o", &*video_str, url],
        )
        .await?;

        let pattern = dir.join("frame_%d.jpg");
        let filter = format!("fps=1/{}", self.config.keyframe_interval.max(1));
        run_tool(
            &self.config.ffmpeg_bin,
            &[
                "-y",
                "-i",
                &*video_str,
                "-vf",
                filter.as_str(),
                &*pattern.to_string_lossy(),
            ],
        )
        .await?;

        // The video is only needed for sampling.
        let _ = tokio::fs::remove_file(&video).await;

        let frames = list_keyframes(dir, self.config.max_keyframes).await?;
        Ok(frames)
    }
}

/// Run an external tool to completion, failing on a non-zero exit.
pub async fn run_tool(bin: &str, args: &[&str]) -> Result<Output> {
    debug!(tool = bin, ?args, "running");
    let output = tokio::process::Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SummarizerError::spawn(bin, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| output.status.to_string());
        return Err(SummarizerError::Tool {
            tool: bin.to_string(),
            detail,
        });
    }
    Ok(output)
}

/// Parse yt-dlp's `--print duration` output (seconds, possibly fractional).
pub fn parse_duration(stdout: &str) -> Option<u64> {
    let value: f64 = stdout.lines().next()?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

/// Locate the subtitle file yt-dlp wrote, preferring the exact language code
/// over regional variants such as `en-US`.
async fn find_subtitle_file(dir: &Path, language: Language) -> Result<Option<PathBuf>> {
    let exact = dir.join(format!("subtitles.{}.vtt", language.code()));
    if tokio::fs::try_exists(&exact).await? {
        return Ok(Some(exact));
    }
    let mut candidates = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("subtitles.") && name.ends_with(".vtt") {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// `frame_N.jpg` files in `dir`, ordered by N and capped at `limit`.
pub async fn list_keyframes(dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<(u32, PathBuf)> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(index) = frame_index(&name) {
            frames.push((index, entry.path()));
        }
    }
    frames.sort_by_key(|(i, _)| *i);
    Ok(frames.into_iter().take(limit).map(|(_, p)| p).collect())
}

fn frame_index(name: &str) -> Option<u32> {
    name.strip_prefix("frame_")?.strip_suffix(".jpg")?.parse().ok()
}
