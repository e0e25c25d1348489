//! Fake `yt-dlp`, `ffmpeg` and `gemini` executables for end-to-end tests.
//!
//! Each fake is a small `sh` script written into a temp dir. They understand
//! just enough of the real command lines to produce the files the pipeline
//! looks for.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use video_summarizer::config::Config;

pub const SUBTITLE_LINE: &str = "hello world";
pub const GEMINI_STDERR: &str = "quota exceeded";

/// What the fake tools should do.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Seconds printed by the duration lookup.
    pub duration: u64,
    pub subtitles: bool,
    pub ffmpeg_fails: bool,
    pub gemini_fails: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            duration: 120,
            subtitles: true,
            ffmpeg_fails: false,
            gemini_fails: false,
        }
    }
}

pub struct FakeTools {
    pub root: TempDir,
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub gemini: PathBuf,
}

impl FakeTools {
    pub fn install(scenario: Scenario) -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        let subs = if scenario.subtitles {
            format!(
                "printf 'WEBVTT\\n\\n00:00:00.000 --> 00:00:02.000\\n<c>{}</c>\\n' > \"$out.$lang.vtt\"",
                SUBTITLE_LINE
            )
        } else {
            ":".to_string()
        };
        let ytdlp = write_script(
            &bin,
            "yt-dlp",
            &format!(
                r#"out=""; lang=""; print=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    --sub-langs) lang="$2"; shift ;;
    --print) print="$2"; shift ;;
    -f|--sub-format) shift ;;
  esac
  shift
done
if [ -n "$print" ]; then echo {duration}; exit 0; fi
if [ -n "$lang" ]; then {subs}; exit 0; fi
: > "$out"
"#,
                duration = scenario.duration,
                subs = subs
            ),
        );

        let ffmpeg = if scenario.ffmpeg_fails {
            write_script(&bin, "ffmpeg", "echo 'ffmpeg boom' >&2\nexit 1\n")
        } else {
            write_script(
                &bin,
                "ffmpeg",
                r#"for a in "$@"; do last="$a"; done
dir=$(dirname "$last")
: > "$dir/frame_1.jpg"
: > "$dir/frame_2.jpg"
"#,
            )
        };

        let prompt_log = root.path().join("prompt.txt");
        let gemini = if scenario.gemini_fails {
            write_script(
                &bin,
                "gemini",
                &format!("echo '{}' >&2\nexit 1\n", GEMINI_STDERR),
            )
        } else {
            write_script(
                &bin,
                "gemini",
                &format!(
                    "printf '%s' \"$4\" > '{}'\nprintf 'Point one\\nPoint two\\n'\n",
                    prompt_log.display()
                ),
            )
        };

        FakeTools {
            root,
            ytdlp,
            ffmpeg,
            gemini,
        }
    }

    /// Config wired to the fake tools, with a private temp dir.
    pub fn config(&self) -> Config {
        Config {
            bind: "127.0.0.1:0".to_string(),
            temp_dir: self.work_dir(),
            log_dir: self.root.path().join("logs"),
            ytdlp_bin: self.ytdlp.to_string_lossy().to_string(),
            ffmpeg_bin: self.ffmpeg.to_string_lossy().to_string(),
            gemini_bin: self.gemini.to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    /// Prompt the fake gemini last received.
    pub fn last_prompt(&self) -> String {
        std::fs::read_to_string(self.root.path().join("prompt.txt")).unwrap_or_default()
    }

    /// Entries left in the work dir.
    pub fn leftover_jobs(&self) -> usize {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
