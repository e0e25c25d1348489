//! Streaming YouTube video summarizer.
//!
//! A request travels from a form ([`view::SummaryView`], mirrored by the
//! embedded page in [`web`] and driven from a terminal by [`client`]) over a
//! WebSocket to the [`server`]. The server extracts subtitles and keyframes
//! with `yt-dlp` and `ffmpeg` ([`pipeline`]), asks a model to summarize
//! ([`llm`]) and streams [`events::ServerEvent`]s back until `done`.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod subtitles;
pub mod view;
pub mod web;

pub use config::Config;
pub use error::{Result, SummarizerError};
pub use events::{ClientEvent, ServerEvent, SummarizeRequest, SummaryOptions};
pub use view::{FormOptions, SubmitRejected, SummaryView};
