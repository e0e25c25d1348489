use thiserror::Error;

/// Errors raised while serving and processing a summary request.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external tool ran but reported failure.
    #[error("{tool} failed: {detail}")]
    Tool { tool: String, detail: String },

    /// An external tool could not be launched at all.
    #[error("{0} not found; install it or set its path in the config")]
    ToolMissing(String),

    #[error("video is {seconds}s long; the limit is {max}s")]
    VideoTooLong { seconds: u64, max: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A model API answered with a non-success status.
    #[error("{provider} API error: {detail}")]
    Api { provider: String, detail: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SummarizerError {
    /// Map a spawn failure to `ToolMissing` when the binary is absent.
    pub fn spawn(tool: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            SummarizerError::ToolMissing(tool.to_string())
        } else {
            SummarizerError::Io(err)
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SummarizerError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SummarizerError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SummarizerError>;
