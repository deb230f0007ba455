use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend executable could not be started at all.
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend did not finish within {0:?}")]
    TimedOut(Duration),

    /// The backend ran and reported an error. Holds its stderr.
    #[error("{0}")]
    Failed(String),

    #[error("backend returned unreadable output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

impl BackendError {
    /// YouTube's "confirm you're not a bot" interstitial.
    pub fn is_bot_challenge(&self) -> bool {
        match self {
            Self::Failed(message) => is_bot_challenge_text(message),
            _ => false,
        }
    }

    /// Errors the backend reported about the content itself, as opposed to
    /// problems running the backend.
    pub fn is_content_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Last non-empty line of the backend's error output, which is where
    /// yt-dlp prints its `ERROR:` summary.
    pub fn summary(&self) -> String {
        match self {
            Self::Failed(message) => message
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("unknown error")
                .chars()
                .take(300)
                .collect(),
            other => other.to_string(),
        }
    }

    /// Whether the error text points at a missing ffmpeg/ffprobe.
    pub fn mentions_ffmpeg(&self) -> bool {
        let text = self.to_string().to_lowercase();
        text.contains("ffmpeg") || text.contains("ffprobe")
    }
}

pub const BOT_CHALLENGE_MESSAGE: &str =
    "YouTube asked to verify this request is not from a bot. Please try again later.";
pub const FALLBACK_MESSAGE: &str =
    "Could not fetch video data (may be region locked, deleted, etc).";

/// Substrings of backend error text and the message shown to users for them.
/// First match wins. These track yt-dlp's wording and may need updating when
/// it changes.
const MESSAGE_TABLE: &[(&[&str], &str)] = &[
    (&["Unsupported URL"], "Invalid or unsupported URL."),
    (&["Video unavailable"], "This video is unavailable."),
    (&["Private video"], "Private videos cannot be accessed."),
    (&["confirm your age"], "Age-restricted video."),
    (&["Premiere", "live event"], "Livestreams/Premieres not ready."),
    (
        &["429", "Too Many Requests"],
        "Rate limited by YouTube. Please wait and try again later.",
    ),
    (&["not a bot"], BOT_CHALLENGE_MESSAGE),
];

fn is_bot_challenge_text(text: &str) -> bool {
    text.contains("not a bot")
}

/// Maps raw backend error text to a user-facing message.
pub fn user_message(raw: &str) -> &'static str {
    MESSAGE_TABLE
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| raw.contains(p)))
        .map(|(_, message)| *message)
        .unwrap_or(FALLBACK_MESSAGE)
}
