use std::path::PathBuf;

use thiserror::Error;

/// Longscribe's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Longscribe's crate-wide error type.
///
/// The variants mirror the pipeline's failure taxonomy:
/// - [`Error::UnreadableMedia`] is the single fatal planning error; it aborts a run
///   before any artifact is written.
/// - [`Error::ExtractionFailed`] and [`Error::TranscriptionFailed`] are per-segment
///   errors. They are absorbed at the segment-processor boundary and surfaced to the
///   driver only as a failure marker; they never abort a run.
/// - [`Error::CheckpointCorruption`] is always downgraded to "no checkpoint" by the
///   store; it exists so the condition can be logged with context.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not determine media duration for '{path}': {message}")]
    UnreadableMedia { path: PathBuf, message: String },

    #[error("audio extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("checkpoint record unreadable: {message}")]
    CheckpointCorruption { message: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this error is fatal to a whole run.
    ///
    /// Everything other than a planning failure is recoverable at the segment level.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnreadableMedia { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreadable_media_is_fatal() {
        let fatal = Error::UnreadableMedia {
            path: PathBuf::from("a.mp4"),
            message: "no duration line".to_string(),
        };
        assert!(fatal.is_fatal());

        let segment_level = Error::ExtractionFailed {
            message: "ffmpeg exited with status 1".to_string(),
        };
        assert!(!segment_level.is_fatal());
        assert!(
            segment_level
                .to_string()
                .contains("extraction failed")
        );
    }
}
