use std::path::Path;

use crate::Result;
use crate::segments::SubSegment;

/// What a transcription engine returns for one audio blob.
///
/// Timestamps are *local* to the blob; the segment processor applies offset
/// correction before the output goes anywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    pub sub_segments: Vec<SubSegment>,

    /// Detected language tag, when the engine supports detection.
    pub language: Option<String>,
}

/// Determines the total duration of a source media file.
///
/// Failure here ([`crate::Error::UnreadableMedia`]) is the single fatal condition
/// of a run: without a duration there is no segment plan.
pub trait MediaProber {
    fn probe(&self, path: &Path) -> Result<f64>;
}

/// Extracts one time window of a source file as mono 16kHz PCM WAV bytes.
///
/// Implementations own any temporary artifacts they create and must clean them
/// up on every exit path; the returned blob is a plain in-memory buffer.
pub trait AudioExtractor {
    fn extract(&self, path: &Path, start_seconds: f64, duration_seconds: f64) -> Result<Vec<u8>>;
}

/// Turns an extracted audio blob into text plus time-stamped sub-segments.
///
/// Engines are assumed to hold exclusive, expensive state (model weights,
/// accelerator memory), so the driver never invokes `transcribe` concurrently.
pub trait TranscriptionEngine {
    fn transcribe(&self, audio_wav: &[u8]) -> Result<EngineOutput>;
}
