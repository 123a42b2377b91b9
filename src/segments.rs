//! Transcription result types and timestamp offset correction.
//!
//! The transcription engine produces timestamps relative to the audio blob it was
//! given. Before a result leaves the segment processor, every timestamp is shifted
//! by the owning segment's start offset:
//!
//! ```text
//! global = local + segment.start_offset
//! ```
//!
//! This applies uniformly to sub-segment `start`/`end` and to nested word
//! timestamps. Skipping it would leave the final subtitle timeline permanently
//! wrong, so the shift lives on the types themselves and is pure arithmetic with
//! no failure mode.

use serde::{Deserialize, Serialize};

/// A single word with timing, when the engine provides word-level timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A time-stamped unit of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,

    /// Word-level timestamps, when the engine produced them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl SubSegment {
    /// Shift this sub-segment (and its words) forward by `offset` seconds.
    pub fn shift(&mut self, offset: f64) {
        self.start += offset;
        self.end += offset;
        if let Some(words) = &mut self.words {
            for word in words {
                word.start += offset;
                word.end += offset;
            }
        }
    }
}

/// The transcription of one segment, with timeline-global timestamps.
///
/// Written once to the result cache on success and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub index: usize,
    pub text: String,
    pub sub_segments: Vec<SubSegment>,

    /// Language tag reported by the engine, when detection is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SegmentResult {
    /// Apply offset correction to every sub-segment in place.
    pub fn shift_timestamps(&mut self, offset: f64) {
        for sub in &mut self.sub_segments {
            sub.shift(offset);
        }
    }
}
