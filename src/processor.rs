//! Per-segment processing: extract, transcribe, offset-correct.
//!
//! The processor is the absorption boundary for segment-level errors. Extraction
//! and transcription failures are logged and surfaced to the driver only as
//! [`SegmentOutcome::Failed`]; nothing per-segment ever raises through the run
//! loop. Only planning errors (upstream of this module) are fatal.

use std::path::Path;

use tracing::{debug, warn};

use crate::Result;
use crate::backend::{AudioExtractor, TranscriptionEngine};
use crate::planner::SegmentDescriptor;
use crate::segments::SegmentResult;

/// The explicit outcome of one segment attempt.
///
/// `Failed` is the failure marker: the segment is not recorded as completed, so
/// a future resumed run will retry it.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    Transcribed(SegmentResult),
    Failed,
}

impl SegmentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Processes one segment descriptor at a time through the extractor and engine.
pub struct SegmentProcessor<'a, X, E>
where
    X: AudioExtractor,
    E: TranscriptionEngine,
{
    extractor: &'a X,
    engine: &'a E,

    /// Additional attempts a failed segment gets before it is marked failed.
    max_retries: u32,
}

impl<'a, X, E> SegmentProcessor<'a, X, E>
where
    X: AudioExtractor,
    E: TranscriptionEngine,
{
    pub fn new(extractor: &'a X, engine: &'a E, max_retries: u32) -> Self {
        Self {
            extractor,
            engine,
            max_retries,
        }
    }

    /// Run one segment through extract → transcribe → offset correction.
    ///
    /// Any temporary extracted-audio artifact is owned by the extractor and
    /// released on every exit path; the blob we hold here is an in-memory
    /// buffer dropped when the attempt ends.
    pub fn process(&self, source: &Path, descriptor: &SegmentDescriptor) -> SegmentOutcome {
        let attempts = 1 + self.max_retries;
        for attempt in 1..=attempts {
            match self.attempt(source, descriptor) {
                Ok(result) => return SegmentOutcome::Transcribed(result),
                Err(err) => {
                    warn!(
                        index = descriptor.index,
                        attempt,
                        attempts,
                        error = %err,
                        "segment attempt failed"
                    );
                }
            }
        }

        SegmentOutcome::Failed
    }

    fn attempt(&self, source: &Path, descriptor: &SegmentDescriptor) -> Result<SegmentResult> {
        debug!(
            index = descriptor.index,
            start_offset = descriptor.start_offset,
            duration = descriptor.duration,
            "extracting segment audio"
        );
        let audio =
            self.extractor
                .extract(source, descriptor.start_offset, descriptor.duration)?;

        debug!(index = descriptor.index, bytes = audio.len(), "transcribing segment");
        let output = self.engine.transcribe(&audio)?;

        // Offset correction: engine timestamps are local to the blob. This is
        // the pipeline's central correctness invariant and has no failure mode.
        let mut result = SegmentResult {
            index: descriptor.index,
            text: output.text,
            sub_segments: output.sub_segments,
            language: output.language,
        };
        result.shift_timestamps(descriptor.start_offset);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::backend::EngineOutput;
    use crate::segments::{SubSegment, Word};
    use std::cell::Cell;
    use std::path::PathBuf;

    struct OkExtractor;

    impl AudioExtractor for OkExtractor {
        fn extract(&self, _path: &Path, _start: f64, _duration: f64) -> Result<Vec<u8>> {
            Ok(vec![0u8; 16])
        }
    }

    struct FailingExtractor;

    impl AudioExtractor for FailingExtractor {
        fn extract(&self, _path: &Path, _start: f64, _duration: f64) -> Result<Vec<u8>> {
            Err(Error::ExtractionFailed {
                message: "boom".to_string(),
            })
        }
    }

    struct FixedEngine;

    impl TranscriptionEngine for FixedEngine {
        fn transcribe(&self, _audio: &[u8]) -> Result<EngineOutput> {
            Ok(EngineOutput {
                text: "hello world".to_string(),
                sub_segments: vec![SubSegment {
                    start: 5.0,
                    end: 8.0,
                    text: "hello world".to_string(),
                    words: Some(vec![Word {
                        start: 5.0,
                        end: 6.0,
                        text: "hello".to_string(),
                    }]),
                }],
                language: Some("en".to_string()),
            })
        }
    }

    /// Fails a configurable number of times, then succeeds.
    struct FlakyEngine {
        failures_left: Cell<u32>,
    }

    impl TranscriptionEngine for FlakyEngine {
        fn transcribe(&self, _audio: &[u8]) -> Result<EngineOutput> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(Error::TranscriptionFailed {
                    message: "transient".to_string(),
                });
            }
            Ok(EngineOutput {
                text: "ok".to_string(),
                sub_segments: Vec::new(),
                language: None,
            })
        }
    }

    fn descriptor() -> SegmentDescriptor {
        SegmentDescriptor {
            index: 2,
            start_offset: 60.0,
            duration: 30.0,
        }
    }

    #[test]
    fn success_applies_offset_correction() {
        let extractor = OkExtractor;
        let engine = FixedEngine;
        let processor = SegmentProcessor::new(&extractor, &engine, 0);

        let outcome = processor.process(&PathBuf::from("in.mp4"), &descriptor());
        let SegmentOutcome::Transcribed(result) = outcome else {
            panic!("expected success");
        };

        assert_eq!(result.index, 2);
        assert_eq!(result.sub_segments[0].start, 65.0);
        assert_eq!(result.sub_segments[0].end, 68.0);

        let words = result.sub_segments[0].words.as_ref().unwrap();
        assert_eq!(words[0].start, 65.0);
        assert_eq!(words[0].end, 66.0);
    }

    #[test]
    fn extraction_failure_yields_failure_marker() {
        let extractor = FailingExtractor;
        let engine = FixedEngine;
        let processor = SegmentProcessor::new(&extractor, &engine, 0);

        let outcome = processor.process(&PathBuf::from("in.mp4"), &descriptor());
        assert!(outcome.is_failed());
    }

    #[test]
    fn retries_recover_a_transient_failure() {
        let extractor = OkExtractor;
        let engine = FlakyEngine {
            failures_left: Cell::new(2),
        };
        let processor = SegmentProcessor::new(&extractor, &engine, 2);

        let outcome = processor.process(&PathBuf::from("in.mp4"), &descriptor());
        assert!(!outcome.is_failed());
    }

    #[test]
    fn retries_exhausted_yields_failure_marker() {
        let extractor = OkExtractor;
        let engine = FlakyEngine {
            failures_left: Cell::new(3),
        };
        let processor = SegmentProcessor::new(&extractor, &engine, 1);

        let outcome = processor.process(&PathBuf::from("in.mp4"), &descriptor());
        assert!(outcome.is_failed());
    }
}
