//! `longscribe` — resumable, segmented transcription for long media files.
//!
//! This crate turns an arbitrarily long media file into a complete, time-aligned
//! transcript by:
//! - splitting the work into fixed-duration segments
//! - transcribing each segment independently
//! - checkpointing after every completed segment
//! - reassembling the partial results into text, subtitle, and JSON artifacts
//!
//! A run survives interruption (crash, cancellation, power loss) without redoing
//! completed work: the checkpoint plus the per-segment result cache are the
//! resume signal. Segment-level failures are skipped over and retried only on a
//! future resumed run; best-effort output is preferred over all-or-nothing
//! failure.

// High-level API (most consumers should start here).
pub mod driver;
pub mod opts;

// Segment planning and result data structures.
pub mod planner;
pub mod segments;

// Durable run state.
pub mod checkpoint;
pub mod result_cache;

// Per-segment processing and result combination.
pub mod combiner;
pub mod processor;
pub mod progress;
pub mod srt_encoder;

// Collaborator traits and built-in implementations.
pub mod backend;
pub mod backends;

// Audio helpers.
pub mod wav;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use error::{Error, Result};
