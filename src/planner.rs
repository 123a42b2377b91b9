//! Segment planning.
//!
//! The planner is a pure function from `(total_duration, segment_length)` to an
//! ordered list of segment descriptors. It performs no I/O and must produce the
//! identical plan on every run for the same inputs: resume correctness depends on
//! it, because checkpointed indices are matched positionally against a freshly
//! computed plan.

use crate::{Error, Result};

/// One fixed-duration window of the source media, processed as a unit.
///
/// Descriptors are immutable; they exist only in memory for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDescriptor {
    /// 0-based position within the plan.
    pub index: usize,

    /// Offset of the window start from the beginning of the source, in seconds.
    pub start_offset: f64,

    /// Window length in seconds. Equal to the configured segment length for every
    /// segment except possibly the last, which may be shorter but never zero.
    pub duration: f64,
}

/// Compute the segment plan for a source of `total_duration` seconds.
///
/// The returned descriptors partition `[0, total_duration)` exactly:
/// - `ceil(total_duration / segment_length)` descriptors
/// - consecutive windows are contiguous (`start[i] + duration[i] == start[i+1]`)
/// - durations sum to `total_duration`
///
/// An empty source (`total_duration == 0`) yields an empty plan.
pub fn plan(total_duration: f64, segment_length: f64) -> Result<Vec<SegmentDescriptor>> {
    if !(segment_length > 0.0) {
        return Err(Error::msg(format!(
            "segment length must be positive, got {segment_length}"
        )));
    }
    if !(total_duration >= 0.0) {
        return Err(Error::msg(format!(
            "total duration must be non-negative, got {total_duration}"
        )));
    }

    let count = (total_duration / segment_length).ceil() as usize;
    let mut descriptors = Vec::with_capacity(count);

    for index in 0..count {
        let start_offset = index as f64 * segment_length;
        // The final window is clipped to the end of the source.
        let duration = segment_length.min(total_duration - start_offset);
        descriptors.push(SegmentDescriptor {
            index,
            start_offset,
            duration,
        });
    }

    Ok(descriptors)
}
