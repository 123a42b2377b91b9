use std::io::Write;

use crate::{Error, Result};
use crate::segments::SubSegment;

/// Writes sub-segments as SubRip (`.srt`) cues.
///
/// Design:
/// - We stream output directly to a `Write` implementation.
/// - The encoder owns the cue counter so numbering stays contiguous from 1
///   across segment boundaries, including when intermediate segments failed
///   and contributed nothing.
pub struct SrtEncoder<W: Write> {
    /// The underlying writer we stream SRT into.
    w: W,

    /// Number assigned to the next cue; SRT numbering starts at 1.
    next_cue: usize,

    /// Whether the encoder has been closed.
    closed: bool,
}

impl<W: Write> SrtEncoder<W> {
    /// Create a new SRT encoder that writes to the provided writer.
    pub fn new(w: W) -> Self {
        Self {
            w,
            next_cue: 1,
            closed: false,
        }
    }

    /// Write a single cue: index line, timing line, text, blank separator.
    pub fn write_cue(&mut self, sub: &SubSegment) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write cue: encoder is already closed"));
        }

        let start = format_timestamp_srt(sub.start);
        let end = format_timestamp_srt(sub.end);

        writeln!(&mut self.w, "{}", self.next_cue)?;
        writeln!(&mut self.w, "{start} --> {end}")?;
        writeln!(&mut self.w, "{}", sub.text.trim())?;
        writeln!(&mut self.w)?;

        self.next_cue += 1;
        Ok(())
    }

    /// Flush the underlying writer. This is idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Format seconds into an SRT timestamp (`HH:MM:SS,mmm`).
///
/// Rounding policy:
/// - We round to the nearest millisecond to reduce drift when converting from `f64`.
pub fn format_timestamp_srt(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(start: f64, end: f64, text: &str) -> SubSegment {
        SubSegment {
            start,
            end,
            text: text.to_string(),
            words: None,
        }
    }

    #[test]
    fn srt_numbers_cues_from_one() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);

        enc.write_cue(&sub(0.0, 1.5, " hello "))?;
        enc.write_cue(&sub(61.2, 62.0, "world"))?;
        enc.close()?;

        let s = std::str::from_utf8(&out)?;
        assert_eq!(
            s,
            "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n\
             2\n00:01:01,200 --> 00:01:02,000\nworld\n\n"
        );
        Ok(())
    }

    #[test]
    fn srt_format_timestamp_zero_pads_and_uses_comma() {
        assert_eq!(format_timestamp_srt(0.0), "00:00:00,000");
        assert_eq!(format_timestamp_srt(65.0), "00:01:05,000");
        assert_eq!(format_timestamp_srt(3661.25), "01:01:01,250");
    }

    #[test]
    fn srt_format_timestamp_rounds_to_nearest_millisecond() {
        assert_eq!(format_timestamp_srt(0.0004), "00:00:00,000");
        assert_eq!(format_timestamp_srt(1.9995), "00:00:02,000");
    }

    #[test]
    fn srt_write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        enc.close()?;
        let err = enc.write_cue(&sub(0.0, 1.0, "nope")).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }

    #[test]
    fn srt_close_is_idempotent() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        enc.close()?;
        enc.close()?;
        assert!(out.is_empty());
        Ok(())
    }
}
