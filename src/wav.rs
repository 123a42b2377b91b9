use std::io::Cursor;

use hound::WavReader;

use crate::{Error, Result};

/// Sample rate the transcription engines expect.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Decode an in-memory WAV blob into normalized mono samples.
///
/// What we return:
/// - A `Vec<f32>` containing mono audio samples normalized to `[-1.0, 1.0]`
///
/// Format requirements:
/// - Mono (1 channel)
/// - 16kHz, 16-bit PCM (what the extractor contract guarantees)
///
/// Why we enforce this:
/// - enforcing constraints here keeps the transcription engines simple and predictable
pub fn samples_from_wav_bytes(wav: &[u8]) -> Result<Vec<f32>> {
    let mut reader = WavReader::new(Cursor::new(wav))
        .map_err(|err| Error::msg(format!("failed to read WAV data: {err}")))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(Error::msg(format!(
            "expected mono WAV (1 channel), got {} channels",
            spec.channels
        )));
    }

    if spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(Error::msg(format!(
            "expected {} Hz sample rate, got {} Hz",
            TARGET_SAMPLE_RATE, spec.sample_rate
        )));
    }

    let mut samples = Vec::new();
    for sample in reader.samples::<i16>() {
        let pcm = sample.map_err(|err| Error::msg(format!("failed to read WAV sample: {err}")))?;
        samples.push(pcm as f32 / i16::MAX as f32);
    }

    Ok(samples)
}
