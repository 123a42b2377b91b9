//! Built-in transcription engine powered by `whisper-rs` / `whisper.cpp`.
//!
//! The model is loaded once at construction (expensive) and reused for every
//! segment; each `transcribe` call creates a fresh inference state. The engine
//! holds exclusive accelerator/memory state, which is why the driver serializes
//! transcription calls.

use std::os::raw::{c_char, c_void};
use std::sync::Once;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::backend::{EngineOutput, TranscriptionEngine};
use crate::segments::{SubSegment, Word};
use crate::wav::samples_from_wav_bytes;
use crate::{Error, Result};

/// A no-op log callback used to silence logs emitted by whisper.cpp.
unsafe extern "C" fn whisper_log_callback(
    _level: u32,
    _c_msg: *const c_char,
    _user_data: *mut c_void,
) {
    // Intentionally left empty.
}

/// Ensure whisper logging is configured exactly once for the lifetime of the process.
fn init_whisper_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    });
}

/// whisper timestamps are centiseconds; -1 means unknown, clamped to 0.
fn centiseconds_to_seconds(cs: i64) -> f64 {
    cs.max(0) as f64 / 100.0
}

pub struct WhisperEngine {
    ctx: WhisperContext,

    /// Optional language hint (e.g. `"en"`). `None` lets whisper auto-detect.
    language: Option<String>,
}

impl WhisperEngine {
    /// Load a whisper.cpp model from disk and initialize an engine.
    pub fn new(model_path: &str, language: Option<String>) -> Result<Self> {
        init_whisper_logging();

        if model_path.trim().is_empty() {
            return Err(Error::msg("model path must be provided"));
        }

        let ctx_params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(model_path, ctx_params).map_err(|err| {
            Error::msg(format!("failed to load model from path {model_path}: {err}"))
        })?;

        Ok(Self { ctx, language })
    }

    fn build_full_params(&self) -> FullParams<'_, '_> {
        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: 5,
            patience: 1.0,
        });

        params.set_n_threads(num_cpus::get() as i32);
        params.set_translate(false);
        params.set_language(self.language.as_deref());
        params.set_no_context(true);
        params.set_single_segment(false);

        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        params.set_token_timestamps(true);

        params
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn transcribe(&self, audio_wav: &[u8]) -> Result<EngineOutput> {
        let samples = samples_from_wav_bytes(audio_wav)?;
        if samples.is_empty() {
            return Ok(EngineOutput {
                text: String::new(),
                sub_segments: Vec::new(),
                language: self.language.clone(),
            });
        }

        let params = self.build_full_params();

        let mut state = self
            .ctx
            .create_state()
            .map_err(|err| Error::TranscriptionFailed {
                message: format!("failed to create whisper state: {err}"),
            })?;

        state
            .full(params, &samples)
            .map_err(|err| Error::TranscriptionFailed {
                message: format!("whisper inference failed: {err}"),
            })?;

        let mut text = String::new();
        let mut sub_segments = Vec::new();

        for segment in state.as_iter() {
            let segment_text = segment
                .to_str()
                .map_err(|err| Error::TranscriptionFailed {
                    message: format!("failed to read segment text: {err}"),
                })?
                .to_owned();

            let words = words_from_tokens(&segment)?;

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(segment_text.trim());

            sub_segments.push(SubSegment {
                start: centiseconds_to_seconds(segment.start_timestamp()),
                end: centiseconds_to_seconds(segment.end_timestamp()),
                text: segment_text,
                words: if words.is_empty() { None } else { Some(words) },
            });
        }

        Ok(EngineOutput {
            text,
            sub_segments,
            language: self.language.clone(),
        })
    }
}

fn words_from_tokens(segment: &whisper_rs::WhisperSegment) -> Result<Vec<Word>> {
    let token_count = usize::try_from(segment.n_tokens()).unwrap_or(0);
    let mut words = Vec::with_capacity(token_count);

    for token_idx in 0..token_count {
        let token = segment
            .get_token(token_idx as i32)
            .map_err(|err| Error::TranscriptionFailed {
                message: format!("failed to get token {token_idx}: {err}"),
            })?;

        let data = token.token_data();
        let token_text = token
            .to_str()
            .map_err(|err| Error::TranscriptionFailed {
                message: format!("failed to read token text at index {token_idx}: {err}"),
            })?
            .to_owned();

        // Filter whisper special/control tokens (formatted like `[_BEG_]`, `[_TT_50]`).
        if token_text.starts_with("[_") && token_text.ends_with("_]") {
            continue;
        }

        words.push(Word {
            start: centiseconds_to_seconds(data.t0),
            end: centiseconds_to_seconds(data.t1),
            text: token_text,
        });
    }

    Ok(words)
}
