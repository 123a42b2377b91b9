/// ffmpeg/ffprobe-based media prober and audio extractor.
pub mod ffmpeg;

/// Built-in whisper.cpp transcription engine.
#[cfg(feature = "whisper")]
pub mod whisper;
