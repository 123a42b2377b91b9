//! Ordered result combination.
//!
//! The combiner turns the driver's ordered per-segment results (gaps included)
//! into the three final artifacts: plain text, SRT subtitle track, and a
//! structured JSON record. It is a pure projection, regenerated wholesale on
//! every call; running it twice over the same inputs produces byte-identical
//! output.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::segments::{SegmentResult, SubSegment};
use crate::srt_encoder::SrtEncoder;

/// The structured-record artifact: full text plus the flattened, globally
/// time-stamped sub-segment list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRecord {
    pub text: String,
    pub segments: Vec<SubSegment>,
    pub language: String,
}

/// The three derived artifacts of a run. Never independently mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTranscript {
    pub text: String,
    pub srt: String,
    pub record: TranscriptRecord,
}

/// Where the artifacts of a run were written.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub text: PathBuf,
    pub srt: PathBuf,
    pub json: PathBuf,
}

/// Merge ordered per-segment results into the final transcript.
///
/// Gaps (`None`) contribute nothing: no error marker in the text, no cue in the
/// subtitle track. Cue numbering stays contiguous from 1 regardless of gaps.
/// The language tag comes from the first successful segment that reported one,
/// falling back to `default_language`.
pub fn combine(
    results: &[Option<SegmentResult>],
    default_language: &str,
) -> Result<FinalTranscript> {
    let successes = || results.iter().flatten();

    let text = successes()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut srt_bytes = Vec::new();
    let mut encoder = SrtEncoder::new(&mut srt_bytes);
    for result in successes() {
        for sub in &result.sub_segments {
            encoder.write_cue(sub)?;
        }
    }
    encoder.close()?;
    let srt = String::from_utf8(srt_bytes)
        .map_err(|err| crate::Error::msg(format!("subtitle track is not UTF-8: {err}")))?;

    let segments: Vec<SubSegment> = successes()
        .flat_map(|r| r.sub_segments.iter().cloned())
        .collect();

    let language = successes()
        .find_map(|r| r.language.clone())
        .unwrap_or_else(|| default_language.to_string());

    Ok(FinalTranscript {
        record: TranscriptRecord {
            text: text.clone(),
            segments,
            language,
        },
        text,
        srt,
    })
}

/// Write the three artifacts into `out_dir`, named after the source file stem.
pub fn write_artifacts(
    out_dir: &Path,
    source_stem: &str,
    transcript: &FinalTranscript,
) -> Result<ArtifactPaths> {
    fs::create_dir_all(out_dir)?;

    let paths = ArtifactPaths {
        text: out_dir.join(format!("{source_stem}_transcript.txt")),
        srt: out_dir.join(format!("{source_stem}_subtitles.srt")),
        json: out_dir.join(format!("{source_stem}_data.json")),
    };

    fs::write(&paths.text, &transcript.text)?;
    fs::write(&paths.srt, &transcript.srt)?;
    fs::write(
        &paths.json,
        serde_json::to_vec_pretty(&transcript.record)?,
    )?;

    info!(
        text = %paths.text.display(),
        srt = %paths.srt.display(),
        json = %paths.json.display(),
        "transcript artifacts written"
    );

    Ok(paths)
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

    fn result(index: usize, text: &str, subs: Vec<SubSegment>) -> SegmentResult {
        SegmentResult {
            index,
            text: text.to_string(),
            sub_segments: subs,
            language: None,
        }
    }

    #[test]
    fn combine_joins_text_in_index_order_skipping_gaps() -> anyhow::Result<()> {
        let results = vec![
            Some(result(0, "first part", vec![sub(0.0, 2.0, "first part")])),
            None,
            Some(result(2, "third part", vec![sub(60.0, 62.0, "third part")])),
        ];

        let transcript = combine(&results, "en")?;
        assert_eq!(transcript.text, "first part\nthird part");
        assert!(!transcript.text.contains("second"));
        Ok(())
    }

    #[test]
    fn combine_renumbers_cues_contiguously_across_gaps() -> anyhow::Result<()> {
        let results = vec![
            Some(result(
                0,
                "a b",
                vec![sub(0.0, 1.0, "a"), sub(1.0, 2.0, "b")],
            )),
            None,
            Some(result(2, "c", vec![sub(60.0, 61.0, "c")])),
        ];

        let transcript = combine(&results, "en")?;
        assert!(transcript.srt.starts_with("1\n"));
        assert!(transcript.srt.contains("\n\n2\n"));
        assert!(transcript.srt.contains("\n\n3\n00:01:00,000 --> 00:01:01,000\nc"));
        assert!(!transcript.srt.contains("\n\n4\n"));
        Ok(())
    }

    #[test]
    fn combine_is_byte_idempotent() -> anyhow::Result<()> {
        let results = vec![
            Some(result(0, "x", vec![sub(0.0, 1.5, "x")])),
            Some(result(1, "y", vec![sub(30.0, 31.0, "y")])),
        ];

        let first = combine(&results, "en")?;
        let second = combine(&results, "en")?;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first.record)?,
            serde_json::to_vec(&second.record)?
        );
        Ok(())
    }

    #[test]
    fn combine_takes_language_from_first_success() -> anyhow::Result<()> {
        let mut tagged = result(1, "hola", vec![]);
        tagged.language = Some("es".to_string());

        let results = vec![None, Some(tagged)];
        let transcript = combine(&results, "en")?;
        assert_eq!(transcript.record.language, "es");

        let untagged = vec![Some(result(0, "hi", vec![]))];
        assert_eq!(combine(&untagged, "en")?.record.language, "en");
        Ok(())
    }

    #[test]
    fn combine_all_gaps_yields_empty_artifacts() -> anyhow::Result<()> {
        let results: Vec<Option<SegmentResult>> = vec![None, None];
        let transcript = combine(&results, "en")?;
        assert!(transcript.text.is_empty());
        assert!(transcript.srt.is_empty());
        assert!(transcript.record.segments.is_empty());
        Ok(())
    }

    #[test]
    fn write_artifacts_creates_all_three_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let results = vec![Some(result(0, "hello", vec![sub(0.0, 1.0, "hello")]))];
        let transcript = combine(&results, "en")?;

        let paths = write_artifacts(dir.path(), "lecture", &transcript)?;
        assert_eq!(fs::read_to_string(&paths.text)?, "hello");
        assert!(fs::read_to_string(&paths.srt)?.starts_with("1\n"));

        let record: serde_json::Value = serde_json::from_slice(&fs::read(&paths.json)?)?;
        assert_eq!(record["text"], "hello");
        assert_eq!(record["language"], "en");
        Ok(())
    }
}
