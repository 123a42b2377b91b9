//! Per-segment result cache.
//!
//! Each successful segment's raw result is written to its own JSON file under a
//! `segments/` subdirectory, keyed by segment index. The cache is independent of
//! the checkpoint record so a resumed run can replay completed results without
//! recomputation, and so the combiner never has to hold every result in memory
//! across a long run.
//!
//! Entries are append-only by index: written once on success, never mutated. A
//! fresh (non-resume) run simply overwrites stale entries as it goes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::Result;
use crate::segments::SegmentResult;

const SEGMENTS_DIR: &str = "segments";

/// File-backed cache of [`SegmentResult`]s, scoped to one output directory.
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// A cache rooted at `out_dir/segments`, created on first use.
    pub fn new(out_dir: &Path) -> Self {
        Self {
            dir: out_dir.join(SEGMENTS_DIR),
        }
    }

    /// Directory holding the cache entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("segment_{index:03}.json"))
    }

    /// Persist the result for one segment index.
    ///
    /// Writes go through a temp file + rename so a crash mid-write can never
    /// leave a torn entry behind for a resumed run to trip over.
    pub fn put(&self, result: &SegmentResult) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, result)?;
        tmp.flush()?;
        tmp.persist(self.entry_path(result.index))
            .map_err(|err| crate::Error::msg(format!("failed to persist segment result: {err}")))?;

        Ok(())
    }

    /// Load the cached result for `index`, if present and readable.
    ///
    /// An absent or unreadable entry is logged and returned as `None`; the
    /// driver treats that position as a failure marker rather than aborting.
    pub fn get(&self, index: usize) -> Option<SegmentResult> {
        let path = self.entry_path(index);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(index, path = %path.display(), error = %err, "segment cache entry unreadable");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(index, path = %path.display(), error = %err, "segment cache entry corrupt");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::SubSegment;

    fn result(index: usize) -> SegmentResult {
        SegmentResult {
            index,
            text: format!("segment {index}"),
            sub_segments: vec![SubSegment {
                start: index as f64 * 30.0,
                end: index as f64 * 30.0 + 2.0,
                text: format!("segment {index}"),
                words: None,
            }],
            language: None,
        }
    }

    #[test]
    fn get_absent_entry_is_none() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = ResultCache::new(dir.path());
        assert!(cache.get(0).is_none());
        Ok(())
    }

    #[test]
    fn put_then_get_round_trips() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = ResultCache::new(dir.path());

        cache.put(&result(3))?;
        let loaded = cache.get(3).expect("entry should exist");
        assert_eq!(loaded, result(3));
        Ok(())
    }

    #[test]
    fn entries_are_keyed_independently() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = ResultCache::new(dir.path());

        cache.put(&result(0))?;
        cache.put(&result(2))?;

        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        Ok(())
    }

    #[test]
    fn corrupt_entry_reads_as_none() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = ResultCache::new(dir.path());

        cache.put(&result(1))?;
        fs::write(cache.dir().join("segment_001.json"), b"garbage")?;
        assert!(cache.get(1).is_none());
        Ok(())
    }
}
