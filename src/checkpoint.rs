//! Durable run checkpoints.
//!
//! One JSON record per output directory tracks which segment indices have
//! completed successfully. The record is rewritten after every successful
//! segment (one record, not a log) and is the sole resume signal.
//!
//! Crash-safety contract: `save` followed by `load` — even when the process
//! dies between successive saves — yields a checkpoint whose completed set is
//! a subset of what was true at the last successful `save`. We get this by
//! writing to a temp file in the same directory and renaming it over the
//! record, so readers never observe a torn file.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::{Error, Result};

const CHECKPOINT_FILE: &str = "checkpoint.json";

/// The durable state of one transcription run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    /// Indices of segments whose results are durably cached.
    pub completed_indices: BTreeSet<usize>,

    /// The most recently attempted segment index, for log context on resume.
    pub last_segment: Option<usize>,

    /// Plan inputs, recorded so a resumed run can verify the plan it recomputes
    /// matches the one this checkpoint was written against.
    pub total_duration: f64,
    pub segment_length: f64,

    /// Size of the source file in bytes when the run started. A mismatch on
    /// resume means the source changed and the cached results are untrustworthy.
    pub source_len: Option<u64>,

    /// Seconds since the Unix epoch at the time of the last save.
    pub saved_at_epoch_secs: u64,
}

impl RunCheckpoint {
    /// A fresh checkpoint for a run with the given plan inputs.
    pub fn new(total_duration: f64, segment_length: f64, source_len: Option<u64>) -> Self {
        Self {
            completed_indices: BTreeSet::new(),
            last_segment: None,
            total_duration,
            segment_length,
            source_len,
            saved_at_epoch_secs: 0,
        }
    }

    /// Whether this checkpoint was written against the same source and plan
    /// inputs as the current run. When this is false the checkpoint must not
    /// be used for resume: indices are matched positionally, so a different
    /// plan or a changed source silently corrupts the combined output.
    pub fn matches_run(
        &self,
        total_duration: f64,
        segment_length: f64,
        source_len: Option<u64>,
    ) -> bool {
        self.total_duration == total_duration
            && self.segment_length == segment_length
            && self.source_len == source_len
    }

    /// Record a completed segment.
    pub fn mark_completed(&mut self, index: usize) {
        self.completed_indices.insert(index);
        self.last_segment = Some(index);
    }
}

/// Persists and reloads the single checkpoint record for an output directory.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// A store scoped to `dir`. The directory must already exist.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CHECKPOINT_FILE),
        }
    }

    /// Path of the checkpoint record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, if one exists.
    ///
    /// A missing file is a normal fresh start. A corrupt file is logged and
    /// treated the same way; it is never fatal.
    pub fn load(&self) -> Option<RunCheckpoint> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "checkpoint unreadable, starting fresh");
                return None;
            }
        };

        match serde_json::from_slice::<RunCheckpoint>(&bytes) {
            Ok(checkpoint) => Some(checkpoint),
            Err(err) => {
                let corruption = Error::CheckpointCorruption {
                    message: err.to_string(),
                };
                warn!(path = %self.path.display(), error = %corruption, "ignoring corrupt checkpoint");
                None
            }
        }
    }

    /// Atomically overwrite the checkpoint record.
    pub fn save(&self, checkpoint: &RunCheckpoint) -> Result<()> {
        let mut stamped = checkpoint.clone();
        stamped.saved_at_epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::msg("checkpoint path has no parent directory"))?;

        // Temp file lives in the target directory so the rename stays on one
        // filesystem and is atomic.
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &stamped)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|err| Error::msg(format!("failed to persist checkpoint: {err}")))?;

        Ok(())
    }
}
