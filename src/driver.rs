//! Pipeline orchestration.
//!
//! The driver is the only component with cross-segment state. It plans the run,
//! reconciles the plan against any existing checkpoint, drives the segment
//! processor over the remaining indices strictly in order, persists checkpoint
//! and cache state after every success, and hands the accumulated ordered
//! results to the combiner.
//!
//! Failure policy: segment-level failures are skipped over, not retried within
//! the run (beyond the configured per-segment retry budget) and not fatal — a
//! future resumed run picks them up. The single fatal condition is failing to
//! obtain the source duration, because without it there is no plan.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::Result;
use crate::backend::{AudioExtractor, MediaProber, TranscriptionEngine};
use crate::checkpoint::{CheckpointStore, RunCheckpoint};
use crate::combiner::{self, ArtifactPaths};
use crate::opts::RunOpts;
use crate::planner;
use crate::processor::{SegmentOutcome, SegmentProcessor};
use crate::progress;
use crate::result_cache::ResultCache;
use crate::segments::SegmentResult;

/// What a finished (or cancelled) run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Total number of planned segments.
    pub total_segments: usize,

    /// Segments with a usable result at the end of the run (including results
    /// replayed from the cache on resume).
    pub succeeded: usize,

    /// Whether the run stopped early on the cancellation flag. A cancelled run
    /// writes no final artifacts but leaves all durable state resumable.
    pub cancelled: bool,

    /// Paths of the three final artifacts, when the combiner ran.
    pub artifacts: Option<ArtifactPaths>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total_segments
    }
}

/// In-run state threaded through the driver's calls.
///
/// Kept as an explicit value (rather than fields on the driver) so a run's
/// behavior is a function of `(plan, checkpoint, cache)` plus this.
struct RunState {
    started: Instant,
    attempted_before: usize,
}

/// Orchestrates a full segmented transcription run.
///
/// Generic over the three collaborator traits so tests and alternative
/// frontends can substitute their own probing, extraction, and transcription.
pub struct PipelineDriver<P, X, E>
where
    P: MediaProber,
    X: AudioExtractor,
    E: TranscriptionEngine,
{
    prober: P,
    extractor: X,
    engine: E,
    out_dir: PathBuf,
    opts: RunOpts,
    store: CheckpointStore,
    cache: ResultCache,
}

impl<P, X, E> PipelineDriver<P, X, E>
where
    P: MediaProber,
    X: AudioExtractor,
    E: TranscriptionEngine,
{
    /// Build a driver scoped to `out_dir`, which will hold the checkpoint, the
    /// segment result cache, and the final artifacts.
    pub fn new(prober: P, extractor: X, engine: E, out_dir: &Path, opts: RunOpts) -> Self {
        Self {
            prober,
            extractor,
            engine,
            out_dir: out_dir.to_path_buf(),
            opts,
            store: CheckpointStore::new(out_dir),
            cache: ResultCache::new(out_dir),
        }
    }

    /// Run the pipeline over `source`.
    ///
    /// `cancel` is checked before each segment; once set, the run stops without
    /// combining, and everything already checkpointed remains valid for resume.
    pub fn run(&self, source: &Path, cancel: &AtomicBool) -> Result<RunSummary> {
        fs::create_dir_all(&self.out_dir)?;

        // Planning. This is the single fatal stage: probe errors propagate.
        let total_duration = self.prober.probe(source)?;
        let plan = planner::plan(total_duration, self.opts.segment_length)?;
        let total_segments = plan.len();

        info!(
            source = %source.display(),
            total_duration,
            segment_length = self.opts.segment_length,
            total_segments,
            "planned transcription run"
        );

        let source_len = fs::metadata(source).ok().map(|m| m.len());
        let mut checkpoint = self.resume_checkpoint(total_duration, source_len);

        // A checkpoint may only speak for indices the plan actually contains.
        // Anything past the plan is corruption: drop it, rewrite the repaired
        // record, and carry on.
        let claimed = checkpoint.completed_indices.len();
        checkpoint.completed_indices.retain(|index| *index < total_segments);
        if checkpoint.completed_indices.len() < claimed {
            warn!(
                dropped = claimed - checkpoint.completed_indices.len(),
                total_segments,
                "checkpoint claims segments beyond the plan; dropping them"
            );
            if let Err(err) = self.store.save(&checkpoint) {
                warn!(error = %err, "failed to rewrite repaired checkpoint");
            }
        }

        // Reconcile: completed indices replay from the cache; a missing or
        // unreadable entry becomes a failure-marker gap, never an abort.
        let mut all_results: Vec<Option<SegmentResult>> = plan
            .iter()
            .map(|descriptor| {
                if !checkpoint.completed_indices.contains(&descriptor.index) {
                    return None;
                }
                let cached = self.cache.get(descriptor.index);
                if cached.is_none() {
                    warn!(
                        index = descriptor.index,
                        "checkpoint marks segment complete but cached result is missing; treating as failed"
                    );
                }
                cached
            })
            .collect();

        let state = RunState {
            started: Instant::now(),
            attempted_before: checkpoint.completed_indices.len(),
        };
        let processor =
            SegmentProcessor::new(&self.extractor, &self.engine, self.opts.max_retries);

        for descriptor in &plan {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    next_segment = descriptor.index,
                    "cancellation requested; run left resumable"
                );
                return Ok(RunSummary {
                    total_segments,
                    succeeded: all_results.iter().flatten().count(),
                    cancelled: true,
                    artifacts: None,
                });
            }

            if checkpoint.completed_indices.contains(&descriptor.index) {
                debug!(index = descriptor.index, "segment already completed, skipping");
                continue;
            }

            info!(
                segment = descriptor.index + 1,
                total = total_segments,
                start_offset = descriptor.start_offset,
                "processing segment"
            );

            match processor.process(source, descriptor) {
                SegmentOutcome::Transcribed(result) => {
                    // Cache first, then checkpoint: the checkpoint must never
                    // claim a segment whose result is not durably cached.
                    match self.cache.put(&result) {
                        Ok(()) => {
                            checkpoint.mark_completed(descriptor.index);
                            if let Err(err) = self.store.save(&checkpoint) {
                                warn!(
                                    index = descriptor.index,
                                    error = %err,
                                    "checkpoint save failed; segment will be reprocessed on resume"
                                );
                            }
                        }
                        Err(err) => {
                            warn!(
                                index = descriptor.index,
                                error = %err,
                                "segment result cache write failed; not checkpointing"
                            );
                        }
                    }
                    all_results[descriptor.index] = Some(result);
                }
                SegmentOutcome::Failed => {
                    warn!(
                        index = descriptor.index,
                        "segment failed; continuing (will retry on a resumed run)"
                    );
                }
            }

            self.log_progress(&state, &checkpoint, total_segments);
        }

        // Combine over the full ordered list, gaps included.
        let transcript = combiner::combine(&all_results, &self.opts.default_language)?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcript");
        let artifacts = combiner::write_artifacts(&self.out_dir, stem, &transcript)?;

        let succeeded = all_results.iter().flatten().count();
        info!(
            succeeded,
            total = total_segments,
            elapsed = %progress::format_hms(state.started.elapsed()),
            "transcription run complete"
        );

        Ok(RunSummary {
            total_segments,
            succeeded,
            cancelled: false,
            artifacts: Some(artifacts),
        })
    }

    /// Load and validate the checkpoint for this run, or start fresh.
    fn resume_checkpoint(&self, total_duration: f64, source_len: Option<u64>) -> RunCheckpoint {
        let fresh = || RunCheckpoint::new(total_duration, self.opts.segment_length, source_len);

        if !self.opts.resume {
            debug!("resume disabled; ignoring any existing checkpoint");
            return fresh();
        }

        let Some(checkpoint) = self.store.load() else {
            return fresh();
        };

        if !checkpoint.matches_run(total_duration, self.opts.segment_length, source_len) {
            warn!(
                "checkpoint does not match current source/plan (source changed or segment length differs); starting fresh"
            );
            return fresh();
        }

        info!(
            completed = checkpoint.completed_indices.len(),
            last_segment = ?checkpoint.last_segment,
            "resuming from checkpoint"
        );
        checkpoint
    }

    fn log_progress(&self, state: &RunState, checkpoint: &RunCheckpoint, total: usize) {
        // Percent counts everything durably complete; the ETA extrapolates from
        // this run's own throughput so resumed runs don't skew it.
        let completed_this_run = checkpoint
            .completed_indices
            .len()
            .saturating_sub(state.attempted_before);
        let remaining_at_start = total - state.attempted_before;
        let snapshot = progress::report(completed_this_run, remaining_at_start, state.started.elapsed());

        let overall = progress::report(
            checkpoint.completed_indices.len(),
            total,
            state.started.elapsed(),
        );

        match snapshot.eta {
            Some(eta) => info!(
                percent = format!("{:.1}", overall.percent),
                elapsed = %progress::format_hms(state.started.elapsed()),
                eta = %progress::format_hms(eta),
                "progress"
            ),
            None => info!(
                percent = format!("{:.1}", overall.percent),
                elapsed = %progress::format_hms(state.started.elapsed()),
                eta = "unknown",
                "progress"
            ),
        }
    }
}
