/// Options that control how a pipeline run is performed.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (APIs, tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone)]
pub struct RunOpts {
    /// Length of each segment window in seconds. Must be positive.
    pub segment_length: f64,

    /// Whether to resume from an existing checkpoint in the output directory.
    ///
    /// When disabled, any existing checkpoint is ignored and every segment is
    /// processed from scratch (stale cache entries are overwritten).
    pub resume: bool,

    /// How many additional attempts a failed segment gets before it is marked
    /// failed for the run. `0` means one attempt only; failed segments are then
    /// retried on a future resumed run.
    pub max_retries: u32,

    /// Language tag used in the structured record when no segment reported one.
    pub default_language: String,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            // 30 minutes, matching the historical default for long-form sources.
            segment_length: 1800.0,
            resume: true,
            max_retries: 0,
            default_language: "en".to_string(),
        }
    }
}
