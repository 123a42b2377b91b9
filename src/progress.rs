//! Progress projection.
//!
//! A pure, stateless function of what the driver passes in. The driver calls it
//! after every segment attempt; nothing here remembers anything between calls.

use std::time::Duration;

/// A snapshot of run progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Percent of segments attempted so far, in `[0, 100]`.
    pub percent: f64,

    /// Estimated time remaining, or `None` until at least one segment has
    /// completed (there is no rate to extrapolate from yet).
    pub eta: Option<Duration>,
}

/// Project completion percentage and ETA from driver state.
pub fn report(completed_count: usize, total_count: usize, elapsed: Duration) -> Progress {
    if total_count == 0 {
        return Progress {
            percent: 100.0,
            eta: Some(Duration::ZERO),
        };
    }

    let percent = completed_count as f64 / total_count as f64 * 100.0;

    let eta = if completed_count > 0 {
        let per_segment = elapsed.as_secs_f64() / completed_count as f64;
        let remaining = (total_count - completed_count) as f64;
        Some(Duration::from_secs_f64(per_segment * remaining))
    } else {
        None
    };

    Progress { percent, eta }
}

/// Render a duration as `H:MM:SS` for log lines.
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_computes_percent_and_eta() {
        let progress = report(2, 4, Duration::from_secs(60));
        assert_eq!(progress.percent, 50.0);
        assert_eq!(progress.eta, Some(Duration::from_secs(60)));
    }

    #[test]
    fn report_has_no_eta_before_first_completion() {
        let progress = report(0, 4, Duration::from_secs(30));
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.eta, None);
    }

    #[test]
    fn report_empty_plan_is_done() {
        let progress = report(0, 0, Duration::ZERO);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(progress.eta, Some(Duration::ZERO));
    }

    #[test]
    fn format_hms_renders_hours_minutes_seconds() {
        assert_eq!(format_hms(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_hms(Duration::from_secs(3725)), "1:02:05");
    }
}
