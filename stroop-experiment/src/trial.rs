use std::time::Duration;

/// Phase-resolved timing for one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialDurations {
    pub fixation: Duration,
    pub response_window: Duration,
    /// `None` when feedback is switched off.
    pub feedback: Option<Duration>,
    pub wait: Duration,
    /// Upper bound (exclusive) of the extra inter-trial delay; zero disables it.
    pub jitter_bound: Duration,
}
