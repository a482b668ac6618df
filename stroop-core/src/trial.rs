use crate::phase::Phase;
use crate::stimulus::Stimulus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Observed-key cell written when the response window closed without a key.
pub const NO_RESPONSE: &str = "no response";

/// Reaction-time cell written when the response window closed without a key.
pub const NO_REACTION_TIME: f64 = -1.0;

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialKind {
    Congruent,
    Incongruent,
    Neutral,
}

impl TrialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialKind::Congruent => "congruent",
            TrialKind::Incongruent => "incongruent",
            TrialKind::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for TrialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prepared stimulus-response unit. Built before the session starts and
/// never mutated while it runs.
#[derive(Debug, Clone)]
pub struct Trial<S: Stimulus> {
    pub kind: TrialKind,
    pub text: String,
    pub color: String,
    pub expected_key: char,
    pub stimuli: Vec<S>,
}

impl<S: Stimulus> Trial<S> {
    pub fn new(
        kind: TrialKind,
        text: impl Into<String>,
        color: impl Into<String>,
        expected_key: char,
        stimuli: Vec<S>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            color: color.into(),
            expected_key,
            stimuli,
        }
    }

    pub fn stimulus_labels(&self) -> Vec<&str> {
        self.stimuli.iter().map(Stimulus::label).collect()
    }
}

/// Per-trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Fixation,
    StimulusWait,
    Responded,
    TimedOut,
    Feedback,
    InterTrialWait,
    Done,
}

/// Outcome of the response window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    Key { key: char, reaction_time: Duration },
    NoResponse,
}

impl Response {
    pub fn key(&self) -> Option<char> {
        match self {
            Response::Key { key, .. } => Some(*key),
            Response::NoResponse => None,
        }
    }

    pub fn reaction_time(&self) -> Option<Duration> {
        match self {
            Response::Key { reaction_time, .. } => Some(*reaction_time),
            Response::NoResponse => None,
        }
    }

    /// Reaction time in seconds, `-1` when nothing was pressed.
    pub fn reaction_time_secs(&self) -> f64 {
        self.reaction_time()
            .map_or(NO_REACTION_TIME, |rt| rt.as_secs_f64())
    }

    pub fn observed_key(&self) -> String {
        self.key()
            .map_or_else(|| NO_RESPONSE.to_string(), |k| k.to_string())
    }

    /// A missing response is never correct.
    pub fn is_correct(&self, expected: char) -> bool {
        self.key() == Some(expected)
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub phase: Phase,
    pub kind: TrialKind,
    pub text: String,
    pub color: String,
    pub wait_time: Duration,
    pub response_deadline: Duration,
    pub response: Response,
    pub expected_key: char,
    pub correct: bool,
}

impl TrialResult {
    pub fn new<S: Stimulus>(
        phase: Phase,
        trial: &Trial<S>,
        wait_time: Duration,
        response_deadline: Duration,
        response: Response,
    ) -> Self {
        Self {
            phase,
            kind: trial.kind,
            text: trial.text.clone(),
            color: trial.color.clone(),
            wait_time,
            response_deadline,
            response,
            expected_key: trial.expected_key,
            correct: response.is_correct(trial.expected_key),
        }
    }

    pub fn row(&self) -> TrialRow {
        TrialRow {
            phase: self.phase.as_str(),
            trial_type: self.kind.as_str(),
            text: self.text.clone(),
            color: self.color.clone(),
            wait_time: self.wait_time.as_secs_f64(),
            response_deadline: self.response_deadline.as_secs_f64(),
            reaction_time: self.response.reaction_time_secs(),
            expected_key: self.expected_key.to_string(),
            observed_key: self.response.observed_key(),
            correct: self.correct,
        }
    }
}

/// Flat export row, one column per field of the behavioural table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    pub phase: &'static str,
    pub trial_type: &'static str,
    pub text: String,
    pub color: String,
    pub wait_time: f64,
    pub response_deadline: f64,
    pub reaction_time: f64,
    pub expected_key: String,
    pub observed_key: String,
    pub correct: bool,
}
