use crate::config::ExperimentConfig;
use crate::error::SessionError;
use crate::results::ResultAggregator;
use rand::Rng;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use stroop_timing::Timer;
use stroop_triggers::TriggerChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub age: u32,
    pub sex: Sex,
}

impl Participant {
    /// Identifier used in every output file name: id, sex and age run together.
    pub fn session_id(&self) -> String {
        format!("{}{}{}", self.id, self.sex.as_str(), self.age)
    }
}

/// Everything that lives for the whole session and is flushed at its end.
pub struct SessionState<T: Timer<Timestamp = u64>> {
    pub participant_id: String,
    pub config: ExperimentConfig,
    pub results: ResultAggregator,
    pub triggers: TriggerChannel<T>,
}

impl<T: Timer<Timestamp = u64>> SessionState<T> {
    /// Validates the configuration and connects the trigger line. Both
    /// failures are fatal and happen before any trial runs.
    pub fn new(
        participant_id: impl Into<String>,
        config: ExperimentConfig,
        timer: T,
    ) -> Result<Self, SessionError> {
        let triggers = connect(&config, timer)?;
        Ok(Self::with_channel(participant_id, config, triggers))
    }

    pub fn with_channel(
        participant_id: impl Into<String>,
        config: ExperimentConfig,
        triggers: TriggerChannel<T>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            config,
            results: ResultAggregator::new(),
            triggers,
        }
    }
}

fn connect<T: Timer<Timestamp = u64>>(
    config: &ExperimentConfig,
    timer: T,
) -> Result<TriggerChannel<T>, SessionError> {
    config.validate()?;
    TriggerChannel::connect(&config.trigger_config(), timer).map_err(SessionError::Connection)
}

/// Destination of the two session exports.
pub trait ExportSink {
    /// False when writing under `suffix` would clash with an earlier session.
    fn is_free(&self, _participant_id: &str, _suffix: u16) -> bool {
        true
    }

    fn write_results(
        &mut self,
        participant_id: &str,
        suffix: u16,
        results: &ResultAggregator,
    ) -> Result<(), SessionError>;

    fn write_trigger_map<T: Timer<Timestamp = u64>>(
        &mut self,
        participant_id: &str,
        suffix: u16,
        triggers: &TriggerChannel<T>,
    ) -> Result<(), SessionError>;
}

/// Writes `<id>_beh_<suffix>.csv` and `<id>_triggermap_<suffix>.csv` into a
/// results directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn results_path(&self, participant_id: &str, suffix: u16) -> PathBuf {
        self.dir.join(format!("{participant_id}_beh_{suffix}.csv"))
    }

    pub fn trigger_map_path(&self, participant_id: &str, suffix: u16) -> PathBuf {
        self.dir.join(format!("{participant_id}_triggermap_{suffix}.csv"))
    }
}

impl ExportSink for CsvSink {
    fn is_free(&self, participant_id: &str, suffix: u16) -> bool {
        !self.results_path(participant_id, suffix).exists()
            && !self.trigger_map_path(participant_id, suffix).exists()
    }

    fn write_results(
        &mut self,
        participant_id: &str,
        suffix: u16,
        results: &ResultAggregator,
    ) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SessionError::Results(e.into()))?;
        results
            .export(self.results_path(participant_id, suffix))
            .map_err(SessionError::Results)
    }

    fn write_trigger_map<T: Timer<Timestamp = u64>>(
        &mut self,
        participant_id: &str,
        suffix: u16,
        triggers: &TriggerChannel<T>,
    ) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| SessionError::TriggerMap(e.into()))?;
        triggers
            .export(self.trigger_map_path(participant_id, suffix))
            .map_err(SessionError::TriggerMap)
    }
}

const SUFFIX_RANGE: RangeInclusive<u16> = 100..=999;
const SUFFIX_DRAWS: usize = 32;

/// Flushes both session outputs exactly once.
pub struct SessionFinalizer<K: ExportSink> {
    sink: K,
    suffix: Option<u16>,
}

impl<K: ExportSink> SessionFinalizer<K> {
    pub fn new(sink: K) -> Self {
        Self { sink, suffix: None }
    }

    pub fn is_finalized(&self) -> bool {
        self.suffix.is_some()
    }

    /// Suffix shared by both files, once finalised.
    pub fn suffix(&self) -> Option<u16> {
        self.suffix
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Writes both exports on the first call; later calls do nothing. Both
    /// writes are attempted even if the first one fails.
    pub fn finalize<T: Timer<Timestamp = u64>>(
        &mut self,
        state: &SessionState<T>,
    ) -> Result<(), SessionError> {
        if self.suffix.is_some() {
            return Ok(());
        }
        let suffix = self.pick_suffix(&state.participant_id);
        self.suffix = Some(suffix);
        tracing::info!(
            participant = %state.participant_id,
            suffix,
            trials = state.results.len(),
            triggers = state.triggers.events().len(),
            "finalising session"
        );

        let results = self
            .sink
            .write_results(&state.participant_id, suffix, &state.results);
        let triggers = self
            .sink
            .write_trigger_map(&state.participant_id, suffix, &state.triggers);
        results.and(triggers)
    }

    /// Random three-digit suffix not used by an earlier session of the same
    /// participant. Once those run out, the lowest free number above them.
    fn pick_suffix(&self, participant_id: &str) -> u16 {
        let mut rng = rand::rng();
        for _ in 0..SUFFIX_DRAWS {
            let suffix = rng.random_range(SUFFIX_RANGE);
            if self.sink.is_free(participant_id, suffix) {
                return suffix;
            }
        }
        let first = *SUFFIX_RANGE.start();
        match (first..=u16::MAX).find(|&suffix| self.sink.is_free(participant_id, suffix)) {
            Some(suffix) => suffix,
            None => {
                // Export fails below rather than overwrite.
                tracing::error!(participant = %participant_id, "no free output suffix left");
                rng.random_range(SUFFIX_RANGE)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    Aborted,
}

/// Owns the session state and guarantees finalisation on every exit path:
/// normal completion, abort, fatal error, and unwinding panics (via `Drop`).
pub struct Session<T: Timer<Timestamp = u64>, K: ExportSink> {
    state: SessionState<T>,
    finalizer: SessionFinalizer<K>,
}

impl<T: Timer<Timestamp = u64>, K: ExportSink> Session<T, K> {
    pub fn new(state: SessionState<T>, sink: K) -> Self {
        Self {
            state,
            finalizer: SessionFinalizer::new(sink),
        }
    }

    /// Validates the configuration, connects the trigger line and wraps the
    /// result. When either step fails, the still empty outputs are written
    /// before the error is returned.
    pub fn start(
        participant_id: impl Into<String>,
        config: ExperimentConfig,
        timer: T,
        sink: K,
    ) -> Result<Self, SessionError> {
        let participant_id = participant_id.into();
        match connect(&config, timer.clone()) {
            Ok(triggers) => Ok(Self::new(
                SessionState::with_channel(participant_id, config, triggers),
                sink,
            )),
            Err(err) => {
                tracing::error!(error = %err, "session failed to start");
                let triggers = TriggerChannel::new(timer, config.trigger_config().params);
                let mut session =
                    Self::new(SessionState::with_channel(participant_id, config, triggers), sink);
                if let Err(flush_err) = session.finalize() {
                    tracing::error!(error = %flush_err, "failed to save session outputs");
                }
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &SessionState<T> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState<T> {
        &mut self.state
    }

    pub fn finalizer(&self) -> &SessionFinalizer<K> {
        &self.finalizer
    }

    pub fn finalize(&mut self) -> Result<(), SessionError> {
        self.finalizer.finalize(&self.state)
    }

    /// Runs `body` and finalises afterwards whatever it returned.
    ///
    /// An abort is reported as [`SessionEnd::Aborted`]; any other error is
    /// returned after the outputs have been written.
    pub fn run<F>(&mut self, body: F) -> Result<SessionEnd, SessionError>
    where
        F: FnOnce(&mut SessionState<T>) -> Result<(), SessionError>,
    {
        let outcome = body(&mut self.state);
        let flushed = self.finalize();

        match outcome {
            Ok(()) => flushed.map(|()| SessionEnd::Completed),
            Err(SessionError::Aborted) => {
                tracing::warn!("session aborted, partial results saved");
                flushed.map(|()| SessionEnd::Aborted)
            }
            Err(err) => {
                tracing::error!(error = %err, "session failed");
                if let Err(flush_err) = flushed {
                    tracing::error!(error = %flush_err, "failed to save session outputs");
                }
                Err(err)
            }
        }
    }
}

impl<T: Timer<Timestamp = u64>, K: ExportSink> Drop for Session<T, K> {
    fn drop(&mut self) {
        if self.finalizer.is_finalized() {
            return;
        }
        if let Err(err) = self.finalize() {
            tracing::error!(error = %err, "failed to save session outputs on drop");
        }
    }
}
