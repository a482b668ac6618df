use crate::error::SessionError;
use crate::frontend::{Element, FeedbackKind, Frontend, InfoOutcome, InfoScreen, Keyboard};
use crate::session::SessionState;
use crate::trial::TrialDurations;
use rand::Rng;
use std::time::Duration;
use stroop_core::{KeyMapping, Phase, Response, Trial, TrialResult, TrialState};
use stroop_timing::{Clock, Timer};
use stroop_triggers::TriggerType;

/// Session-wide cancellation latch. Once raised it stays raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbortFlag(bool);

impl AbortFlag {
    pub fn raise(&mut self) {
        self.0 = true;
    }

    pub fn is_raised(&self) -> bool {
        self.0
    }
}

/// Drives single trials through fixation, response window, feedback and
/// inter-trial wait. One trial at a time; nothing here is re-entrant.
pub struct TrialScheduler<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub timer: T,
    pub rng: R,
    pub clock: Clock<T>,
    pub abort: AbortFlag,
    keys: Vec<char>,
    key_labels: String,
    state: Option<TrialState>,
    trial_number: usize,
}

impl<T, R> TrialScheduler<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(mapping: &KeyMapping, timer: T, rng: R) -> Self {
        Self {
            clock: Clock::new(timer.clone()),
            timer,
            rng,
            abort: AbortFlag::default(),
            keys: mapping.keys(),
            key_labels: mapping.labels(),
            state: None,
            trial_number: 0,
        }
    }

    /// State of the trial in flight, `None` between trials.
    pub fn current_state(&self) -> Option<TrialState> {
        self.state
    }

    /// Runs one trial to completion and appends its result to the session.
    ///
    /// On abort the trial is abandoned where it stands: nothing is recorded
    /// for it and no metadata is attached.
    pub fn run_trial<F: Frontend>(
        &mut self,
        session: &mut SessionState<T>,
        phase: Phase,
        trial: &Trial<F::Stimulus>,
        frontend: &mut F,
    ) -> Result<(), SessionError> {
        let durations = session.config.durations(phase);
        let jitter = self.draw_jitter(&durations);
        let trial_id = self.trial_number;
        tracing::info!(
            trial = trial_id,
            %phase,
            kind = %trial.kind,
            text = %trial.text,
            color = %trial.color,
            stimuli = ?trial.stimulus_labels(),
            "trial started"
        );

        if phase.emits_triggers() {
            session.triggers.begin_trial();
        }

        let outcome = self.execute(session, phase, trial, frontend, &durations, jitter);
        self.state = None;
        if outcome.is_err() {
            tracing::warn!(trial = trial_id, "trial abandoned");
        }
        let response = outcome?;

        let result = TrialResult::new(
            phase,
            trial,
            durations.wait + jitter,
            durations.response_window,
            response,
        );
        let correct = result.correct;
        session.results.push(result);

        if phase.emits_triggers() {
            // The outcome is only known now, after the onset pulse went out.
            session.triggers.attach_metadata(
                None,
                [
                    ("acc", serde_json::Value::from(correct)),
                    ("stimulus", serde_json::Value::from(trial.kind.as_str())),
                ],
                0,
            );
        }

        self.trial_number += 1;
        Ok(())
    }

    fn execute<F: Frontend>(
        &mut self,
        session: &mut SessionState<T>,
        phase: Phase,
        trial: &Trial<F::Stimulus>,
        frontend: &mut F,
        durations: &TrialDurations,
        jitter: Duration,
    ) -> Result<Response, SessionError> {
        self.enter(TrialState::Fixation);
        self.show_for(frontend, Element::Fixation, durations.fixation)?;
        self.check_exit(frontend)?;

        self.enter(TrialState::StimulusWait);
        let response = self.response_window(session, phase, trial, frontend, durations)?;
        match response {
            Response::Key { key, reaction_time } => {
                self.enter(TrialState::Responded);
                tracing::info!(
                    key = %key,
                    expected = %trial.expected_key,
                    rt_ms = reaction_time.as_secs_f64() * 1e3,
                    "response recorded"
                );
            }
            Response::NoResponse => {
                self.enter(TrialState::TimedOut);
                tracing::info!(
                    deadline_ms = durations.response_window.as_secs_f64() * 1e3,
                    "no response before deadline"
                );
            }
        }
        self.check_exit(frontend)?;

        if let Some(feedback_time) = durations.feedback {
            self.enter(TrialState::Feedback);
            let kind = FeedbackKind::for_response(&response, trial.expected_key);
            self.show_for(frontend, Element::Feedback(kind), feedback_time)?;
            self.check_exit(frontend)?;
        }

        self.enter(TrialState::InterTrialWait);
        self.timer.sleep(durations.wait);
        self.check_exit(frontend)?;
        if !jitter.is_zero() {
            self.timer.sleep(jitter);
            self.check_exit(frontend)?;
        }

        self.enter(TrialState::Done);
        Ok(response)
    }

    /// Onset pulse, clock reset and stimulus visibility share one flip; then
    /// poll once per frame until a valid key arrives or the deadline passes.
    fn response_window<F: Frontend>(
        &mut self,
        session: &mut SessionState<T>,
        phase: Phase,
        trial: &Trial<F::Stimulus>,
        frontend: &mut F,
        durations: &TrialDurations,
    ) -> Result<Response, SessionError> {
        let emits = phase.emits_triggers();

        frontend.clear_events();
        frontend.set_visible(Element::Stimuli(&trial.stimuli), true)?;
        frontend.set_visible(Element::KeyLabels(&self.key_labels), true)?;
        {
            let triggers = &mut session.triggers;
            let clock = &mut self.clock;
            // Reset first: a hardware pulse blocks for its width.
            frontend.flip_with(&mut || {
                clock.reset();
                if emits {
                    triggers.emit(TriggerType::Stimulus);
                }
            })?;
        }

        let mut response = Response::NoResponse;
        let polled = loop {
            if self.clock.elapsed() >= durations.response_window {
                break Ok(());
            }
            if let Some(key) = frontend.poll_key(&self.keys) {
                let reaction_time = self.clock.elapsed();
                if emits {
                    session.triggers.emit(TriggerType::Answer);
                }
                response = Response::Key { key, reaction_time };
                break Ok(());
            }
            if let Err(err) = self.check_exit(frontend) {
                break Err(err);
            }
            if let Err(err) = frontend.flip() {
                break Err(SessionError::from(err));
            }
        };

        frontend.set_visible(Element::Stimuli(&trial.stimuli), false)?;
        frontend.set_visible(Element::KeyLabels(&self.key_labels), false)?;
        frontend.flip()?;
        polled.map(|()| response)
    }

    /// Blocking display of a fixed-duration element.
    fn show_for<F: Frontend>(
        &mut self,
        frontend: &mut F,
        element: Element<'_, F::Stimulus>,
        duration: Duration,
    ) -> Result<(), SessionError> {
        frontend.set_visible(element, true)?;
        frontend.flip()?;
        self.timer.sleep(duration);
        frontend.set_visible(element, false)?;
        self.check_exit(frontend)?;
        frontend.flip()?;
        Ok(())
    }

    /// Shows a message screen; the abort key there ends the session.
    pub fn show_info<F: Frontend>(
        &mut self,
        frontend: &mut F,
        screen: InfoScreen,
        insert: &str,
    ) -> Result<(), SessionError> {
        tracing::debug!(?screen, "info screen");
        match frontend.show_info(screen, insert)? {
            InfoOutcome::Continue => Ok(()),
            InfoOutcome::Abort => {
                tracing::error!(?screen, "experiment finished by user on info screen");
                self.abort.raise();
                Err(SessionError::Aborted)
            }
        }
    }

    fn check_exit<K: Keyboard>(&mut self, input: &mut K) -> Result<(), SessionError> {
        if input.abort_requested() {
            self.abort.raise();
        }
        if self.abort.is_raised() {
            tracing::error!(state = ?self.state, "experiment finished by user, abort key pressed");
            return Err(SessionError::Aborted);
        }
        Ok(())
    }

    fn draw_jitter(&mut self, durations: &TrialDurations) -> Duration {
        if durations.jitter_bound.is_zero() {
            return Duration::ZERO;
        }
        // random::<f64>() is in [0, 1), so the result stays below the bound.
        durations.jitter_bound.mul_f64(self.rng.random::<f64>())
    }

    fn enter(&mut self, state: TrialState) {
        tracing::debug!(trial = self.trial_number, ?state, "trial state");
        self.state = Some(state);
    }
}
