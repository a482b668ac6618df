#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use stroop_core::{KeyMapping, Stimulus, Trial, TrialKind, TrialResult};
use stroop_experiment::{
    Display, Element, ExperimentConfig, ExportSink, InfoOutcome, InfoScreen, Keyboard,
    ResultAggregator, SessionError, SessionState,
};
use stroop_timing::{ManualTimer, Timer};
use stroop_triggers::{TriggerChannel, TriggerEvent};

pub const FRAME: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct Word(pub String);

impl Stimulus for Word {
    fn label(&self) -> &str {
        &self.0
    }
}

pub fn mapping() -> KeyMapping {
    KeyMapping::assign(["red", "green", "blue", "yellow"]).unwrap()
}

pub fn trial(kind: TrialKind, text: &str, color: &str) -> Trial<Word> {
    let key = mapping().key_for(color).unwrap();
    Trial::new(kind, text, color, key, vec![Word(text.to_string())])
}

pub fn config() -> ExperimentConfig {
    ExperimentConfig {
        fix_time: 0.5,
        training_resp_time: 3.0,
        experiment_resp_time: 2.0,
        training_wait_time: 1.0,
        experiment_wait_time: 1.0,
        jitter: 0.0,
        number_of_blocks: 1,
        feedback: true,
        feedback_time: 0.5,
        ..ExperimentConfig::default()
    }
}

pub fn session(config: ExperimentConfig, timer: &ManualTimer) -> SessionState<ManualTimer> {
    SessionState::new("P1MALE20", config, timer.clone()).unwrap()
}

/// What the participant does in one response window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    Press { after: Duration, key: char },
    Silent,
    AbortAfter(Duration),
}

/// Frontend with a 100 Hz virtual display and a scripted participant. Each
/// stimulus onset consumes the next script entry.
pub struct ScriptedFrontend {
    pub timer: ManualTimer,
    pub scripts: Vec<Script>,
    pub onsets: Vec<u64>,
    pub log: Vec<String>,
    pub info_screens: Vec<InfoScreen>,
    pub abort_on_info: Option<InfoScreen>,
    current: Option<Script>,
    buffered: Option<char>,
}

impl ScriptedFrontend {
    pub fn new(timer: &ManualTimer, scripts: Vec<Script>) -> Self {
        Self {
            timer: timer.clone(),
            scripts,
            onsets: Vec::new(),
            log: Vec::new(),
            info_screens: Vec::new(),
            abort_on_info: None,
            current: None,
            buffered: None,
        }
    }

    fn since_onset(&self) -> Option<Duration> {
        self.onsets.last().map(|&t| self.timer.elapsed(t))
    }
}

impl Display for ScriptedFrontend {
    type Stimulus = Word;

    fn set_visible(&mut self, element: Element<'_, Word>, visible: bool) -> io::Result<()> {
        let verb = if visible { "show" } else { "hide" };
        let what = match element {
            Element::Fixation => "fixation".to_string(),
            Element::Stimuli(words) => format!("stimuli {}", words[0].label()),
            Element::KeyLabels(_) => "labels".to_string(),
            Element::Feedback(kind) => format!("feedback {kind:?}"),
        };
        self.log.push(format!("{verb} {what}"));
        Ok(())
    }

    fn flip_with(&mut self, on_flip: &mut dyn FnMut()) -> io::Result<()> {
        self.timer.advance(FRAME);
        self.onsets.push(self.timer.now());
        self.current = self.scripts.get(self.onsets.len() - 1).copied();
        on_flip();
        Ok(())
    }

    fn flip(&mut self) -> io::Result<()> {
        self.timer.advance(FRAME);
        Ok(())
    }

    fn show_info(&mut self, screen: InfoScreen, _insert: &str) -> io::Result<InfoOutcome> {
        self.info_screens.push(screen);
        if self.abort_on_info == Some(screen) {
            return Ok(InfoOutcome::Abort);
        }
        Ok(InfoOutcome::Continue)
    }
}

impl Keyboard for ScriptedFrontend {
    fn clear_events(&mut self) {
        self.buffered = None;
    }

    fn poll_key(&mut self, valid: &[char]) -> Option<char> {
        if let (Some(Script::Press { after, key }), Some(elapsed)) =
            (self.current, self.since_onset())
        {
            if elapsed >= after && valid.contains(&key) {
                self.current = None;
                self.buffered = Some(key);
            }
        }
        self.buffered.take()
    }

    fn abort_requested(&mut self) -> bool {
        match (self.current, self.since_onset()) {
            (Some(Script::AbortAfter(after)), Some(elapsed)) => elapsed >= after,
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct Recorded {
    pub results_calls: usize,
    pub trigger_calls: usize,
    pub rows: Vec<TrialResult>,
    pub events: Vec<TriggerEvent>,
}

/// Captures what would have been exported and counts the calls.
#[derive(Default, Clone)]
pub struct RecordingSink {
    pub recorded: Rc<RefCell<Recorded>>,
}

impl ExportSink for RecordingSink {
    fn write_results(
        &mut self,
        _participant_id: &str,
        _suffix: u16,
        results: &ResultAggregator,
    ) -> Result<(), SessionError> {
        let mut recorded = self.recorded.borrow_mut();
        recorded.results_calls += 1;
        recorded.rows = results.iter().cloned().collect();
        Ok(())
    }

    fn write_trigger_map<T: Timer<Timestamp = u64>>(
        &mut self,
        _participant_id: &str,
        _suffix: u16,
        triggers: &TriggerChannel<T>,
    ) -> Result<(), SessionError> {
        let mut recorded = self.recorded.borrow_mut();
        recorded.trigger_calls += 1;
        recorded.events = triggers.events().to_vec();
        Ok(())
    }
}
