use crate::error::TriggerError;
use crate::event::{Metadata, TriggerEvent, TriggerType};
use crate::line::{NullLine, PortLine, TriggerLine};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stroop_timing::Timer;

/// Pulse codes cycle through `1..=CODE_CYCLE` so every marker in the recording
/// can be matched to its trigger-map row.
pub const CODE_CYCLE: u8 = 60;

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub use_hardware: bool,
    pub port: Option<PathBuf>,
    pub pulse_width: Duration,
    /// When set, a failed connection degrades to log-only instead of failing.
    pub optional: bool,
    /// Metadata keys that always get a column in the trigger map.
    pub params: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            use_hardware: false,
            port: None,
            pulse_width: Duration::from_millis(3),
            optional: false,
            params: vec!["acc".to_string(), "stimulus".to_string()],
        }
    }
}

/// Hardware trigger output plus the ordered log of every emission.
pub struct TriggerChannel<T: Timer<Timestamp = u64>> {
    timer: T,
    line: Box<dyn TriggerLine>,
    pulse_width: Duration,
    params: Vec<String>,
    events: Vec<TriggerEvent>,
    trial_start: usize,
    last_code: u8,
}

impl<T: Timer<Timestamp = u64>> TriggerChannel<T> {
    /// Log-only channel; emissions never touch hardware.
    pub fn new(timer: T, params: Vec<String>) -> Self {
        Self::with_line(timer, Box::new(NullLine), Duration::ZERO, params)
    }

    pub fn with_line(
        timer: T,
        line: Box<dyn TriggerLine>,
        pulse_width: Duration,
        params: Vec<String>,
    ) -> Self {
        Self {
            timer,
            line,
            pulse_width,
            params,
            events: Vec::new(),
            trial_start: 0,
            last_code: 0,
        }
    }

    pub fn connect(config: &TriggerConfig, timer: T) -> Result<Self, TriggerError> {
        if !config.use_hardware {
            tracing::info!("hardware triggers disabled, logging emissions only");
            return Ok(Self::new(timer, config.params.clone()));
        }

        let opened = match &config.port {
            Some(port) => PortLine::open(port),
            None => Err(TriggerError::NoPort),
        };
        match opened {
            Ok(line) => {
                tracing::info!(
                    port = %line.path().display(),
                    pulse_ms = config.pulse_width.as_secs_f64() * 1e3,
                    "trigger line connected"
                );
                Ok(Self::with_line(
                    timer,
                    Box::new(line),
                    config.pulse_width,
                    config.params.clone(),
                ))
            }
            Err(err) if config.optional => {
                tracing::warn!(error = %err, "trigger line unavailable, logging emissions only");
                Ok(Self::new(timer, config.params.clone()))
            }
            Err(err) => Err(err),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.line.is_connected()
    }

    /// Marks the start of a trial. Metadata attachment never reaches events
    /// emitted before the most recent mark.
    pub fn begin_trial(&mut self) {
        self.trial_start = self.events.len();
    }

    /// Records a new event and, when connected, holds the line for the pulse
    /// width. Safe to call from a flip callback: it blocks for the pulse only.
    pub fn emit(&mut self, kind: TriggerType) -> &TriggerEvent {
        let timestamp = Duration::from_nanos(self.timer.now());
        self.last_code = self.last_code % CODE_CYCLE + 1;
        let code = self.last_code;

        if self.line.is_connected() {
            if let Err(err) = self.pulse(code) {
                tracing::error!(error = %err, %kind, code, "trigger pulse failed");
            }
        }

        let index = self.events.len() as u64;
        tracing::debug!(index, %kind, code, t = timestamp.as_secs_f64(), "trigger emitted");
        self.events.push(TriggerEvent::new(index, kind, code, timestamp));
        &self.events[self.events.len() - 1]
    }

    fn pulse(&mut self, code: u8) -> std::io::Result<()> {
        self.line.set(code)?;
        self.timer.sleep(self.pulse_width);
        self.line.set(0)
    }

    /// Merges `metadata` into the `nth_from_end`-th most recent event of the
    /// current trial (0 = most recent) whose type matches `filter`, or of any
    /// type when `filter` is `None`.
    ///
    /// Returns `false` and leaves the log untouched when no such event exists.
    pub fn attach_metadata<I, K, V>(
        &mut self,
        filter: Option<TriggerType>,
        metadata: I,
        nth_from_end: usize,
    ) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let target = self.events[self.trial_start..]
            .iter_mut()
            .rev()
            .filter(|e| filter.is_none_or(|kind| e.kind() == kind))
            .nth(nth_from_end);

        match target {
            Some(event) => {
                let metadata: Metadata = metadata
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect();
                tracing::debug!(index = event.index(), ?metadata, "trigger annotated");
                event.merge(metadata);
                true
            }
            None => {
                tracing::warn!(
                    filter = ?filter,
                    nth_from_end,
                    trial_events = self.events.len() - self.trial_start,
                    "no trigger to annotate"
                );
                false
            }
        }
    }

    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&TriggerEvent> {
        self.events.last()
    }

    /// Declared params first, then any other key in order of first appearance.
    fn columns(&self) -> Vec<String> {
        let mut columns = self.params.clone();
        for event in &self.events {
            for key in event.metadata().keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), TriggerError> {
        let columns = self.columns();
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![
            "index".to_string(),
            "trigger_type".to_string(),
            "code".to_string(),
            "timestamp".to_string(),
        ];
        header.extend(columns.iter().cloned());
        wtr.write_record(&header)?;

        for event in &self.events {
            let mut record = vec![
                event.index().to_string(),
                event.kind().to_string(),
                event.code().to_string(),
                format!("{:.6}", event.timestamp().as_secs_f64()),
            ];
            record.extend(columns.iter().map(|c| match event.metadata().get(c) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes a new file at `path`; an existing file is never overwritten.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), TriggerError> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        self.write_to(file)?;
        tracing::info!(path = %path.display(), events = self.events.len(), "trigger map written");
        Ok(())
    }
}
