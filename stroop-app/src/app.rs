use anyhow::{Context, Result, anyhow, bail};
use std::time::Duration;
use stroop_core::Phase;
use stroop_experiment::{
    CsvSink, ExperimentConfig, Session, SessionEnd, Summary, TrialScheduler, run_blocks,
};
use stroop_timing::HighPrecisionTimer;

use crate::cli::Cli;
use crate::logging;
use crate::messages::Messages;
use crate::terminal::{self, TerminalFrontend};
use crate::trials;

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn run(self) -> Result<()> {
        let participant_id = self.cli.participant().session_id();
        let log_guard = logging::init_tracing(&self.cli.results_dir, &participant_id)?;
        tracing::info!(
            participant = %participant_id,
            log = %log_guard.path().display(),
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting stroop session"
        );

        let frame = frame_period(self.cli.refresh_hz)?;
        if let Some(dir) = self.cli.messages.as_ref().filter(|dir| !dir.is_dir()) {
            bail!("messages directory {} does not exist", dir.display());
        }
        // Unreadable or malformed files fail here, before any output exists.
        let config = ExperimentConfig::read(&self.cli.config)
            .with_context(|| format!("failed to load {}", self.cli.config.display()))?;

        // From here on every exit path writes the session outputs.
        let timer = HighPrecisionTimer::new();
        let sink = CsvSink::new(&self.cli.results_dir);
        let mut session = Session::start(participant_id, config, timer.clone(), sink)
            .context("failed to start session")?;

        let abort_name = &session.state().config.abort_key;
        let abort_key = terminal::parse_key(abort_name)
            .ok_or_else(|| anyhow!("unknown abort key '{abort_name}'"))?;
        let plan = trials::load_plan(&self.cli.trials)?;
        tracing::info!(
            training_blocks = plan.training.len(),
            experiment_trials = plan.experiment.len(),
            blocks = session.state().config.number_of_blocks,
            "trials prepared"
        );
        let mut scheduler = TrialScheduler::new(&plan.mapping, timer.clone(), rand::rng());

        let outcome = {
            let mut frontend = TerminalFrontend::stdout(timer, frame, abort_key)
                .context("failed to take over the terminal")?
                .with_messages(Messages::new(self.cli.messages.clone()));
            session.run(|state| run_blocks(state, &mut scheduler, &plan, &mut frontend))
        };

        let end = outcome.context("session failed")?;
        let results = &session.state().results;
        log_summary(Phase::Training, &results.summary(Phase::Training));
        log_summary(Phase::Experiment, &results.summary(Phase::Experiment));
        match end {
            SessionEnd::Completed => tracing::info!("experiment completed"),
            SessionEnd::Aborted => tracing::warn!("experiment aborted by the participant"),
        }
        Ok(())
    }
}

fn frame_period(refresh_hz: f64) -> Result<Duration> {
    if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
        bail!("refresh rate must be a positive number of Hz, got {refresh_hz}");
    }
    Ok(Duration::from_secs_f64(1.0 / refresh_hz))
}

fn log_summary(phase: Phase, summary: &Summary) {
    if summary.trials == 0 {
        return;
    }
    tracing::info!(
        %phase,
        trials = summary.trials,
        answered = summary.answered,
        accuracy_pct = summary.accuracy() * 100.0,
        mean_rt_ms = summary.mean_rt.map(|rt| rt.as_secs_f64() * 1e3),
        "session summary"
    );
}
