use crate::error::SessionError;
use crate::frontend::{Frontend, InfoScreen};
use crate::scheduler::TrialScheduler;
use crate::session::SessionState;
use rand::Rng;
use stroop_core::{KeyMapping, Phase, Stimulus, Trial, split_into_blocks};
use stroop_timing::Timer;

/// Prepared trials for one session, as handed over by the trial preparation step.
#[derive(Debug, Clone)]
pub struct TrialPlan<S: Stimulus> {
    pub training: Vec<Vec<Trial<S>>>,
    pub experiment: Vec<Trial<S>>,
    pub mapping: KeyMapping,
}

/// Training blocks, then the experiment split into the configured number of
/// blocks, with info screens in between.
pub fn run_blocks<T, R, F>(
    session: &mut SessionState<T>,
    scheduler: &mut TrialScheduler<T, R>,
    plan: &TrialPlan<F::Stimulus>,
    frontend: &mut F,
) -> Result<(), SessionError>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    F: Frontend,
{
    let instructions = plan.mapping.instructions();

    for (idx, block) in plan.training.iter().enumerate() {
        scheduler.show_info(frontend, InfoScreen::Training(idx + 1), &instructions)?;
        tracing::info!(block = idx + 1, trials = block.len(), "training block");
        for trial in block {
            scheduler.run_trial(session, Phase::Training, trial, frontend)?;
        }
    }

    scheduler.show_info(frontend, InfoScreen::Instruction, &instructions)?;

    let blocks = split_into_blocks(
        plan.experiment.iter().collect(),
        session.config.number_of_blocks,
    );
    let block_count = blocks.len();
    for (idx, block) in blocks.into_iter().enumerate() {
        tracing::info!(block = idx + 1, trials = block.len(), "experiment block");
        for trial in block {
            scheduler.run_trial(session, Phase::Experiment, trial, frontend)?;
        }
        if idx + 1 < block_count {
            scheduler.show_info(frontend, InfoScreen::Break(idx + 1), "")?;
        }
    }

    scheduler.show_info(frontend, InfoScreen::End, "")?;
    Ok(())
}
