use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use stroop_core::{Phase, TrialResult};

/// Append-only, chronologically ordered trial results for one session.
#[derive(Debug, Default, Clone)]
pub struct ResultAggregator {
    rows: Vec<TrialResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TrialResult) {
        self.rows.push(result);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialResult> {
        self.rows.iter()
    }

    pub fn last(&self) -> Option<&TrialResult> {
        self.rows.last()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            wtr.write_record([
                "phase",
                "trial_type",
                "text",
                "color",
                "wait_time",
                "response_deadline",
                "reaction_time",
                "expected_key",
                "observed_key",
                "correct",
            ])?;
        }
        for row in &self.rows {
            wtr.serialize(row.row())?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes a new file at `path`; an existing file is never overwritten.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        self.write_to(file)?;
        tracing::info!(path = %path.display(), trials = self.rows.len(), "results written");
        Ok(())
    }

    /// Response rate, accuracy and mean reaction time for one phase.
    pub fn summary(&self, phase: Phase) -> Summary {
        let rows: Vec<&TrialResult> = self.rows.iter().filter(|r| r.phase == phase).collect();
        let times: Vec<Duration> = rows
            .iter()
            .filter_map(|r| r.response.reaction_time())
            .collect();
        let mean_rt = (!times.is_empty())
            .then(|| times.iter().sum::<Duration>() / times.len() as u32);

        Summary {
            trials: rows.len(),
            answered: times.len(),
            correct: rows.iter().filter(|r| r.correct).count(),
            mean_rt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub trials: usize,
    pub answered: usize,
    pub correct: usize,
    pub mean_rt: Option<Duration>,
}

impl Summary {
    pub fn accuracy(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.correct as f64 / self.trials as f64
    }
}
