use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use stroop_experiment::{Participant, Sex};

/// Timed Stroop colour-naming task with hardware trigger output.
#[derive(Debug, Clone, Parser)]
#[command(name = "stroop", version)]
pub struct Cli {
    /// Experiment configuration (JSON).
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Prepared training and experiment trials (JSON).
    #[arg(long, default_value = "trials.json")]
    pub trials: PathBuf,

    /// Where the behavioural file, trigger map and log are written.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    #[arg(long)]
    pub part_id: String,

    #[arg(long, default_value_t = 20)]
    pub part_age: u32,

    #[arg(long, value_enum, default_value_t = SexArg::Male)]
    pub part_sex: SexArg,

    /// Directory with the info screen texts; built-in texts fill any gaps.
    #[arg(long)]
    pub messages: Option<PathBuf>,

    /// Frame rate the terminal display is paced at.
    #[arg(long, default_value_t = 60.0)]
    pub refresh_hz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SexArg {
    #[value(name = "MALE")]
    Male,
    #[value(name = "FEMALE")]
    Female,
}

impl Cli {
    pub fn participant(&self) -> Participant {
        Participant {
            id: self.part_id.clone(),
            age: self.part_age,
            sex: match self.part_sex {
                SexArg::Male => Sex::Male,
                SexArg::Female => Sex::Female,
            },
        }
    }
}
