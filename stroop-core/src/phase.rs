use serde::{Deserialize, Serialize};

/// Session phases that run trials
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Training,
    Experiment,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Training => "training",
            Phase::Experiment => "experiment",
        }
    }

    pub fn is_experiment(&self) -> bool {
        matches!(self, Phase::Experiment)
    }

    /// Inter-trial jitter is only drawn for experiment trials.
    pub fn applies_jitter(&self) -> bool {
        self.is_experiment()
    }

    /// Training trials never touch the trigger line.
    pub fn emits_triggers(&self) -> bool {
        self.is_experiment()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
