use crate::trial::TrialDurations;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stroop_core::Phase;
use stroop_triggers::TriggerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Session parameters. Times are in seconds; key names follow the task's
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(rename = "Fix_time")]
    pub fix_time: f64,
    #[serde(rename = "Training_Resp_time")]
    pub training_resp_time: f64,
    #[serde(rename = "Experiment_Resp_time")]
    pub experiment_resp_time: f64,
    #[serde(rename = "Training_Wait_time")]
    pub training_wait_time: f64,
    #[serde(rename = "Experiment_Wait_time")]
    pub experiment_wait_time: f64,
    #[serde(rename = "Jitter")]
    pub jitter: f64,
    #[serde(rename = "Number_of_blocks")]
    pub number_of_blocks: usize,
    #[serde(rename = "Feedb")]
    pub feedback: bool,
    #[serde(rename = "Feedb_time")]
    pub feedback_time: f64,
    pub use_eeg: bool,
    #[serde(default)]
    pub eeg_optional: bool,
    #[serde(default)]
    pub trigger_port: Option<PathBuf>,
    #[serde(default = "default_trigger_time")]
    pub trigger_time: f64,
    #[serde(default = "default_abort_key")]
    pub abort_key: String,
}

fn default_trigger_time() -> f64 {
    0.003
}

fn default_abort_key() -> String {
    "f7".to_string()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            fix_time: 0.5,
            training_resp_time: 3.0,
            experiment_resp_time: 2.0,
            training_wait_time: 1.0,
            experiment_wait_time: 1.0,
            jitter: 0.5,
            number_of_blocks: 2,
            feedback: true,
            feedback_time: 0.5,
            use_eeg: false,
            eeg_optional: false,
            trigger_port: None,
            trigger_time: default_trigger_time(),
            abort_key: default_abort_key(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses without validating; `Session::start` validates.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let times = [
            ("Fix_time", self.fix_time),
            ("Training_Resp_time", self.training_resp_time),
            ("Experiment_Resp_time", self.experiment_resp_time),
            ("Training_Wait_time", self.training_wait_time),
            ("Experiment_Wait_time", self.experiment_wait_time),
            ("Jitter", self.jitter),
            ("Feedb_time", self.feedback_time),
            ("trigger_time", self.trigger_time),
        ];
        for (field, value) in times {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a non-negative number of seconds, got {value}"),
                });
            }
        }
        if self.number_of_blocks == 0 {
            return Err(ConfigError::Invalid {
                field: "Number_of_blocks",
                reason: "at least one block is required".to_string(),
            });
        }
        if self.use_eeg && self.trigger_port.is_none() && !self.eeg_optional {
            return Err(ConfigError::Invalid {
                field: "trigger_port",
                reason: "use_eeg is set but no trigger port is configured".to_string(),
            });
        }
        if self.abort_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "abort_key",
                reason: "must name a key".to_string(),
            });
        }
        Ok(())
    }

    pub fn durations(&self, phase: Phase) -> TrialDurations {
        let (response_window, wait) = match phase {
            Phase::Training => (self.training_resp_time, self.training_wait_time),
            Phase::Experiment => (self.experiment_resp_time, self.experiment_wait_time),
        };
        TrialDurations {
            fixation: secs(self.fix_time),
            response_window: secs(response_window),
            feedback: self.feedback.then(|| secs(self.feedback_time)),
            wait: secs(wait),
            jitter_bound: if phase.applies_jitter() {
                secs(self.jitter)
            } else {
                Duration::ZERO
            },
        }
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            use_hardware: self.use_eeg,
            port: self.trigger_port.clone(),
            pulse_width: secs(self.trigger_time),
            optional: self.eeg_optional,
            ..TriggerConfig::default()
        }
    }
}

/// Whole nanoseconds, so `0.6` reads back as exactly 600 ms.
fn secs(value: f64) -> Duration {
    Duration::from_nanos((value * 1e9).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "Fix_time": 0.5,
        "Training_Resp_time": 3.0,
        "Experiment_Resp_time": 2.0,
        "Training_Wait_time": 1.0,
        "Experiment_Wait_time": 0.8,
        "Jitter": 0.4,
        "Number_of_blocks": 3,
        "Feedb": true,
        "Feedb_time": 0.6,
        "use_eeg": false
    }"#;

    #[test]
    fn parses_original_key_names_with_defaults() {
        let config = ExperimentConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.number_of_blocks, 3);
        assert_eq!(config.experiment_wait_time, 0.8);
        assert_eq!(config.trigger_time, 0.003);
        assert_eq!(config.abort_key, "f7");
        assert!(config.trigger_port.is_none());
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let err = ExperimentConfig::from_json_str(r#"{"Fix_time": 0.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn read_leaves_validation_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let raw = CONFIG.replace("\"Number_of_blocks\": 3", "\"Number_of_blocks\": 0");
        std::fs::write(&path, raw).unwrap();

        let config = ExperimentConfig::read(&path).unwrap();
        assert_eq!(config.number_of_blocks, 0);
        let err = ExperimentConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "Number_of_blocks", .. }));
        let err = ExperimentConfig::read(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn negative_time_is_rejected() {
        let raw = CONFIG.replace("\"Jitter\": 0.4", "\"Jitter\": -0.4");
        let err = ExperimentConfig::from_json_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "Jitter", .. }));
    }

    #[test]
    fn eeg_requires_a_port_unless_optional() {
        let mut config = ExperimentConfig {
            use_eeg: true,
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
        config.eeg_optional = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn training_durations_never_jitter() {
        let config = ExperimentConfig::from_json_str(CONFIG).unwrap();
        let training = config.durations(Phase::Training);
        assert_eq!(training.response_window, Duration::from_secs(3));
        assert_eq!(training.jitter_bound, Duration::ZERO);
        assert_eq!(training.feedback, Some(Duration::from_millis(600)));

        let experiment = config.durations(Phase::Experiment);
        assert_eq!(experiment.response_window, Duration::from_secs(2));
        assert_eq!(experiment.wait, Duration::from_millis(800));
        assert_eq!(experiment.jitter_bound, Duration::from_millis(400));
    }

    #[test]
    fn trigger_config_carries_pulse_width() {
        let config = ExperimentConfig::default();
        let trigger = config.trigger_config();
        assert!(!trigger.use_hardware);
        assert_eq!(trigger.pulse_width, Duration::from_millis(3));
        assert_eq!(trigger.params, vec!["acc".to_string(), "stimulus".to_string()]);
    }
}
