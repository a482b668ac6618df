use crate::config::ConfigError;
use stroop_triggers::TriggerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("trigger line unavailable: {0}")]
    Connection(#[source] TriggerError),
    /// User pressed the abort key. Not a defect; the session still finalises.
    #[error("session aborted by user")]
    Aborted,
    #[error("frontend failure: {0}")]
    Frontend(#[from] std::io::Error),
    #[error("failed to write behavioural results: {0}")]
    Results(#[source] csv::Error),
    #[error("failed to write trigger map: {0}")]
    TriggerMap(#[source] TriggerError),
}

impl SessionError {
    pub fn is_abort(&self) -> bool {
        matches!(self, SessionError::Aborted)
    }
}
