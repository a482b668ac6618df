use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("hardware triggers enabled but no trigger port configured")]
    NoPort,
    #[error("failed to open trigger port {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write trigger map: {0}")]
    Export(#[from] csv::Error),
    #[error("failed to write trigger map: {0}")]
    Io(#[from] std::io::Error),
}
