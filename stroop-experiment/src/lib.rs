pub mod config;
pub mod error;
pub mod frontend;
pub mod results;
pub mod runner;
pub mod scheduler;
pub mod session;
pub mod trial;

pub use config::{ConfigError, ExperimentConfig};
pub use error::SessionError;
pub use frontend::{Display, Element, FeedbackKind, Frontend, InfoOutcome, InfoScreen, Keyboard};
pub use results::{ResultAggregator, Summary};
pub use runner::{TrialPlan, run_blocks};
pub use scheduler::{AbortFlag, TrialScheduler};
pub use session::{
    CsvSink, ExportSink, Participant, Session, SessionEnd, SessionFinalizer, SessionState, Sex,
};
pub use trial::TrialDurations;
