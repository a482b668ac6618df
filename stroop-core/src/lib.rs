pub mod keys;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use keys::{KeyMapping, RESPONSE_KEYS, split_into_blocks};
pub use phase::Phase;
pub use stimulus::Stimulus;
pub use trial::{
    NO_REACTION_TIME, NO_RESPONSE, Response, Trial, TrialKind, TrialResult, TrialRow, TrialState,
};
