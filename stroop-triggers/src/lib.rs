pub mod channel;
pub mod error;
pub mod event;
pub mod line;

pub use channel::{CODE_CYCLE, TriggerChannel, TriggerConfig};
pub use error::TriggerError;
pub use event::{Metadata, TriggerEvent, TriggerType};
pub use line::{NullLine, PortLine, TriggerLine};
