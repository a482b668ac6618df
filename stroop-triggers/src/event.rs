use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Auxiliary key/value annotations carried by a trigger.
pub type Metadata = BTreeMap<String, Value>;

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Stimulus,
    Answer,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Stimulus => "stimulus",
            TriggerType::Answer => "answer",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted pulse. Type, index, code and timestamp are fixed at emission;
/// only the metadata map can grow afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    index: u64,
    kind: TriggerType,
    code: u8,
    timestamp: Duration,
    metadata: Metadata,
}

impl TriggerEvent {
    pub(crate) fn new(index: u64, kind: TriggerType, code: u8, timestamp: Duration) -> Self {
        Self {
            index,
            kind,
            code,
            timestamp,
            metadata: Metadata::new(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn kind(&self) -> TriggerType {
        self.kind
    }

    /// Value driven onto the line.
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Session time at emission.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub(crate) fn merge(&mut self, metadata: Metadata) {
        self.metadata.extend(metadata);
    }
}
