use thiserror::Error;

/// Errors from Audit Fabric operations.
#[derive(Error, Debug)]
pub enum FabricError {
    #[error("invalid fabric configuration: {0}")]
    InvalidConfig(String),

    #[error("event integrity verification failed for event {sequence}")]
    IntegrityFailure { sequence: u64 },

    #[error("event not found: {0}")]
    EventNotFound(u64),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("handler error: {0}")]
    Handler(String),
}

impl From<serde_json::Error> for FabricError {
    fn from(e: serde_json::Error) -> Self {
        FabricError::Serialization(e.to_string())
    }
}
