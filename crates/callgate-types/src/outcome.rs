use serde::{Deserialize, Serialize};

/// Result of a forwarded call: success flag and the raw bytes the delegate
/// returned. Produced fresh per invocation, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    pub fn succeeded(return_data: Vec<u8>) -> Self {
        Self {
            success: true,
            return_data,
        }
    }

    pub fn failed(return_data: Vec<u8>) -> Self {
        Self {
            success: false,
            return_data,
        }
    }
}
