use serde::{Deserialize, Serialize};

/// The wrapper every backend response uses.
///
/// `success = true` means `data` is authoritative; a missing `data` is read as
/// "nothing", not as an error. `success = false` means `message` should be
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The message to surface for a failed call, or `default` if the backend sent none.
    pub fn failure_message(&self, default: &str) -> String {
        match self.message.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => default.to_string(),
        }
    }
}

impl<T: Default> ResponseEnvelope<T> {
    /// Payload of a successful call, defaulting to empty when `data` is absent.
    pub fn into_data_or_default(self) -> T {
        self.data.unwrap_or_default()
    }
}
