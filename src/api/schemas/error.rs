use serde::Deserialize;
use std::fmt;

/// Structured error payload returned by the backend on non-success responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detailed_message: Option<String>,
    #[serde(default)]
    pub help_url: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// A body with neither code nor message carries nothing worth showing.
    #[must_use]
    pub const fn is_meaningful(&self) -> bool {
        self.code.is_some() || self.message.is_some()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.code) {
            (Some(message), Some(code)) => write!(f, "{message} ({code})"),
            (Some(message), None) => f.write_str(message),
            (None, Some(code)) => f.write_str(code),
            (None, None) => f.write_str("Unknown error"),
        }
    }
}
