use crate::api::schemas::error::ApiError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("API error ({status}): {error}")]
    Api { status: StatusCode, error: ApiError },
    #[error("Request failed with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("Invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Session serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authentication,
    Api,
    Unknown,
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::AuthenticationRequired | Self::AuthenticationFailed => ErrorKind::Authentication,
            Self::Api { .. } => ErrorKind::Api,
            Self::UnexpectedStatus(_)
            | Self::Decode(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::InvalidUrl(_) => ErrorKind::Unknown,
        }
    }

    /// True when the session is gone and the user has to sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self.kind(), ErrorKind::Authentication)
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Network(e) => e.status(),
            Self::Api { status, .. } | Self::UnexpectedStatus(status) => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for an error dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Unable to reach the server. Check your connection and try again.".to_string(),
            Self::AuthenticationRequired | Self::AuthenticationFailed => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Api { error, .. } => error.to_string(),
            Self::UnexpectedStatus(status) => status_message(*status),
            Self::Decode(_) | Self::Storage(_) | Self::Serialization(_) | Self::InvalidUrl(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    /// Maps a non-success response body to the error taxonomy.
    ///
    /// Bodies that are not a structured error fall back to a status-derived error.
    #[must_use]
    pub fn from_response_body(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiError>(body) {
            Ok(error) if error.is_meaningful() => Self::Api { status, error },
            Ok(_) => {
                tracing::debug!(status = %status, "Error body carried neither code nor message");
                Self::UnexpectedStatus(status)
            }
            Err(e) => {
                tracing::debug!(status = %status, error = %e, "Unparseable error body");
                Self::UnexpectedStatus(status)
            }
        }
    }
}

fn status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("Request failed with status {} ({reason}).", status.as_u16()),
        None => format!("Request failed with status {}.", status.as_u16()),
    }
}
