use crate::errors::{BoxError, ErrorKind, QuiesceError};
use crate::wait::types::WaitState;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Invalid wait spec: {message}")]
    InvalidSpec { message: String },

    #[error(
        "Timeout after {elapsed:?} waiting for {expected:?} (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        elapsed: Duration,
        expected: Vec<String>,
        last_status: Option<String>,
        last_payload: Option<String>,
        #[source]
        last_error: Option<BoxError>,
    },

    #[error("Unexpected status '{status}', wanted one of {expected:?}")]
    UnexpectedStatus {
        status: String,
        expected: Vec<String>,
        last_payload: Option<String>,
    },

    #[error("Object not found after {checks} consecutive checks: {last_error}")]
    NotFound {
        checks: u32,
        #[source]
        last_error: BoxError,
    },

    #[error(
        "Wait failed (last status: {}): {source}",
        .last_status.as_deref().unwrap_or("none")
    )]
    Fatal {
        last_status: Option<String>,
        last_payload: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error(
        "Wait cancelled (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    Cancelled { last_status: Option<String> },
}

impl WaitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaitError::Timeout { .. } => ErrorKind::Timeout,
            WaitError::Cancelled { .. } => ErrorKind::Cancelled,
            WaitError::NotFound { .. } => ErrorKind::NotFound,
            WaitError::InvalidSpec { .. }
            | WaitError::UnexpectedStatus { .. }
            | WaitError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// State the waiter was in when it gave up.
    pub fn state(&self) -> WaitState {
        match self {
            WaitError::InvalidSpec { .. } => WaitState::Start,
            WaitError::Timeout { .. } => WaitState::TimedOut,
            WaitError::Cancelled { .. } => WaitState::Cancelled,
            WaitError::UnexpectedStatus { .. }
            | WaitError::NotFound { .. }
            | WaitError::Fatal { .. } => WaitState::Failed,
        }
    }

    /// Last status observed before the wait ended, if any.
    pub fn last_status(&self) -> Option<&str> {
        match self {
            WaitError::Timeout { last_status, .. }
            | WaitError::Fatal { last_status, .. }
            | WaitError::Cancelled { last_status } => last_status.as_deref(),
            WaitError::UnexpectedStatus { status, .. } => Some(status),
            WaitError::InvalidSpec { .. } | WaitError::NotFound { .. } => None,
        }
    }

    /// Debug rendering of the last payload observed, if any.
    pub fn last_payload(&self) -> Option<&str> {
        match self {
            WaitError::Timeout { last_payload, .. }
            | WaitError::UnexpectedStatus { last_payload, .. }
            | WaitError::Fatal { last_payload, .. } => last_payload.as_deref(),
            _ => None,
        }
    }
}

impl QuiesceError for WaitError {
    fn error_code(&self) -> &'static str {
        match self {
            WaitError::InvalidSpec { .. } => "WAIT_INVALID_SPEC",
            WaitError::Timeout { .. } => "WAIT_TIMEOUT",
            WaitError::UnexpectedStatus { .. } => "WAIT_UNEXPECTED_STATUS",
            WaitError::NotFound { .. } => "WAIT_NOT_FOUND",
            WaitError::Fatal { .. } => "WAIT_FATAL",
            WaitError::Cancelled { .. } => "WAIT_CANCELLED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, WaitError::InvalidSpec { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_timeout_display_and_kind() {
        let error = WaitError::Timeout {
            elapsed: Duration::from_secs(5),
            expected: vec!["ACTIVE".to_string()],
            last_status: Some("CREATING".to_string()),
            last_payload: None,
            last_error: None,
        };
        assert_eq!(
            error.to_string(),
            "Timeout after 5s waiting for [\"ACTIVE\"] (last status: CREATING)"
        );
        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert_eq!(error.state(), WaitState::TimedOut);
        assert_eq!(error.error_code(), "WAIT_TIMEOUT");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_cancelled_distinct_from_timeout() {
        let error = WaitError::Cancelled { last_status: None };
        assert_eq!(error.to_string(), "Wait cancelled (last status: none)");
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(error.state(), WaitState::Cancelled);
    }

    #[test]
    fn test_fatal_keeps_source() {
        let error = WaitError::Fatal {
            last_status: Some("FAILED".to_string()),
            last_payload: Some("Cluster { id: 1 }".to_string()),
            source: "access denied".into(),
        };
        assert_eq!(error.to_string(), "Wait failed (last status: FAILED): access denied");
        assert_eq!(error.source().unwrap().to_string(), "access denied");
        assert_eq!(error.last_payload(), Some("Cluster { id: 1 }"));
        assert!(!error.is_user_error());
    }
}
