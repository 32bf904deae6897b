use crate::errors::ErrorKind;
use std::fmt;

/// How a failed remote call should be treated by a waiter or sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Throttling, conflict or transient fault: try again later.
    Retryable,
    /// The targeted object does not exist remotely.
    NotFound,
    /// Anything else: give up and propagate.
    Fatal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Retryable => ErrorKind::Retryable,
            ErrorClass::NotFound => ErrorKind::NotFound,
            ErrorClass::Fatal => ErrorKind::Fatal,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::Retryable => "retryable",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// A structured fault reported by the remote control plane.
///
/// Collaborators wrap their transport errors in (or chain them to) a
/// `RemoteFault` so the classifier can read the fault code and status
/// instead of guessing from the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    pub code: Option<String>,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} ({}): {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            (None, Some(status)) => write!(f, "HTTP {}: {}", status, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteFault {}
