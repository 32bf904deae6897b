use crate::classify::types::{ErrorClass, RemoteFault};
use std::io;

/// Fault codes that signal throttling, contention or a transient server fault.
const RETRYABLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "SlowDown",
    "ConflictException",
    "ConcurrentModificationException",
    "OperationAbortedException",
    "ResourceInUseException",
    "ResourceConflictException",
    "PriorRequestNotComplete",
    "DependencyViolation",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "InternalFailure",
    "InternalError",
    "InternalServerError",
    "RequestTimeout",
    "RequestTimeoutException",
];

const RETRYABLE_STATUSES: &[u16] = &[408, 409, 429, 500, 502, 503, 504];

const NOT_FOUND_MESSAGES: &[&str] = &["not found", "does not exist", "no such"];

const RETRYABLE_MESSAGES: &[&str] = &[
    "throttl",
    "rate exceeded",
    "too many requests",
    "try again",
    "temporarily unavailable",
    "conflict",
];

/// Classify a structured remote fault by code first, then by status.
pub fn classify_fault(fault: &RemoteFault) -> Option<ErrorClass> {
    if let Some(code) = fault.code.as_deref() {
        if is_not_found_code(code) {
            return Some(ErrorClass::NotFound);
        }
        if RETRYABLE_CODES.contains(&code) {
            return Some(ErrorClass::Retryable);
        }
    }

    match fault.status {
        Some(404) => Some(ErrorClass::NotFound),
        Some(status) if RETRYABLE_STATUSES.contains(&status) => Some(ErrorClass::Retryable),
        _ => None,
    }
}

/// `InvalidVpcID.NotFound`, `ResourceNotFoundException`, `NoSuchEntity` and friends.
fn is_not_found_code(code: &str) -> bool {
    code.ends_with("NotFound") || code.ends_with("NotFoundException") || code.starts_with("NoSuch")
}

pub fn classify_io(err: &io::Error) -> Option<ErrorClass> {
    match err.kind() {
        io::ErrorKind::NotFound => Some(ErrorClass::NotFound),
        io::ErrorKind::TimedOut
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::BrokenPipe => Some(ErrorClass::Retryable),
        _ => None,
    }
}

/// Last-resort heuristics for errors that only carry a message.
pub fn classify_message(message: &str) -> Option<ErrorClass> {
    let lower = message.to_lowercase();
    if NOT_FOUND_MESSAGES.iter().any(|m| lower.contains(m)) {
        return Some(ErrorClass::NotFound);
    }
    if RETRYABLE_MESSAGES.iter().any(|m| lower.contains(m)) {
        return Some(ErrorClass::Retryable);
    }
    None
}
