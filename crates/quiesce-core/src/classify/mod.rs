//! Error classification.
//!
//! Turns an arbitrary collaborator error into an [`ErrorClass`]. The whole
//! `source()` chain is inspected: structured [`RemoteFault`]s and I/O errors
//! are read first, message heuristics only apply when nothing structured
//! decided. Call sites with their own policy (an "invalid parameter" that
//! really means "skip this case") register override predicates instead of
//! teaching the built-in rules new substrings.

mod operations;
pub mod types;

pub use types::{ErrorClass, RemoteFault};

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied classification rule. Returning `None` defers to the next rule.
pub type ClassifyOverride = Arc<dyn Fn(&(dyn Error + 'static)) -> Option<ErrorClass> + Send + Sync>;

/// Error classifier with optional per-call-site overrides.
#[derive(Clone, Default)]
pub struct Classifier {
    overrides: Vec<ClassifyOverride>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override consulted before the built-in rules, in insertion order.
    pub fn with_override<F>(mut self, rule: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> Option<ErrorClass> + Send + Sync + 'static,
    {
        self.overrides.push(Arc::new(rule));
        self
    }

    /// Treat any error whose chain mentions `needle` as `class`.
    pub fn with_message_override(self, needle: impl Into<String>, class: ErrorClass) -> Self {
        let needle = needle.into();
        self.with_override(move |err| chain(err).any(|e| e.to_string().contains(&needle)).then_some(class))
    }

    pub fn classify(&self, err: &(dyn Error + 'static)) -> ErrorClass {
        if let Some(class) = self.overrides.iter().find_map(|rule| rule(err)) {
            return class;
        }

        let mut structured = false;
        for e in chain(err) {
            if let Some(fault) = e.downcast_ref::<RemoteFault>() {
                if let Some(class) = operations::classify_fault(fault) {
                    return class;
                }
                structured |= fault.code.is_some() || fault.status.is_some();
            }
            if let Some(io_err) = e.downcast_ref::<std::io::Error>()
                && let Some(class) = operations::classify_io(io_err)
            {
                return class;
            }
        }

        // A coded fault that matched no rule is not second-guessed by its message.
        if structured {
            return ErrorClass::Fatal;
        }

        chain(err)
            .find_map(|e| operations::classify_message(&e.to_string()))
            .unwrap_or(ErrorClass::Fatal)
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

/// Classify with the built-in rules only.
pub fn classify(err: &(dyn Error + 'static)) -> ErrorClass {
    Classifier::default().classify(err)
}

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}
