//! Convergence waits.
//!
//! A [`WaitSpec`] describes what "still in progress" and "done" look like for
//! one remote object; [`wait`] polls until the object gets there, times out,
//! fails, or is cancelled.

pub mod errors;
pub mod handler;
pub mod types;

pub use errors::WaitError;
pub use handler::wait;
pub use types::{Backoff, PollOutcome, WaitSpec, WaitSpecBuilder, WaitState};
