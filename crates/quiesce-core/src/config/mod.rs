//! # Configuration System
//!
//! Hierarchical TOML configuration for waits and sweeps.
//!
//! ```toml
//! # ~/.quiesce/config.toml
//! [wait]
//! timeout_secs = 1200
//! stability_count = 2
//!
//! [sweep]
//! max_parallel_sweepers = 8
//! ```
//!
//! ```rust,no_run
//! use quiesce_core::config::QuiesceConfig;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuiesceConfig::load_hierarchy()?;
//!     let spec = quiesce_core::wait::WaitSpec::builder()
//!         .defaults(&config.wait)
//!         .pending(["CREATING"])
//!         .target(["AVAILABLE"])
//!         .build()?;
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use types::{QuiesceConfig, SweepConfig, WaitConfig};
pub use validation::validate_config;

impl QuiesceConfig {
    /// See [`loading::load_hierarchy`].
    pub fn load_hierarchy() -> Result<Self, crate::errors::ConfigError> {
        loading::load_hierarchy()
    }

    /// See [`validation::validate_config`].
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }
}
