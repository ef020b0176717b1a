//! Error types for the control crate.
//!
//! Actuator control itself never fails at runtime: bad values are clamped,
//! foreign requests ignored and busy states deferred. Errors only surface
//! while building the runtime and while decoding state requests.

use thiserror::Error;
use toolhead_common::config::ConfigError;

/// Startup failures of the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded or validated.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// More switch sections than the runtime can hold.
    #[error("{count} switches configured, at most {max} supported")]
    TooManySwitches { count: usize, max: usize },

    /// Monotonic clock unavailable.
    #[error("clock: {0}")]
    Clock(#[from] nix::Error),

    /// Ticker thread could not be started.
    #[error("ticker thread: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed public state request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed state request: {0}")]
    Malformed(#[from] serde_json::Error),
}
