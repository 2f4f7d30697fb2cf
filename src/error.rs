//! Custom error types for the application.
//!
//! `DashError` is the application-level error. Per-frame decode failures
//! (`DecodeError`) and connection faults (`TransportError`) have their own
//! types because neither is ever fatal: the supervisor absorbs both and only
//! surfaces them as log records and status transitions.
//!
//! By using `#[from]`, `DashError` can be created from the underlying error
//! types with the `?` operator.

use thiserror::Error;

use crate::transport::TransportError;

/// Convenience alias for results using the application error type.
pub type DashResult<T> = std::result::Result<T, DashError>;

/// Errors surfaced to the caller of the dashboard library.
#[derive(Error, Debug)]
pub enum DashError {
    /// Configuration could not be read or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Configuration could not be rendered back to TOML.
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// I/O failure (thread spawn, socket bind, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session worker or its runtime could not be created.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Transport failure outside of a supervised session (e.g. the simulator).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
