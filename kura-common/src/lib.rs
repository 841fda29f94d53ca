//! Common types and utilities shared across Kura crates.
//!
//! This crate defines the shared error type and the observability helpers
//! used throughout the Kura workspace. It is intentionally lightweight so
//! that every crate can depend on it without pulling in the HTTP stack.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`KuraError`] and [`Result`]: Shared error handling for construction
//!   and configuration failures
//!
//! # Examples
//!
//! ```rust
//! use kura_common::KuraError;
//!
//! let err = KuraError::Config("missing upstream section".to_string());
//! assert_eq!(err.to_string(), "Configuration error: missing upstream section");
//! ```

pub mod observability;

/// Error types used across the Kura system.
///
/// Pipeline failures are not represented here: the analyzers degrade to a
/// fallback result instead of returning an error. This type covers the
/// surrounding plumbing (building clients, reading configuration).
#[derive(thiserror::Error, Debug)]
pub enum KuraError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An HTTP client could not be constructed.
    #[error("Client error: {0}")]
    Client(String),
}

/// Convenient alias for results that use [`KuraError`].
pub type Result<T> = std::result::Result<T, KuraError>;
