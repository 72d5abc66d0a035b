//! Error types for fanroute.

/// Result type alias for fanroute operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fanroute.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Routing failed: {0}")]
    Routing(#[from] crate::router::RoutingFailure),
}
