//! Error types for the protocol-address crate.

use thiserror::Error;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A caller-supplied name or device identifier was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Registering another device would exceed the per-account limit.
    #[error("device limit exceeded for {name}: at most {limit} devices allowed")]
    DeviceLimitExceeded {
        /// The account whose limit was hit.
        name: String,
        /// Configured maximum number of devices.
        limit: usize,
    },
}

impl ProtocolError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        ProtocolError::InvalidArgument(msg.into())
    }
}

/// Result type alias for protocol address operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
