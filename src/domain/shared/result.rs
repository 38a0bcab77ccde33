//! Relay result type

use super::error::RelayError;

/// Standard result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
