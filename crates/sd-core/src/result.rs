//! Result type aliases

use crate::error::SdError;

/// Standard Result type for service desk operations
pub type SdResult<T> = Result<T, SdError>;
