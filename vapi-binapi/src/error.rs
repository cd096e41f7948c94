//! Error types for encoding and decoding binary API messages

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Errors raised while decoding a message body
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before a field could be read
    #[error("Message truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A fixed-size string field did not contain valid UTF-8
    #[error("Invalid string in field: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// A frame header announced a body larger than we accept
    #[error("Message too large: {size} bytes (max {max})")]
    TooLarge { size: u32, max: u32 },

    /// A variable-length array is longer than its count field can express
    #[error("Array too long for count field: {0} elements")]
    ArrayTooLong(usize),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Non-zero `retval` returned by the forwarding plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiError(pub i32);

impl ApiError {
    /// Human readable description for well-known return codes
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self.0 {
            -1 => "Unspecified Error",
            -2 => "Invalid sw_if_index",
            -3 => "No such FIB / VRF",
            -6 => "No such entry",
            -7 => "Invalid value",
            -8 => "Invalid value #2",
            -30 => "Feature disabled by configuration",
            -81 => "Entry already exists",
            _ => "Unknown error",
        }
    }

    /// The raw return code
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "VPPApiError: {} ({})", self.description(), self.0)
    }
}

impl std::error::Error for ApiError {}

/// Map a reply `retval` onto a result
///
/// # Errors
///
/// Returns [`ApiError`] for any non-zero value
pub const fn check_retval(retval: i32) -> std::result::Result<(), ApiError> {
    if retval == 0 {
        Ok(())
    } else {
        Err(ApiError(retval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_retval_is_success() {
        assert_eq!(check_retval(0), Ok(()));
    }

    #[test]
    fn known_retval_has_description() {
        let err = check_retval(-2).unwrap_err();
        assert_eq!(err.code(), -2);
        assert_eq!(err.to_string(), "VPPApiError: Invalid sw_if_index (-2)");
    }

    #[test]
    fn unknown_retval_is_still_an_error() {
        let err = check_retval(-4242).unwrap_err();
        assert_eq!(err.to_string(), "VPPApiError: Unknown error (-4242)");
    }
}
