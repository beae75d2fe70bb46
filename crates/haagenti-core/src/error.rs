//! Error types for compression operations.

use thiserror::Error;

/// Result type alias for compression operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Compression error types.
#[derive(Debug, Error)]
pub enum Error {
    /// A numeric parameter fell outside its accepted range.
    #[error("invalid {name} {value}: must be in range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A caller-supplied parameter combination is inconsistent.
    #[error("invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// A context map does not fit the configured context count.
    #[error("invalid context map: {0}")]
    InvalidContextMap(String),
}

impl Error {
    /// Create an out-of-range parameter error.
    pub fn out_of_range(name: &'static str, value: i64, min: i64, max: i64) -> Self {
        Error::OutOfRange {
            name,
            value,
            min,
            max,
        }
    }

    /// Create an inconsistent-parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Create a context map error.
    pub fn invalid_context_map(message: impl Into<String>) -> Self {
        Error::InvalidContextMap(message.into())
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::OutOfRange { .. } => "out_of_range",
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::InvalidContextMap(_) => "invalid_context_map",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = Error::out_of_range("postfix bits", 5, 0, 3);
        assert_eq!(
            err.to_string(),
            "invalid postfix bits 5: must be in range [0, 3]"
        );
        assert_eq!(err.category(), "out_of_range");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = Error::invalid_parameter("direct distance codes", "6 is not a multiple of 4");
        assert_eq!(
            err.to_string(),
            "invalid direct distance codes: 6 is not a multiple of 4"
        );
        assert_eq!(err.category(), "invalid_parameter");
    }

    #[test]
    fn test_context_map_error() {
        let err = Error::invalid_context_map("context 3 maps to cluster 9");
        assert_eq!(err.to_string(), "invalid context map: context 3 maps to cluster 9");
    }
}
