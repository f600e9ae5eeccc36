//! Error types for inverse telecine operations.

use thiserror::Error;

/// Error type for inverse telecine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IvtcError {
    /// Invalid frame dimensions for field analysis.
    #[error("Invalid frame dimensions: {width}x{height} (minimum 2x2 required)")]
    InvalidDimensions { width: u32, height: u32 },

    /// Unsupported pixel format.
    #[error("Unsupported pixel format: {format}")]
    UnsupportedFormat { format: String },

    /// Frame mismatch in the temporal buffer (different dimensions or format).
    #[error("Frame mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    FrameMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Buffer access error.
    #[error("Buffer access error: {message}")]
    BufferError { message: String },

    /// Internal algorithm error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type for inverse telecine operations.
pub type Result<T> = std::result::Result<T, IvtcError>;

impl IvtcError {
    /// Create an invalid dimensions error.
    pub fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a frame mismatch error.
    pub fn frame_mismatch(
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    ) -> Self {
        Self::FrameMismatch {
            expected_width,
            expected_height,
            actual_width,
            actual_height,
        }
    }

    /// Create a buffer error.
    pub fn buffer_error(message: impl Into<String>) -> Self {
        Self::BufferError {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IvtcError::invalid_dimensions(100, 1);
        assert!(err.to_string().contains("100x1"));

        let err = IvtcError::unsupported_format("unknown");
        assert!(err.to_string().contains("unknown"));

        let err = IvtcError::frame_mismatch(64, 64, 32, 32);
        assert!(err.to_string().contains("64x64"));
        assert!(err.to_string().contains("32x32"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = IvtcError::invalid_dimensions(100, 100);
        let err2 = IvtcError::invalid_dimensions(100, 100);
        let err3 = IvtcError::invalid_dimensions(200, 200);

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
