// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the pulse generator.

use std::fmt;

/// Result type alias for pulse generator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pulse generator error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Layout error
    Layout(LayoutError),
    /// Validation error
    Validation(ValidationError),
    /// Render error
    Render(RenderError),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Layout(e) => write!(f, "Layout error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Render(e) => write!(f, "Render error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Layout(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Render(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<LayoutError> for Error {
    fn from(e: LayoutError) -> Self {
        Error::Layout(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<RenderError> for Error {
    fn from(e: RenderError) -> Self {
        Error::Render(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Layout errors raised while measuring or arranging a schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// An element needs more time than its parent allotted and oversizing
    /// is disallowed.
    Overflow {
        /// Kind of the offending element (e.g. "StackSchedule", "Play").
        element: String,
        /// Duration that was available to the element, in seconds.
        available: f64,
        /// Duration the element requires, in seconds.
        required: f64,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Overflow {
                element,
                available,
                required,
            } => write!(
                f,
                "{} overflows its slot: available {:e} s < required {:e} s",
                element, available, required
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Validation errors for requests, elements and shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// An element references a channel missing from the channel configuration
    UnknownChannel { channel: String, element: String },
    /// A shape description cannot be turned into a sampler
    InvalidShape(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::UnknownChannel { channel, element } => {
                write!(f, "{} references unknown channel '{}'", element, channel)
            }
            ValidationError::InvalidShape(msg) => write!(f, "Invalid shape: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised during the render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A pooled buffer was accessed after it was returned to the pool
    DisposedResource(String),
    /// A channel's carrier state was mutated earlier than its last mutation
    OutOfOrderMutation {
        channel: String,
        time: f64,
        last_time: f64,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::DisposedResource(what) => {
                write!(f, "Access to disposed resource: {}", what)
            }
            RenderError::OutOfOrderMutation {
                channel,
                time,
                last_time,
            } => write!(
                f,
                "Out-of-order mutation on channel '{}': t={:e} s precedes last t={:e} s",
                channel, time, last_time
            ),
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    // =========================================================================
    // Error Display tests
    // =========================================================================

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("negative tolerance".into());
        assert_eq!(e.to_string(), "Configuration error: negative tolerance");
    }

    #[test]
    fn test_error_display_layout() {
        let e = Error::Layout(LayoutError::Overflow {
            element: "Stack".into(),
            available: 1.0,
            required: 2.0,
        });
        let msg = e.to_string();
        assert!(msg.starts_with("Layout error: Stack overflows its slot"));
        assert!(msg.contains("1e0"));
        assert!(msg.contains("2e0"));
    }

    #[test]
    fn test_error_display_validation() {
        let e = Error::Validation(ValidationError::UnknownChannel {
            channel: "xy9".into(),
            element: "Play".into(),
        });
        assert_eq!(
            e.to_string(),
            "Validation error: Play references unknown channel 'xy9'"
        );
    }

    #[test]
    fn test_error_display_render_disposed() {
        let e = Error::Render(RenderError::DisposedResource("waveform".into()));
        assert_eq!(
            e.to_string(),
            "Render error: Access to disposed resource: waveform"
        );
    }

    #[test]
    fn test_error_display_out_of_order() {
        let e = RenderError::OutOfOrderMutation {
            channel: "xy0".into(),
            time: 1.0,
            last_time: 2.0,
        };
        assert!(e.to_string().contains("channel 'xy0'"));
    }

    #[test]
    fn test_error_display_io() {
        let e = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(e.to_string(), "IO error: gone");
    }

    #[test]
    fn test_error_display_serialization() {
        let e = Error::Serialization("invalid yaml".into());
        assert_eq!(e.to_string(), "Serialization error: invalid yaml");
    }

    #[test]
    fn test_validation_error_display_field() {
        let e = ValidationError::Field {
            field: "sample_rate".into(),
            message: "must be positive".into(),
        };
        assert_eq!(e.to_string(), "Field 'sample_rate': must be positive");
    }

    #[test]
    fn test_validation_error_display_shape() {
        let e = ValidationError::InvalidShape("x not increasing".into());
        assert_eq!(e.to_string(), "Invalid shape: x not increasing");
    }

    // =========================================================================
    // Error::source() tests
    // =========================================================================

    #[test]
    fn test_error_source_nested() {
        let e = Error::Render(RenderError::DisposedResource("x".into()));
        assert!(e.source().is_some());
        let e = Error::Validation(ValidationError::InvalidShape("x".into()));
        assert!(e.source().is_some());
    }

    #[test]
    fn test_error_source_none_for_config() {
        let e = Error::Config("x".into());
        assert!(e.source().is_none());
    }

    // =========================================================================
    // From impls
    // =========================================================================

    #[test]
    fn test_from_layout_error() {
        let le = LayoutError::Overflow {
            element: "Play".into(),
            available: 0.0,
            required: 1.0,
        };
        let e: Error = le.into();
        assert!(matches!(e, Error::Layout(LayoutError::Overflow { .. })));
    }

    #[test]
    fn test_from_render_error() {
        let e: Error = RenderError::DisposedResource("x".into()).into();
        assert!(matches!(e, Error::Render(RenderError::DisposedResource(_))));
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("{{{{").unwrap_err();
        let e: Error = yaml_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
