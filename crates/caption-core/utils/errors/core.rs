//! Crate-wide error type

use core::fmt;

use thiserror::Error;

use super::ParseError;
use crate::formats::FormatKind;

/// Main error type for caption operations
///
/// Cheap to clone and comparable so tests and callers can match on the
/// exact failure. I/O failures keep the OS error code and message rather
/// than the non-cloneable `std::io::Error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Structural failure while reading a specific format
    #[error("{format} parse error: {source}")]
    Parse {
        format: FormatKind,
        #[source]
        source: ParseError,
    },

    /// A time string could not be decoded
    #[error("Invalid time '{time}': {reason}")]
    InvalidTime { time: String, reason: String },

    /// A time base parameter required by the input is missing
    #[error("Missing required parameter '{parameter}' for {context}")]
    MissingParameter { parameter: String, context: String },

    /// No codec recognised the input
    #[error("Unrecognized caption format")]
    UnrecognizedFormat,

    /// Format name or extension without a codec
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Language tag that cannot be used where a valid one is required
    #[error("Invalid language tag: {0}")]
    InvalidLanguage(String),

    /// Block index outside the document
    #[error("Index {index} out of bounds (document has {len} blocks)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Read or write failure on the underlying stream
    #[error("I/O error: {message}")]
    Io { code: Option<i32>, message: String },

    /// Output could not be produced (for example invalid UTF-8)
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Wrap a parse failure for `format`
    #[must_use]
    pub const fn parse(format: FormatKind, source: ParseError) -> Self {
        Self::Parse { format, source }
    }

    /// Create a time error from the offending input
    pub fn invalid_time<T: fmt::Display>(time: T, reason: &str) -> Self {
        Self::InvalidTime {
            time: time.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error naming the missing parameter
    pub fn missing_parameter(parameter: &str, context: &str) -> Self {
        Self::MissingParameter {
            parameter: parameter.to_string(),
            context: context.to_string(),
        }
    }

    /// Check if error is recoverable
    ///
    /// Recoverable errors leave the target document untouched and the caller
    /// may retry with different input or options.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Parse { .. }
            | Self::InvalidTime { .. }
            | Self::MissingParameter { .. }
            | Self::UnrecognizedFormat
            | Self::UnsupportedFormat(_)
            | Self::InvalidLanguage(_)
            | Self::IndexOutOfBounds { .. } => true,
            Self::Io { .. } | Self::Serialization(_) => false,
        }
    }

    /// Line number attached to a parse failure, if any
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { source, .. } => source.line(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = core::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_os_code() {
        let io = std::io::Error::from_raw_os_error(2);
        let err = CoreError::from(io);
        match err {
            CoreError::Io { code, ref message } => {
                assert_eq!(code, Some(2));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!err.is_recoverable());
    }

    #[test]
    fn parse_error_reports_format_and_line() {
        let err = CoreError::parse(
            FormatKind::Srt,
            ParseError::MissingTiming {
                line: 7,
                found: "Hello".to_string(),
            },
        );
        assert_eq!(err.line(), Some(7));
        let text = err.to_string();
        assert!(text.starts_with("SRT parse error"));
        assert!(text.contains("line 7"));
    }

    #[test]
    fn missing_parameter_names_it() {
        let err = CoreError::missing_parameter("frameRate", "TTML frame time");
        assert!(err.to_string().contains("frameRate"));
    }
}
