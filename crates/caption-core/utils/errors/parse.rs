//! Structural read failures
//!
//! Each variant names the approximate location of the failure: a 1-based
//! line number for the line oriented formats, a byte offset for XML.

use thiserror::Error;

/// Reason a `read` call rejected its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Header line required by the format is absent
    #[error("Missing header at line {line}: expected '{expected}'")]
    MissingHeader { line: usize, expected: String },

    /// Cue index line is not a number
    #[error("Invalid cue index '{found}' at line {line}")]
    InvalidIndex { line: usize, found: String },

    /// Timing line expected but something else found
    #[error("Missing timing line at line {line}: found '{found}'")]
    MissingTiming { line: usize, found: String },

    /// Time value in a timing line could not be decoded
    #[error("Invalid time '{time}' at line {line}: {reason}")]
    InvalidTime {
        line: usize,
        time: String,
        reason: String,
    },

    /// Input ended in the middle of a block
    #[error("Unexpected end of input at line {line}: {expected}")]
    UnexpectedEof { line: usize, expected: String },

    /// MicroDVD line without the leading frame pair
    #[error("Invalid frame pair at line {line}: '{found}'")]
    InvalidFrames { line: usize, found: String },

    /// XML could not be parsed
    #[error("Malformed XML at byte {position}: {reason}")]
    MalformedXml { position: u64, reason: String },

    /// Required XML element is absent
    #[error("Missing element <{element}>")]
    MissingElement { element: String },

    /// Language divisions with different paragraph counts
    #[error(
        "Misaligned languages: division '{language}' has {found} paragraphs, expected {expected}"
    )]
    MisalignedLanguages {
        language: String,
        expected: usize,
        found: usize,
    },

    /// Underlying stream failed mid-read
    #[error("I/O error at line {line}: {message}")]
    Io { line: usize, message: String },
}

impl ParseError {
    /// Line number of the failure when the format is line oriented
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::MissingHeader { line, .. }
            | Self::InvalidIndex { line, .. }
            | Self::MissingTiming { line, .. }
            | Self::InvalidTime { line, .. }
            | Self::UnexpectedEof { line, .. }
            | Self::InvalidFrames { line, .. }
            | Self::Io { line, .. } => Some(*line),
            Self::MalformedXml { .. }
            | Self::MissingElement { .. }
            | Self::MisalignedLanguages { .. } => None,
        }
    }
}
