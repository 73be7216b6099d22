//! Error types for caption conversion
//!
//! `CoreError` is the crate-wide error returned by every fallible operation.
//! `ParseError` describes why a single `read` call rejected its input; it is
//! always wrapped in `CoreError::Parse` together with the format that failed.
//!
//! # Error Philosophy
//!
//! - Use `thiserror` for structured error handling (no `anyhow`)
//! - Name the offending input fragment and its location
//! - Detection mismatches are not errors: `detect` returns `false`
//! - Unsupported style markup is not an error: it degrades to plain text
//!
//! # Examples
//!
//! ```rust
//! use caption_core::utils::errors::CoreError;
//!
//! let err = CoreError::invalid_time("00:00:xx,000", "seconds are not a number");
//! assert!(err.is_recoverable());
//! assert!(err.to_string().contains("00:00:xx,000"));
//! ```

mod core;
mod parse;

pub use self::core::{CoreError, Result};
pub use parse::ParseError;
