//! Filesystem surface for caption-core
//!
//! Opens caption files by sniffing their content, writes one file per
//! requested format with generated names, and keeps JSON snapshots of a
//! [`Document`](caption_core::Document). Every write goes through a
//! temporary file in the destination directory that is renamed into place,
//! so a failed save never leaves a truncated file behind.
//!
//! # Example
//!
//! ```rust,no_run
//! use caption_core::{Dispatcher, FormatKind, ReadOptions, SaveOptions};
//! use caption_io::{open_file, save_files};
//! use std::path::Path;
//!
//! let dispatcher = Dispatcher::new();
//! let document = open_file(&dispatcher, Path::new("movie.en.srt"), &ReadOptions::default())?;
//! let written = save_files(
//!     &dispatcher,
//!     &document,
//!     Path::new("movie"),
//!     &[FormatKind::Vtt, FormatKind::Ttml],
//!     &SaveOptions::default(),
//! )?;
//! assert_eq!(written.len(), 2);
//! # Ok::<(), caption_io::IoError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod join;
pub mod open;
pub mod save;
pub mod snapshot;

pub use error::{IoError, Result};
pub use join::join_file;
pub use open::open_file;
pub use save::{save_file, save_files, write_atomic};
pub use snapshot::{load_json, save_json};
