//! # Caption Core
//!
//! Conversion engine for timed text: SubRip (SRT), WebVTT, TTML and
//! MicroDVD (SUB). Every codec reads into and writes out of one canonical
//! [`Document`], so any supported format can be re-emitted as any other
//! while keeping timing, multi-language text and inline styling.
//!
//! ## Features
//!
//! - **Microsecond time model**: one [`MicroTime`] type with SRT, VTT,
//!   frame based and TTML codecs
//! - **Tagged blocks**: captions, comments, styles, layouts and metadata as
//!   a sum type with secondary id indices kept in sync by the document
//! - **Style bridge**: bold, italic, underline, colour, font family and
//!   font size mapped between SRT tags, VTT CSS, MicroDVD control codes and
//!   TTML `tts:*` attributes
//! - **Reflow**: language aware line wrapping with per-line budget ratios
//! - **Dispatch**: content sniffing over every codec in a fixed priority
//!   order
//!
//! ## Quick Start
//!
//! ```rust
//! use caption_core::{Dispatcher, FormatKind, ReadOptions, SaveOptions};
//!
//! let srt = "1\n00:00:01,000 --> 00:00:03,000\nHello world\n";
//!
//! let dispatcher = Dispatcher::new();
//! let document = dispatcher.read_str(srt, &ReadOptions::default())?;
//! let vtt = dispatcher.save_to_string(&document, FormatKind::Vtt, &SaveOptions::default())?;
//!
//! assert!(vtt.starts_with("WEBVTT"));
//! assert!(vtt.contains("00:00:01.000 --> 00:00:03.000\nHello world"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod formats;
pub mod model;
pub mod reflow;
pub mod style;
pub mod time;
pub mod utils;

pub use formats::{
    CaptionFormat, Dispatcher, FileExtensions, FormatInfo, FormatKind, LineMode, ReadOptions,
    SaveOptions,
};
pub use model::{Block, BlockBody, Document, SpanStyle, StyledText, TextFlags};
pub use reflow::{reflow, ReflowOptions};
pub use time::MicroTime;
pub use utils::{CoreError, ParseError, Result};

/// Crate version for runtime compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
