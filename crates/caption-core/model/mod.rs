//! Canonical document model
//!
//! Every codec reads into and writes out of these types:
//!
//! - [`Document`] owns an ordered list of [`Block`]s plus file level
//!   [`DocumentOptions`]
//! - [`Block`] is a shared timing header with a [`BlockBody`] payload
//! - [`StyledText`] holds one language's caption text as styled runs

pub mod block;
pub mod document;
pub mod options;
pub mod text;

pub use block::{
    Block, BlockBody, BlockKind, Caption, Comment, Layout, Metadata, StyleContent, StyleSheet,
};
pub use document::Document;
pub use options::{DocumentOptions, MicroDvdCodes, VttIdentifiers};
pub use text::{Segment, SpanStyle, StyledText, TextFlags};
