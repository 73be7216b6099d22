//! Appending one caption file to a document

use std::path::Path;

use caption_core::{Dispatcher, Document, MicroTime, ReadOptions};

use crate::error::Result;
use crate::open::open_file;

/// Read `path` and append its blocks to `document`
///
/// With no languages in `options` or the filename, the file is read into
/// the document's default language. With `add_end_time` the joined blocks
/// start after the document's current end; `offset` is added on top.
/// MicroDVD classes and VTT identifiers of the file are re-registered in
/// `document` so they cannot collide.
///
/// # Errors
///
/// See [`open_file`]. `document` is unchanged on error.
pub fn join_file(
    dispatcher: &Dispatcher,
    document: &mut Document,
    path: &Path,
    options: &ReadOptions,
    add_end_time: bool,
    offset: MicroTime,
) -> Result<()> {
    let options = if options.languages.is_empty()
        && caption_core::utils::languages_from_filename(path).is_empty()
    {
        options.clone().with_languages(&[document.default_language()])
    } else {
        options.clone()
    };
    let other = open_file(dispatcher, path, &options)?;
    let before = document.len();
    document.join(&other, add_end_time, offset);
    log::debug!(
        "Joined {} blocks from {}",
        document.len() - before,
        path.display()
    );
    Ok(())
}
