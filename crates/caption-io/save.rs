//! Writing caption files

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use caption_core::{Dispatcher, Document, FormatKind, SaveOptions};
use tempfile::NamedTempFile;

use crate::error::{IoError, Result};
use crate::open::attach_path;

/// Replace `path` with `bytes` in one step
///
/// The bytes go to a temporary file beside `path` which is synced and then
/// renamed over it. Missing parent directories are created.
///
/// # Errors
///
/// Returns [`IoError::File`] when any step fails; `path` keeps its previous
/// content in that case.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| IoError::file(parent, err))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|err| IoError::file(parent, err))?;
    temp.write_all(bytes).map_err(|err| IoError::file(temp.path(), err))?;
    temp.flush().map_err(|err| IoError::file(temp.path(), err))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| IoError::file(temp.path(), err))?;
    temp.persist(path).map_err(|err| IoError::file(path, err.error))?;
    Ok(())
}

/// Write `document` as `kind` to exactly `path`
///
/// # Errors
///
/// Returns [`IoError::Core`] when the document cannot be encoded and
/// [`IoError::File`] when the file cannot be written.
pub fn save_file(
    dispatcher: &Dispatcher,
    document: &Document,
    path: &Path,
    kind: FormatKind,
    options: &SaveOptions,
) -> Result<()> {
    let text = dispatcher
        .save_to_string(document, kind, options)
        .map_err(|err| attach_path(path, err))?;
    write_atomic(path, text.as_bytes())?;
    log::debug!("Wrote {kind} to {}", path.display());
    Ok(())
}

/// Write `document` once per format in `kinds`
///
/// Filenames are derived from `base` with the document's extension table;
/// with [`SaveOptions::include_languages_in_filename`] the written
/// languages are added, so `movie` saved in French as SRT becomes
/// `movie.fr.srt`. Returns the paths written, in `kinds` order.
///
/// # Errors
///
/// Stops at the first format that fails; files already written are kept.
pub fn save_files(
    dispatcher: &Dispatcher,
    document: &Document,
    base: &Path,
    kinds: &[FormatKind],
    options: &SaveOptions,
) -> Result<Vec<PathBuf>> {
    let languages = options.languages_for(document);
    let mut written = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let path = document.extensions.make_filename(
            base,
            kind,
            &languages,
            options.include_languages_in_filename,
        );
        save_file(dispatcher, document, &path, kind, options)?;
        written.push(path);
    }
    Ok(written)
}
