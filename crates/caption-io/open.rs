//! Opening caption files

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use caption_core::utils::languages_from_filename;
use caption_core::{CoreError, Dispatcher, Document, ReadOptions};

use crate::error::{IoError, Result};

/// Read options for `path`, taking languages from its name when none are set
pub(crate) fn options_for(path: &Path, options: &ReadOptions) -> ReadOptions {
    if !options.languages.is_empty() {
        return options.clone();
    }
    let languages = languages_from_filename(path);
    if languages.is_empty() {
        return options.clone();
    }
    log::debug!("Languages {languages:?} taken from {}", path.display());
    options.clone().with_languages(&languages)
}

/// Engine error for `path`, with stream failures reported as file errors
pub(crate) fn attach_path(path: &Path, err: CoreError) -> IoError {
    match err {
        CoreError::Io { code: Some(code), .. } => {
            IoError::file(path, std::io::Error::from_raw_os_error(code))
        }
        CoreError::Io { code: None, message } => {
            IoError::file(path, std::io::Error::other(message))
        }
        other => IoError::Core(other),
    }
}

/// Read a caption file into a new document
///
/// The format is sniffed from the content, not the extension. When
/// `options` names no languages, the tags in the filename are used, so
/// `movie.en.fr.srt` reads two language columns. The document remembers
/// the path it came from.
///
/// # Errors
///
/// Returns [`IoError::File`] when the file cannot be opened or read, and
/// [`IoError::Core`] for unrecognised or malformed content.
pub fn open_file(dispatcher: &Dispatcher, path: &Path, options: &ReadOptions) -> Result<Document> {
    let file = File::open(path).map_err(|err| IoError::file(path, err))?;
    let mut source = BufReader::new(file);
    let mut document = dispatcher
        .read(&mut source, &options_for(path, options))
        .map_err(|err| attach_path(path, err))?;
    document.filename = Some(path.display().to_string());
    log::debug!("Opened {} ({} blocks)", path.display(), document.len());
    Ok(document)
}
