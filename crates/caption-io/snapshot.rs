//! JSON snapshots of a document
//!
//! A snapshot keeps everything the engine knows about a document: blocks in
//! order, the extension table, frame rate and the MicroDVD and VTT
//! registries. Loading one gives back an equal document.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use caption_core::Document;

use crate::error::{IoError, Result};
use crate::save::write_atomic;

/// Write `document` to `path` as pretty printed JSON
///
/// # Errors
///
/// Returns [`IoError::Snapshot`] if serialization fails and
/// [`IoError::File`] if the file cannot be written.
pub fn save_json(document: &Document, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    write_atomic(path, &bytes)?;
    log::debug!("Saved snapshot of {} blocks to {}", document.len(), path.display());
    Ok(())
}

/// Load a document written by [`save_json`]
///
/// # Errors
///
/// Returns [`IoError::File`] if the file cannot be read and
/// [`IoError::Snapshot`] if it is not a document snapshot.
pub fn load_json(path: &Path) -> Result<Document> {
    let file = File::open(path).map_err(|err| IoError::file(path, err))?;
    let document: Document = serde_json::from_reader(BufReader::new(file))?;
    Ok(document)
}
