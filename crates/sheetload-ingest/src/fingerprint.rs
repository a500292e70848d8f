//! Content fingerprints.

use crate::error::{IngestError, IngestResult};
use sha2::{Digest, Sha256};
use sheetload_core::ContentHash;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Calculate the SHA-256 hash of a file, streaming its content.
pub fn hash_file(path: &Path) -> IngestResult<ContentHash> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IngestError::FileNotFound(path.to_path_buf()),
        _ => IngestError::Io(e),
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;

    Ok(ContentHash::from_digest(hasher.finalize()))
}
