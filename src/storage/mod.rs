//! Storage module for persisting chunk records
//!
//! Records are written through the [`ChunkSink`] trait. The built-in sink writes one
//! JSON file per chunk; every write goes to a temporary file that is renamed into place,
//! so a record on disk is always complete.

mod json;
mod traits;

pub use json::{sanitize_url, JsonFileSink};
pub use traits::{ChunkSink, StorageError, StorageResult};

use atomic_write_file::AtomicWriteFile;
use std::io::Write;
use std::path::Path;

/// Atomically replaces `path` with `contents`, creating parent directories
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut file = AtomicWriteFile::open(path).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.commit().map_err(io_err)
}
