//! Virtual file system abstraction.
//!
//! Commands never see the host filesystem. Each session owns one [`Vfs`]
//! implementation and lends it to every command it runs. Paths are absolute
//! `/`-separated strings; implementations decide how much normalization they
//! apply.

mod memory;

pub use memory::MemoryVfs;

use decoy_types::error::Result;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// Metadata for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
}

/// Storage operations available to the dispatch layer and to commands.
///
/// Missing paths are reported as `DecoyError::NotFound`; every other failure
/// uses `DecoyError::Vfs`.
pub trait Vfs {
    /// List the direct children of a directory, sorted by name.
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read a whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or replace a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Metadata for a file or directory.
    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create a directory and any missing parents. Existing directories are
    /// not an error.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> Result<()>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Whether `path` is an existing directory.
    ///
    /// Missing paths and regular files give `Ok(false)`; any other error is
    /// passed through.
    fn dir_exists(&self, path: &str) -> Result<bool> {
        match self.stat(path) {
            Ok(meta) => Ok(meta.kind == EntryKind::Directory),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
