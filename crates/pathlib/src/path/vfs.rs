use std::fmt;
use std::io;
use std::sync::Arc;

use super::traits::{FileRo, FileRw, Mode, OpenFlags};

/// Type of a virtual filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Result of [`VirtualFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    /// Length in bytes; `0` for directories.
    pub len: u64,
    /// Permission bits.
    pub mode: Mode,
}

impl VfsMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/* 📖 # Why is VirtualFs so narrow?

`VirtualPath` needs nothing beyond these primitives, and every one of them returns a plain
`io::Error` so any in-memory filesystem or hand-written test double can implement it in a
few lines. Paths are `/`-separated strings; relative paths are relative to `/`.
*/

/// Filesystem primitives a [`VirtualPath`](super::VirtualPath) is built on.
pub trait VirtualFs: fmt::Debug + Send + Sync + 'static {
    /// Create or truncate a file and open it for reading and writing.
    fn create(&self, path: &str) -> io::Result<Box<dyn FileRw>>;

    /// Open an existing file for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn FileRo>>;

    /// Open for reading and writing, honouring `flags`; `mode` applies to new files.
    fn open_file(&self, path: &str, flags: OpenFlags, mode: Mode) -> io::Result<Box<dyn FileRw>>;

    /// Remove a file or an empty directory.
    fn remove(&self, path: &str) -> io::Result<()>;

    /// Remove an entry and everything below it. A missing path is not an error.
    fn remove_all(&self, path: &str) -> io::Result<()>;

    /// Create a directory whose parent exists.
    fn mkdir(&self, path: &str, mode: Mode) -> io::Result<()>;

    /// Create a directory and any missing ancestors.
    fn mkdir_all(&self, path: &str, mode: Mode) -> io::Result<()>;

    fn chmod(&self, path: &str, mode: Mode) -> io::Result<()>;

    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    fn stat(&self, path: &str) -> io::Result<VfsMetadata>;
}

/// Shared handle to a virtual filesystem.
pub type VfsHandle = Arc<dyn VirtualFs>;
