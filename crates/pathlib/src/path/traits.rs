use std::any::Any;
use std::fmt;
use std::io::{self, Read, Seek, Write};
use std::sync::Arc;

use crate::PathlibResult;

/// Permission bits, e.g. `0o755`. Passed through to the backend unchanged.
pub type Mode = u32;

/// Mode used by `touch` before the backend applies its umask.
pub const DEFAULT_FILE_MODE: Mode = 0o666;

/// An opened file that can be read, seeked and read at an offset.
///
/// The handle is released when dropped. `close` releases it explicitly and reports
/// errors that a drop would have to swallow.
pub trait FileRo: Read + Seek + Send {
    /// Read into `buf` starting at `offset` without moving the cursor.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Release the handle.
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// An opened file that can additionally be written.
pub trait FileRw: FileRo + Write {}
impl<T: FileRo + Write> FileRw for T {}

/// Flags merged with read-write intent by [`Path::open_rw`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub create: bool,
    pub create_new: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the file if it is missing.
    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }

    /// Create the file, failing if it already exists.
    pub fn create_new(mut self) -> Self {
        self.create_new = true;
        self
    }

    /// Truncate an existing file to zero length.
    pub fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Position every write at the end of the file.
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }
}

/* 📖 # Why is Path object safe?

Application code holds a `PathHandle` and never learns which backend is underneath, so
every operation, including the ones producing new paths, has to be callable through
`dyn Path`. Path-producing operations therefore return a `PathHandle` rather than `Self`.
*/

/// A filesystem location plus every operation that can be performed on it.
///
/// Two implementations are provided:
/// - `OsPath`: the host filesystem via `std::fs`
/// - `VirtualPath`: any injected [`VirtualFs`](super::VirtualFs), e.g. `MemoryFs`
pub trait Path: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Absolute form of this path, resolved against [`cwd`](Path::cwd).
    fn absolute(&self) -> PathlibResult<PathHandle>;

    /// The current working directory of this path's backend.
    fn cwd(&self) -> PathlibResult<PathHandle>;

    /// The absolute form of this path with its last segment removed.
    fn parent(&self) -> PathlibResult<PathHandle>;

    /// This path joined with `elems`, lexically cleaned.
    fn join_path(&self, elems: &[&str]) -> PathHandle;

    /// The stored path string, verbatim.
    fn as_str(&self) -> &str;

    /// Create the file, truncating it if it exists.
    fn touch(&self) -> PathlibResult<()>;

    /// Remove this file or link.
    fn unlink(&self) -> PathlibResult<()>;

    /// Remove this directory. The directory must be empty.
    fn rm_dir(&self) -> PathlibResult<()>;

    /// Create a directory; with `parents`, also every missing ancestor.
    fn mk_dir(&self, mode: Mode, parents: bool) -> PathlibResult<()>;

    /// Open for reading.
    fn open(&self) -> PathlibResult<Box<dyn FileRo>>;

    /// Open for reading and writing, honouring `flags`.
    fn open_rw(&self, flags: OpenFlags, mode: Mode) -> PathlibResult<Box<dyn FileRw>>;

    /// Change the permission bits.
    fn chmod(&self, mode: Mode) -> PathlibResult<()>;

    /// Move this path to `target`, which must belong to the same backend.
    fn rename(&self, target: &dyn Path) -> PathlibResult<()>;

    /// Whether anything exists at this path. Never fails.
    fn exists(&self) -> bool;

    /// Whether this path is a directory. Never fails.
    fn is_dir(&self) -> bool;

    /// Whether this path is a regular file. Never fails.
    fn is_file(&self) -> bool;

    /// Whether the stored string is absolute.
    fn is_abs(&self) -> bool;

    /// Read the entire file.
    fn read_bytes(&self) -> PathlibResult<Vec<u8>>;

    /// Read the entire file as text. The bytes are not transcoded.
    fn read_text(&self) -> PathlibResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| {
                crate::err!(
                    "File is not valid UTF-8: {} (invalid byte at offset {})",
                    self.as_str(),
                    e.utf8_error().valid_up_to()
                )
            })
    }

    /// Create or truncate the file and write all of `data`.
    fn write_bytes(&self, data: &[u8]) -> PathlibResult<()>;

    /// Write `text` verbatim via [`write_bytes`](Path::write_bytes).
    fn write_text(&self, text: &str) -> PathlibResult<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Used by `rename` to recognise targets of the same backend.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a path value of any backend.
///
/// # Examples
///
/// ```
/// use pathlib::{OsPath, PathHandle};
///
/// let path = PathHandle::new(OsPath::new("src"));
/// let main = path.join_path(&["main.rs"]);
/// assert_eq!(main.as_str(), "src/main.rs");
/// ```
#[derive(Debug, Clone)]
pub struct PathHandle(Arc<dyn Path>);

impl PathHandle {
    /// Create a new PathHandle from a Path implementation.
    pub fn new(path: impl Path) -> Self {
        Self(Arc::new(path))
    }
}

impl std::ops::Deref for PathHandle {
    type Target = dyn Path;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}
