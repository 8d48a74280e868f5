/* 📖 # What does pathlib provide?
Path values that can be joined, resolved and used for file operations through one `Path`
trait. `OsPath` runs every operation against the host filesystem, `VirtualPath` runs them
against an injected `VirtualFs` such as the in-memory `MemoryFs`.
*/

pub mod error;
mod error_tests;
pub mod path;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, PathlibError, PathlibResult, ResultExt};
pub use path::{
    EntryKind, FileRo, FileRw, MemoryFs, Mode, OpenFlags, OsPath, Path, PathHandle, VfsHandle,
    VfsMetadata, VirtualFs, VirtualPath,
};
