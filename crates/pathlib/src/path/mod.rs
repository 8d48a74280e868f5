/* 📖 # What is the path layer?

`Path` is the contract every backend implements: path arithmetic (absolute, parent, join)
plus file and directory operations. `OsPath` implements it against the host filesystem,
`VirtualPath` against any `VirtualFs`. Code that takes a `PathHandle` or `&dyn Path` runs
unchanged on either.
*/

mod lexical;
mod memory_fs;
mod os_path;
mod traits;
mod vfs;
mod virtual_path;

pub use memory_fs::MemoryFs;
pub use os_path::OsPath;
pub use traits::{DEFAULT_FILE_MODE, FileRo, FileRw, Mode, OpenFlags, Path, PathHandle};
pub use vfs::{EntryKind, VfsHandle, VfsMetadata, VirtualFs};
pub use virtual_path::VirtualPath;
