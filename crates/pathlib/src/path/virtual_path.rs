use std::any::Any;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::ErrorKind;
use crate::{PathlibError, PathlibResult, ResultExt};

use super::lexical;
use super::traits::{FileRo, FileRw, Mode, OpenFlags, Path, PathHandle};
use super::vfs::{VfsHandle, VfsMetadata};

/// Mode `write_bytes` creates files with.
const WRITE_MODE: Mode = 0o777;

/* 📖 # Where does VirtualPath differ from OsPath?

- `unlink` and `rm_dir` both go through `VirtualFs::remove`, so `unlink` also removes an
  empty directory.
- `cwd` is always `/`; there is no process state behind a virtual filesystem.
- `absolute` is a lexical join of `cwd` and the stored path.
Test doubles depend on these, so they stay as they are.
*/

/// Path on an injected [`VirtualFs`](super::VirtualFs).
///
/// All paths derived from one `VirtualPath` share its filesystem handle.
#[derive(Clone)]
pub struct VirtualPath {
    fs: VfsHandle,
    path: String,
}

impl VirtualPath {
    /// Create a path on `fs`. Nothing is checked or normalized.
    pub fn new(fs: VfsHandle, path: impl Into<String>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// The filesystem this path lives on.
    pub fn fs(&self) -> &VfsHandle {
        &self.fs
    }

    fn sibling(&self, path: impl Into<String>) -> PathHandle {
        PathHandle::new(Self::new(Arc::clone(&self.fs), path))
    }

    fn file_error(&self, source: io::Error) -> Box<PathlibError> {
        debug!(path = %self.path, error = %source, "virtual filesystem primitive failed");
        Box::new(PathlibError::file(&self.path, source))
    }

    fn stat(&self) -> io::Result<VfsMetadata> {
        self.fs.stat(&self.path)
    }

    fn same_fs(&self, other: &VirtualPath) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.fs), Arc::as_ptr(&other.fs))
    }
}

impl Path for VirtualPath {
    fn absolute(&self) -> PathlibResult<PathHandle> {
        let cwd = self.cwd().context("get absolute failed")?;
        Ok(self.sibling(lexical::join_slash(cwd.as_str(), &[&self.path])))
    }

    fn cwd(&self) -> PathlibResult<PathHandle> {
        Ok(self.sibling("/"))
    }

    fn parent(&self) -> PathlibResult<PathHandle> {
        let absolute = self.absolute().map_err(|e| {
            Box::new(PathlibError::message("get parent failed").caused_by(*e))
        })?;
        Ok(self.sibling(lexical::dir_slash(absolute.as_str())))
    }

    fn join_path(&self, elems: &[&str]) -> PathHandle {
        self.sibling(lexical::join_slash(&self.path, elems))
    }

    fn as_str(&self) -> &str {
        &self.path
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn touch(&self) -> PathlibResult<()> {
        let file = self.fs.create(&self.path).map_err(|e| self.file_error(e))?;
        file.close().map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn unlink(&self) -> PathlibResult<()> {
        self.fs.remove(&self.path).map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn rm_dir(&self) -> PathlibResult<()> {
        self.unlink()
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn mk_dir(&self, mode: Mode, parents: bool) -> PathlibResult<()> {
        let result = if parents {
            self.fs.mkdir_all(&self.path, mode)
        } else {
            self.fs.mkdir(&self.path, mode)
        };
        result.map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn open(&self) -> PathlibResult<Box<dyn FileRo>> {
        self.fs.open(&self.path).map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn open_rw(&self, flags: OpenFlags, mode: Mode) -> PathlibResult<Box<dyn FileRw>> {
        self.fs
            .open_file(&self.path, flags, mode)
            .map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn chmod(&self, mode: Mode) -> PathlibResult<()> {
        self.fs.chmod(&self.path, mode).map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self, target), fields(path = %self.path, target = %target))]
    fn rename(&self, target: &dyn Path) -> PathlibResult<()> {
        let target = match target.as_any().downcast_ref::<VirtualPath>() {
            Some(target) if self.same_fs(target) => target,
            _ => {
                return Err(Box::new(PathlibError::new(ErrorKind::IncompatibleTarget {
                    path: self.path.clone(),
                    target: target.as_str().to_string(),
                })));
            }
        };
        self.fs
            .rename(&self.path, &target.path)
            .map_err(|e| self.file_error(e))
    }

    fn exists(&self) -> bool {
        match self.stat() {
            Ok(_) => true,
            Err(e) => e.kind() == io::ErrorKind::AlreadyExists,
        }
    }

    fn is_dir(&self) -> bool {
        self.stat().is_ok_and(|meta| meta.is_dir())
    }

    fn is_file(&self) -> bool {
        self.stat().is_ok_and(|meta| !meta.is_dir())
    }

    fn is_abs(&self) -> bool {
        self.path.starts_with('/')
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn read_bytes(&self) -> PathlibResult<Vec<u8>> {
        let mut file = self.open()?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| self.file_error(e))?;
        file.close().map_err(|e| self.file_error(e))?;
        debug!(len = data.len(), "file read");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %self.path, len = data.len()))]
    fn write_bytes(&self, data: &[u8]) -> PathlibResult<()> {
        let mut file = self.open_rw(OpenFlags::new().create().truncate(), WRITE_MODE)?;
        let written = file.write(data).map_err(|e| self.file_error(e))?;
        if written < data.len() {
            debug!(written, "backend accepted fewer bytes than supplied");
            return Err(Box::new(PathlibError::new(ErrorKind::ShortWrite {
                path: self.path.clone().into(),
                written,
                expected: data.len(),
            })));
        }
        file.close().map_err(|e| self.file_error(e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl fmt::Debug for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualPath")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{MemoryFs, VirtualFs};

    fn root() -> VirtualPath {
        VirtualPath::new(MemoryFs::handle(), "/")
    }

    #[test]
    fn test_cwd_is_always_root() {
        let path = VirtualPath::new(MemoryFs::handle(), "deep/rel");
        assert_eq!(path.cwd().unwrap().as_str(), "/");
    }

    #[test]
    fn test_absolute_joins_root() {
        let fs = MemoryFs::handle();
        let rel = VirtualPath::new(Arc::clone(&fs), "a/./b//c");
        assert_eq!(rel.absolute().unwrap().as_str(), "/a/b/c");
        assert!(!rel.is_abs());
        assert!(rel.absolute().unwrap().is_abs());

        let abs = VirtualPath::new(fs, "/x/../y");
        assert_eq!(abs.absolute().unwrap().as_str(), "/y");
    }

    #[test]
    fn test_parent_of_relative_is_absolute() {
        let path = VirtualPath::new(MemoryFs::handle(), "dir/file.txt");
        assert_eq!(path.parent().unwrap().as_str(), "/dir");
        assert_eq!(root().parent().unwrap().as_str(), "/");
    }

    #[test]
    fn test_derived_paths_share_filesystem() {
        let base = root();
        let file = base.join_path(&["shared.txt"]);
        file.write_text("one").unwrap();

        let again = VirtualPath::new(Arc::clone(base.fs()), "/shared.txt");
        assert_eq!(again.read_text().unwrap(), "one");
    }

    #[test]
    fn test_unlink_removes_empty_directory() {
        let dir = root().join_path(&["d"]);
        dir.mk_dir(0o755, false).unwrap();
        dir.unlink().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_errors_carry_native_kind() {
        let missing = root().join_path(&["missing"]);
        assert_eq!(
            missing.read_bytes().unwrap_err().io_kind(),
            Some(io::ErrorKind::NotFound)
        );
        assert_eq!(
            missing.chmod(0o600).unwrap_err().io_kind(),
            Some(io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_rename_across_filesystems_is_rejected() {
        let source = VirtualPath::new(MemoryFs::handle(), "/a");
        source.touch().unwrap();
        let other = VirtualPath::new(MemoryFs::handle(), "/b");

        let err = source.rename(&other).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IncompatibleTarget { .. }));
        assert!(source.exists());
        assert!(!other.exists());
    }

    #[test]
    fn test_chmod_passes_mode_through() {
        let fs = MemoryFs::handle();
        let file = VirtualPath::new(Arc::clone(&fs), "/f");
        file.touch().unwrap();
        file.chmod(0o400).unwrap();
        assert_eq!(fs.stat("/f").unwrap().mode, 0o400);
    }

    #[test]
    fn test_read_text_rejects_invalid_utf8() {
        let file = root().join_path(&["bin"]);
        file.write_bytes(&[b'o', b'k', 0xff, 0xfe]).unwrap();
        assert_eq!(file.read_bytes().unwrap(), vec![b'o', b'k', 0xff, 0xfe]);
        let err = file.read_text().unwrap_err();
        assert_eq!(
            err.to_string(),
            "File is not valid UTF-8: /bin (invalid byte at offset 2)"
        );
    }
}
