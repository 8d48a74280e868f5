use std::any::Any;
use std::fmt;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};

use tracing::{debug, instrument};

use crate::error::ErrorKind;
use crate::{PathlibError, PathlibResult};

use super::lexical;
use super::traits::{DEFAULT_FILE_MODE, FileRo, FileRw, Mode, OpenFlags, Path, PathHandle};

/* 📖 # Why is OsPath a thin forwarder?

Each operation maps onto exactly one `std::fs` / `std::env` primitive and hands the host's
`io::Error` back unchanged inside `ErrorKind::FileError`. Only resolution failures get a
context phrase. The working directory is queried on every call and never cached, so a
`set_current_dir` between calls is honoured.
*/

/// Path on the host filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OsPath {
    path: String,
}

impl OsPath {
    /// Create a path from a string. Nothing is checked or normalized.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn handle(path: impl Into<String>) -> PathHandle {
        PathHandle::new(Self::new(path))
    }

    fn file_error(&self, source: io::Error) -> Box<PathlibError> {
        debug!(path = %self.path, error = %source, "filesystem primitive failed");
        Box::new(PathlibError::file(&self.path, source))
    }

    /// Generic remove: rmdir, falling back to unlink for anything that is not a directory.
    fn remove(&self) -> io::Result<()> {
        fs::remove_dir(&self.path).or_else(|dir_err| match dir_err.kind() {
            io::ErrorKind::NotADirectory => fs::remove_file(&self.path),
            _ => Err(dir_err),
        })
    }
}

impl Path for OsPath {
    #[instrument(skip(self), fields(path = %self.path))]
    fn absolute(&self) -> PathlibResult<PathHandle> {
        let path = std::path::Path::new(&self.path);
        if path.is_absolute() {
            return Ok(Self::handle(
                lexical::clean_host(path).to_string_lossy().into_owned(),
            ));
        }
        let cwd = std::env::current_dir().map_err(|e| {
            Box::new(PathlibError::file(&self.path, e).context("get absolute failed"))
        })?;
        let absolute = lexical::join_host(&cwd.to_string_lossy(), &[&self.path]);
        debug!(absolute = %absolute, "resolved absolute path");
        Ok(Self::handle(absolute))
    }

    #[instrument(skip(self))]
    fn cwd(&self) -> PathlibResult<PathHandle> {
        let cwd = std::env::current_dir()
            .map_err(|e| Box::new(PathlibError::file(".", e).context("get cwd failed")))?;
        Ok(Self::handle(cwd.to_string_lossy().into_owned()))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn parent(&self) -> PathlibResult<PathHandle> {
        let absolute = self.absolute().map_err(|e| {
            Box::new(PathlibError::message("get parent failed").caused_by(*e))
        })?;
        Ok(Self::handle(lexical::dir_host(absolute.as_str())))
    }

    fn join_path(&self, elems: &[&str]) -> PathHandle {
        Self::handle(lexical::join_host(&self.path, elems))
    }

    fn as_str(&self) -> &str {
        &self.path
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn touch(&self) -> PathlibResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        set_mode(&mut options, DEFAULT_FILE_MODE);
        options.open(&self.path).map_err(|e| self.file_error(e))?;
        debug!("file touched");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn unlink(&self) -> PathlibResult<()> {
        fs::remove_file(&self.path).map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn rm_dir(&self) -> PathlibResult<()> {
        self.remove().map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn mk_dir(&self, mode: Mode, parents: bool) -> PathlibResult<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(parents);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(&self.path).map_err(|e| self.file_error(e))?;
        debug!(parents, "directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn open(&self) -> PathlibResult<Box<dyn FileRo>> {
        let file = File::open(&self.path).map_err(|e| self.file_error(e))?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn open_rw(&self, flags: OpenFlags, mode: Mode) -> PathlibResult<Box<dyn FileRw>> {
        let mut options = OpenOptions::new();
        options
            .read(true)
            .write(true)
            .append(flags.append)
            .create(flags.create)
            .create_new(flags.create_new)
            .truncate(flags.truncate);
        set_mode(&mut options, mode);
        let file = options.open(&self.path).map_err(|e| self.file_error(e))?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn chmod(&self, mode: Mode) -> PathlibResult<()> {
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(&self.path)
                .map_err(|e| self.file_error(e))?
                .permissions();
            permissions.set_readonly(mode & 0o222 == 0);
            permissions
        };
        fs::set_permissions(&self.path, permissions).map_err(|e| self.file_error(e))
    }

    #[instrument(skip(self, target), fields(path = %self.path, target = %target))]
    fn rename(&self, target: &dyn Path) -> PathlibResult<()> {
        let Some(target) = target.as_any().downcast_ref::<OsPath>() else {
            return Err(Box::new(PathlibError::new(ErrorKind::IncompatibleTarget {
                path: self.path.clone(),
                target: target.as_str().to_string(),
            })));
        };
        fs::rename(&self.path, &target.path).map_err(|e| self.file_error(e))
    }

    fn exists(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(_) => true,
            Err(e) => e.kind() == io::ErrorKind::AlreadyExists,
        }
    }

    fn is_dir(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|meta| meta.is_dir())
    }

    fn is_file(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|meta| !meta.is_dir())
    }

    fn is_abs(&self) -> bool {
        std::path::Path::new(&self.path).is_absolute()
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn read_bytes(&self) -> PathlibResult<Vec<u8>> {
        let data = fs::read(&self.path).map_err(|e| self.file_error(e))?;
        debug!(len = data.len(), "file read");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %self.path, len = data.len()))]
    fn write_bytes(&self, data: &[u8]) -> PathlibResult<()> {
        let mut file = File::create(&self.path).map_err(|e| self.file_error(e))?;
        match file.write_all(data) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WriteZero => {
                let written = file
                    .metadata()
                    .map(|meta| meta.len() as usize)
                    .unwrap_or_default();
                Err(Box::new(PathlibError::new(ErrorKind::ShortWrite {
                    path: self.path.clone().into(),
                    written,
                    expected: data.len(),
                })))
            }
            Err(e) => Err(self.file_error(e)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for OsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[cfg(unix)]
fn set_mode(options: &mut OpenOptions, mode: Mode) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_mode(_options: &mut OpenOptions, _mode: Mode) {}

impl FileRo for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&self, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, OsPath) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = OsPath::new(temp_dir.path().to_string_lossy().into_owned());
        (temp_dir, root)
    }

    #[test]
    fn test_as_str_is_verbatim() {
        let path = OsPath::new("a//b/../c");
        assert_eq!(path.as_str(), "a//b/../c");
        assert_eq!(path.to_string(), "a//b/../c");
    }

    #[test]
    fn test_absolute_of_absolute_is_cleaned() {
        let (_temp_dir, root) = setup_test_dir();
        let messy = format!("{}/x/./y/..", root.as_str());
        let absolute = OsPath::new(messy).absolute().unwrap();
        assert_eq!(absolute.as_str(), format!("{}/x", root.as_str()));
    }

    #[test]
    fn test_relative_absolute_uses_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let absolute = OsPath::new("some/rel").absolute().unwrap();
        assert_eq!(
            absolute.as_str(),
            cwd.join("some/rel").to_string_lossy().as_ref()
        );
        assert_eq!(
            OsPath::new("x").cwd().unwrap().as_str(),
            cwd.to_string_lossy().as_ref()
        );
    }

    #[test]
    fn test_touch_and_predicates() {
        let (_temp_dir, root) = setup_test_dir();
        let file = root.join_path(&["new.txt"]);
        assert!(!file.exists());
        file.touch().unwrap();
        assert!(file.exists());
        assert!(file.is_file());
        assert!(!file.is_dir());
        assert!(root.is_dir());
    }

    #[test]
    fn test_touch_missing_parent_fails() {
        let (_temp_dir, root) = setup_test_dir();
        let err = root.join_path(&["no/such/file"]).touch().unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_unlink_directory_fails() {
        let (_temp_dir, root) = setup_test_dir();
        let dir = root.join_path(&["d"]);
        dir.mk_dir(0o755, false).unwrap();
        assert!(dir.unlink().is_err());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_rm_dir_removes_plain_file_too() {
        let (_temp_dir, root) = setup_test_dir();
        let file = root.join_path(&["f"]);
        file.touch().unwrap();
        file.rm_dir().unwrap();
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_mk_dir_and_chmod_modes() {
        use std::os::unix::fs::PermissionsExt;
        let (_temp_dir, root) = setup_test_dir();
        let dir = root.join_path(&["m"]);
        dir.mk_dir(0o700, false).unwrap();
        let mode = fs::metadata(dir.as_str()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);

        dir.chmod(0o750).unwrap();
        let mode = fs::metadata(dir.as_str()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn test_open_rw_append_and_read_at() {
        let (_temp_dir, root) = setup_test_dir();
        let file = root.join_path(&["log"]);
        file.write_text("abc").unwrap();

        let mut rw = file.open_rw(OpenFlags::new().append(), 0o644).unwrap();
        rw.write_all(b"def").unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(rw.read_at(&mut buf, 2).unwrap(), 2);
        assert_eq!(&buf, b"cd");
        rw.close().unwrap();

        let mut ro = file.open().unwrap();
        ro.seek(SeekFrom::Start(3)).unwrap();
        let mut rest = String::new();
        ro.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "def");
        ro.close().unwrap();
    }

    #[test]
    fn test_open_rw_create_new_on_existing_fails() {
        let (_temp_dir, root) = setup_test_dir();
        let file = root.join_path(&["once"]);
        file.touch().unwrap();
        let err = file
            .open_rw(OpenFlags::new().create_new(), 0o644)
            .err()
            .unwrap();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_rename_to_virtual_target_is_rejected() {
        use crate::path::{MemoryFs, VirtualPath};
        let (_temp_dir, root) = setup_test_dir();
        let file = root.join_path(&["src"]);
        file.touch().unwrap();
        let target = VirtualPath::new(MemoryFs::handle(), "/dst");
        let err = file.rename(&target).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IncompatibleTarget { .. }));
        assert!(file.exists());
    }
}
