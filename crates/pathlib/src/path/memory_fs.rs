use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use relative_path::RelativePathBuf;
use tracing::{debug, instrument};

use super::lexical;
use super::traits::{DEFAULT_FILE_MODE, FileRo, FileRw, Mode, OpenFlags};
use super::vfs::{EntryKind, VfsHandle, VfsMetadata, VirtualFs};

/* 📖 # How does MemoryFs store the tree?

Every entry lives in one map keyed by its root-relative, normalized path; the root is the
empty key and always exists. File contents sit behind their own `Arc<Mutex<_>>` so open
handles keep writing into the same buffer and later opens see those writes immediately.
*/

type FileData = Arc<Mutex<Vec<u8>>>;

/// Largest size a single file may grow to.
const MAX_FILE_LEN: usize = u32::MAX as usize;

#[derive(Debug)]
enum Entry {
    File { data: FileData, mode: Mode },
    Directory { mode: Mode },
}

/// In-memory [`VirtualFs`], used as the default test double for `VirtualPath`.
///
/// # Examples
///
/// ```
/// use pathlib::{MemoryFs, Path, VirtualPath};
///
/// let path = VirtualPath::new(MemoryFs::handle(), "/notes.txt");
/// path.write_text("hello").unwrap();
/// assert_eq!(path.read_text().unwrap(), "hello");
/// ```
#[derive(Debug)]
pub struct MemoryFs {
    entries: RwLock<BTreeMap<RelativePathBuf, Entry>>,
    umask: Mode,
}

impl MemoryFs {
    /// Create an empty filesystem containing only `/`.
    pub fn new() -> Self {
        Self::with_umask(0)
    }

    /// Create an empty filesystem whose new entries have `umask` cleared from their mode.
    pub fn with_umask(umask: Mode) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(RelativePathBuf::new(), Entry::Directory { mode: 0o755 });
        Self {
            entries: RwLock::new(entries),
            umask,
        }
    }

    /// A new empty filesystem behind a shared handle.
    pub fn handle() -> VfsHandle {
        Arc::new(Self::new())
    }

    fn masked(&self, mode: Mode) -> Mode {
        mode & !self.umask & 0o7777
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized map key for a virtual path string.
fn key(path: &str) -> RelativePathBuf {
    let cleaned = lexical::clean_slash(&format!("/{}", path));
    RelativePathBuf::from(cleaned.trim_start_matches('/').to_string())
}

fn fs_error(kind: io::ErrorKind, what: &str, path: &str) -> io::Error {
    io::Error::new(kind, format!("{}: {}", what, path))
}

fn not_found(path: &str) -> io::Error {
    fs_error(io::ErrorKind::NotFound, "no such file or directory", path)
}

/// Cloned view of an entry, so the map can be mutated afterwards.
enum Found {
    File(FileData),
    Directory,
    Missing,
}

fn lookup(entries: &BTreeMap<RelativePathBuf, Entry>, key: &RelativePathBuf) -> Found {
    match entries.get(key) {
        Some(Entry::File { data, .. }) => Found::File(Arc::clone(data)),
        Some(Entry::Directory { .. }) => Found::Directory,
        None => Found::Missing,
    }
}

/// The parent of `key` must exist and be a directory.
fn check_parent(
    entries: &BTreeMap<RelativePathBuf, Entry>,
    key: &RelativePathBuf,
    path: &str,
) -> io::Result<()> {
    let Some(parent) = key.parent() else {
        return Ok(());
    };
    match entries.get(parent) {
        Some(Entry::Directory { .. }) => Ok(()),
        Some(Entry::File { .. }) => Err(fs_error(
            io::ErrorKind::NotADirectory,
            "not a directory",
            parent.as_str(),
        )),
        None => Err(not_found(path)),
    }
}

fn has_children(entries: &BTreeMap<RelativePathBuf, Entry>, key: &RelativePathBuf) -> bool {
    entries
        .keys()
        .any(|candidate| candidate != key && candidate.starts_with(key))
}

impl VirtualFs for MemoryFs {
    #[instrument(skip(self))]
    fn create(&self, path: &str) -> io::Result<Box<dyn FileRw>> {
        self.open_file(
            path,
            OpenFlags::new().create().truncate(),
            DEFAULT_FILE_MODE,
        )
    }

    #[instrument(skip(self))]
    fn open(&self, path: &str) -> io::Result<Box<dyn FileRo>> {
        let entries = self.entries.read();
        match lookup(&entries, &key(path)) {
            Found::File(data) => Ok(Box::new(MemoryFile::new(data, false))),
            Found::Directory => Err(fs_error(io::ErrorKind::IsADirectory, "is a directory", path)),
            Found::Missing => Err(not_found(path)),
        }
    }

    #[instrument(skip(self))]
    fn open_file(&self, path: &str, flags: OpenFlags, mode: Mode) -> io::Result<Box<dyn FileRw>> {
        let key = key(path);
        let mut entries = self.entries.write();
        let data = match lookup(&entries, &key) {
            Found::Directory => {
                return Err(fs_error(io::ErrorKind::IsADirectory, "is a directory", path));
            }
            Found::File(_) if flags.create_new => {
                return Err(fs_error(io::ErrorKind::AlreadyExists, "file exists", path));
            }
            Found::File(data) => {
                if flags.truncate {
                    data.lock().clear();
                }
                data
            }
            Found::Missing if flags.create || flags.create_new => {
                check_parent(&entries, &key, path)?;
                let data = FileData::default();
                entries.insert(
                    key,
                    Entry::File {
                        data: Arc::clone(&data),
                        mode: self.masked(mode),
                    },
                );
                debug!("file created");
                data
            }
            Found::Missing => return Err(not_found(path)),
        };
        Ok(Box::new(MemoryFile::new(data, flags.append)))
    }

    #[instrument(skip(self))]
    fn remove(&self, path: &str) -> io::Result<()> {
        let key = key(path);
        if key.as_str().is_empty() {
            return Err(fs_error(io::ErrorKind::PermissionDenied, "cannot remove root", path));
        }
        let mut entries = self.entries.write();
        match lookup(&entries, &key) {
            Found::Missing => return Err(not_found(path)),
            Found::Directory if has_children(&entries, &key) => {
                return Err(fs_error(
                    io::ErrorKind::DirectoryNotEmpty,
                    "directory not empty",
                    path,
                ));
            }
            Found::Directory | Found::File(_) => {}
        }
        entries.remove(&key);
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove_all(&self, path: &str) -> io::Result<()> {
        let key = key(path);
        let mut entries = self.entries.write();
        if key.as_str().is_empty() {
            entries.retain(|candidate, _| candidate.as_str().is_empty());
        } else {
            entries.retain(|candidate, _| !candidate.starts_with(&key));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn mkdir(&self, path: &str, mode: Mode) -> io::Result<()> {
        let key = key(path);
        let mut entries = self.entries.write();
        if !matches!(lookup(&entries, &key), Found::Missing) {
            return Err(fs_error(io::ErrorKind::AlreadyExists, "file exists", path));
        }
        check_parent(&entries, &key, path)?;
        entries.insert(
            key,
            Entry::Directory {
                mode: self.masked(mode),
            },
        );
        Ok(())
    }

    #[instrument(skip(self))]
    fn mkdir_all(&self, path: &str, mode: Mode) -> io::Result<()> {
        let target = key(path);
        let mut entries = self.entries.write();
        let mut current = String::new();
        for segment in target.as_str().split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            let ancestor = RelativePathBuf::from(current.clone());
            match lookup(&entries, &ancestor) {
                Found::Directory => {}
                Found::File(_) => {
                    return Err(fs_error(io::ErrorKind::NotADirectory, "not a directory", &current));
                }
                Found::Missing => {
                    debug!(directory = %ancestor, "creating directory");
                    entries.insert(
                        ancestor,
                        Entry::Directory {
                            mode: self.masked(mode),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn chmod(&self, path: &str, mode: Mode) -> io::Result<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(&key(path)) {
            Some(Entry::File { mode: current, .. }) | Some(Entry::Directory { mode: current }) => {
                *current = mode & 0o7777;
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }

    #[instrument(skip(self))]
    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let from_key = key(from);
        let to_key = key(to);
        if from_key.as_str().is_empty() || to_key.as_str().is_empty() {
            return Err(fs_error(io::ErrorKind::InvalidInput, "cannot rename root", from));
        }
        let mut entries = self.entries.write();
        let source = lookup(&entries, &from_key);
        if matches!(source, Found::Missing) {
            return Err(not_found(from));
        }
        if from_key == to_key {
            return Ok(());
        }
        if to_key.starts_with(&from_key) {
            return Err(fs_error(
                io::ErrorKind::InvalidInput,
                "cannot move a directory into itself",
                to,
            ));
        }
        check_parent(&entries, &to_key, to)?;
        match (&source, lookup(&entries, &to_key)) {
            (_, Found::Missing) => {}
            (Found::Directory, Found::File(_)) => {
                return Err(fs_error(io::ErrorKind::NotADirectory, "not a directory", to));
            }
            (Found::Directory, Found::Directory) if has_children(&entries, &to_key) => {
                return Err(fs_error(
                    io::ErrorKind::DirectoryNotEmpty,
                    "directory not empty",
                    to,
                ));
            }
            (Found::File(_), Found::Directory) => {
                return Err(fs_error(io::ErrorKind::IsADirectory, "is a directory", to));
            }
            _ => {}
        }
        entries.remove(&to_key);

        let moved: Vec<RelativePathBuf> = entries
            .keys()
            .filter(|candidate| candidate.starts_with(&from_key))
            .cloned()
            .collect();
        for old_key in moved {
            if let Some(entry) = entries.remove(&old_key) {
                let suffix = &old_key.as_str()[from_key.as_str().len()..];
                let new_key = RelativePathBuf::from(format!("{}{}", to_key.as_str(), suffix));
                entries.insert(new_key, entry);
            }
        }
        debug!("entry renamed");
        Ok(())
    }

    fn stat(&self, path: &str) -> io::Result<VfsMetadata> {
        let entries = self.entries.read();
        match entries.get(&key(path)) {
            Some(Entry::File { data, mode }) => Ok(VfsMetadata {
                kind: EntryKind::File,
                len: data.lock().len() as u64,
                mode: *mode,
            }),
            Some(Entry::Directory { mode }) => Ok(VfsMetadata {
                kind: EntryKind::Directory,
                len: 0,
                mode: *mode,
            }),
            None => Err(not_found(path)),
        }
    }
}

/// Open handle onto a [`MemoryFs`] file.
#[derive(Debug)]
struct MemoryFile {
    data: FileData,
    position: u64,
    append: bool,
}

impl MemoryFile {
    fn new(data: FileData, append: bool) -> Self {
        Self {
            data,
            position: 0,
            append,
        }
    }
}

fn copy_from(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let count = buf.len().min(data.len() - start);
    buf[..count].copy_from_slice(&data[start..start + count]);
    count
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = copy_from(&self.data.lock(), self.position, buf);
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.lock().len() as u64;
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            ));
        };
        self.position = target;
        Ok(target)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock();
        if self.append {
            self.position = data.len() as u64;
        }
        let end = usize::try_from(self.position)
            .ok()
            .and_then(|start| start.checked_add(buf.len()))
            .filter(|end| *end <= MAX_FILE_LEN)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::FileTooLarge,
                    "write would grow the file past the in-memory size limit",
                )
            })?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[end - buf.len()..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileRo for MemoryFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(copy_from(&self.data.lock(), offset, buf))
    }
}
