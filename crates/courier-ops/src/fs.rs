//! Filesystem collaborator used by workers.
//!
//! Workers never call `std::fs` directly. Everything goes through a
//! [`FileSystem`], which keeps the engine testable with in-memory fakes and
//! keeps every blocking call in one place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use courier_core::OperationError;
use jwalk::{Parallelism, WalkDir};
use tokio_util::sync::CancellationToken;

/// What kind of filesystem object an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// One item an operation will process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Where the item lives now.
    pub path: PathBuf,
    /// Index of the top-level source this entry belongs to.
    pub root: usize,
    /// Path below that source (empty for the source itself).
    pub relative: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    /// Create an entry for a top-level source.
    pub fn root(path: impl Into<PathBuf>, root: usize, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            root,
            relative: PathBuf::new(),
            kind,
        }
    }

    /// Whether this entry is a top-level source.
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Result of a pre-scan.
#[derive(Debug, Default)]
pub struct Survey {
    /// Items in processing order (sources in the given order, each walked
    /// depth-first with siblings sorted by name).
    pub entries: Vec<Entry>,
    /// Sources or entries that could not be read.
    pub errors: Vec<OperationError>,
    /// The scan stopped early because the operation was cancelled.
    pub interrupted: bool,
}

/// Blocking filesystem primitives, one item at a time.
pub trait FileSystem: Send + Sync + 'static {
    /// Enumerate the items under `sources`.
    ///
    /// With `recursive` unset only the sources themselves are listed.
    /// Implementations check `cancel` between entries and stop early when it
    /// is tripped.
    fn count(&self, sources: &[PathBuf], recursive: bool, cancel: &CancellationToken) -> Survey;

    /// Whether anything exists at `path` (without following symlinks).
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn ensure_dir(&self, path: &Path) -> io::Result<()>;

    /// Copy a single entry. Directories are created, not filled.
    fn copy(&self, entry: &Entry, target: &Path) -> io::Result<()>;

    /// Move a single entry. Directories are created at the target; their
    /// emptied source directories are removed afterwards with [`delete`](Self::delete).
    fn rename(&self, entry: &Entry, target: &Path) -> io::Result<()>;

    /// Delete a single entry. Directories must already be empty.
    fn delete(&self, entry: &Entry) -> io::Result<()>;

    /// Move an entry to the system trash.
    fn trash(&self, entry: &Entry) -> io::Result<()>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn walk(&self, root: usize, source: &Path, cancel: &CancellationToken, survey: &mut Survey) {
        let walker = WalkDir::new(source)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1);

        for entry_result in walker {
            if cancel.is_cancelled() {
                survey.interrupted = true;
                return;
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| source.to_path_buf());
                    survey.errors.push(OperationError::new(path, err.to_string()));
                    continue;
                }
            };

            let path = entry.path();
            let relative = match path.strip_prefix(source) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            survey.entries.push(Entry {
                kind: kind_of(&entry.file_type()),
                path,
                root,
                relative,
            });
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn count(&self, sources: &[PathBuf], recursive: bool, cancel: &CancellationToken) -> Survey {
        let mut survey = Survey::default();

        for (root, source) in sources.iter().enumerate() {
            if cancel.is_cancelled() {
                survey.interrupted = true;
                break;
            }

            let metadata = match fs::symlink_metadata(source) {
                Ok(m) => m,
                Err(e) => {
                    survey
                        .errors
                        .push(OperationError::new(source.clone(), io_message(&e)));
                    continue;
                }
            };

            let kind = kind_of(&metadata.file_type());
            survey.entries.push(Entry::root(source.clone(), root, kind));
            if recursive && kind == EntryKind::Dir {
                self.walk(root, source, cancel, &mut survey);
                if survey.interrupted {
                    break;
                }
            }
        }

        survey
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy(&self, entry: &Entry, target: &Path) -> io::Result<()> {
        match entry.kind {
            EntryKind::Dir => fs::create_dir_all(target),
            EntryKind::Symlink => copy_symlink(&entry.path, target),
            EntryKind::File => fs::copy(&entry.path, target).map(|_| ()),
        }
    }

    fn rename(&self, entry: &Entry, target: &Path) -> io::Result<()> {
        if entry.is_dir() {
            return fs::create_dir_all(target);
        }

        // Fast path on the same filesystem; fall back to copy + delete.
        if fs::rename(&entry.path, target).is_ok() {
            return Ok(());
        }
        self.copy(entry, target)?;
        fs::remove_file(&entry.path)
    }

    fn delete(&self, entry: &Entry) -> io::Result<()> {
        if entry.is_dir() {
            fs::remove_dir(&entry.path)
        } else {
            fs::remove_file(&entry.path)
        }
    }

    fn trash(&self, entry: &Entry) -> io::Result<()> {
        trash::delete(&entry.path).map_err(|e| io::Error::other(e.to_string()))
    }
}

fn kind_of(file_type: &fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::File
    }
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

/// Error text without the "(os error N)" suffix.
pub(crate) fn io_message(error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        io::ErrorKind::NotFound => "No such file or directory".to_string(),
        _ => error.to_string(),
    }
}
