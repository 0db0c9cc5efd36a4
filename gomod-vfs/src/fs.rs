//! Filesystem seam and the on-disk implementation

use crate::path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (or anything that is not a directory)
    File,
    /// Directory
    Dir,
}

/// A single entry returned by `read_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: EntryKind,
}

impl DirEntry {
    /// Create a new directory entry
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Base name of the entry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the entry
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Read access to a tree of files addressed by relative slash paths.
pub trait FileSystem: Send + Sync {
    /// List a directory, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Read a file's contents.
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Report whether a path is a file or directory.
    fn stat(&self, path: &str) -> io::Result<EntryKind>;
}

/// Real filesystem rooted at a directory
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    /// Create a filesystem rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory on disk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative path
    pub fn locate(&self, path: &str) -> io::Result<PathBuf> {
        let path = path::clean(path)?;
        if path == "." {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(path))
        }
    }
}

impl FileSystem for OsFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let dir = self.locate(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks; a dangling link still shows up as a file
            let kind = match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() => EntryKind::Dir,
                _ => EntryKind::File,
            };
            entries.push(DirEntry::new(name, kind));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.locate(path)?)
    }

    fn stat(&self, path: &str) -> io::Result<EntryKind> {
        let meta = fs::metadata(self.locate(path)?)?;
        Ok(if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_os_fs_read_dir_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.go"), "package b").unwrap();
        fs::write(temp.path().join("a.go"), "package a").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let osfs = OsFs::new(temp.path());
        let entries = osfs.read_dir(".").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a.go", "b.go", "sub"]);
        assert!(entries[2].is_dir());
        assert_eq!(osfs.stat("sub").unwrap(), EntryKind::Dir);
        assert_eq!(osfs.read_file("a.go").unwrap(), b"package a");
    }

    #[test]
    fn test_os_fs_rejects_escape() {
        let temp = TempDir::new().unwrap();
        let osfs = OsFs::new(temp.path());
        let err = osfs.read_file("../outside").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
