//! In-memory file tree

use crate::fs::{DirEntry, EntryKind, FileSystem};
use crate::path;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// In-memory files keyed by relative path. Directories are implied by the
/// files beneath them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MapFs {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    /// Builder form of `insert`
    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the map holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Materialize every file under `dir`, creating parent directories.
    ///
    /// Stops at the first failure; files already written stay on disk.
    pub fn write_to(&self, dir: &Path) -> io::Result<()> {
        for (name, data) in &self.files {
            let rel = path::clean(name)?;
            let target = dir.join(&rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, data)?;
        }
        debug!("Wrote {} files to {:?}", self.files.len(), dir);
        Ok(())
    }

    fn is_dir(&self, dir: &str) -> bool {
        dir == "." || self.files.keys().any(|name| path::is_below(name, dir))
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for MapFs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MapFs::new();
        for (path, data) in iter {
            map.insert(path, data);
        }
        map
    }
}

impl FileSystem for MapFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let dir = path::clean(dir)?;
        if !self.is_dir(&dir) {
            return Err(not_found(&dir));
        }
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for name in self.files.keys() {
            if !path::is_below(name, &dir) {
                continue;
            }
            let rest = if dir == "." { name.as_str() } else { &name[dir.len() + 1..] };
            match rest.find('/') {
                Some(idx) => {
                    children.insert(rest[..idx].to_string(), EntryKind::Dir);
                }
                None => {
                    children.entry(rest.to_string()).or_insert(EntryKind::File);
                }
            }
        }
        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry::new(name, kind))
            .collect())
    }

    fn read_file(&self, file: &str) -> io::Result<Vec<u8>> {
        let file = path::clean(file)?;
        self.files.get(&file).cloned().ok_or_else(|| not_found(&file))
    }

    fn stat(&self, target: &str) -> io::Result<EntryKind> {
        let target = path::clean(target)?;
        if self.files.contains_key(&target) {
            Ok(EntryKind::File)
        } else if self.is_dir(&target) {
            Ok(EntryKind::Dir)
        } else {
            Err(not_found(&target))
        }
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}: file does not exist", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> MapFs {
        MapFs::new()
            .with_file("go.mod", "module app.com")
            .with_file("main.go", "package main")
            .with_file("web/router/router.go", "package router")
    }

    #[test]
    fn test_map_read_dir() {
        let map = sample();
        let names: Vec<_> = map
            .read_dir(".")
            .unwrap()
            .into_iter()
            .map(|e| (e.name().to_string(), e.is_dir()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("go.mod".to_string(), false),
                ("main.go".to_string(), false),
                ("web".to_string(), true),
            ]
        );
        assert_eq!(map.stat("web/router").unwrap(), EntryKind::Dir);
        assert!(map.read_dir("missing").is_err());
    }

    #[test]
    fn test_map_write_to() {
        let temp = TempDir::new().unwrap();
        sample().write_to(temp.path()).unwrap();
        let router = fs::read_to_string(temp.path().join("web/router/router.go")).unwrap();
        assert_eq!(router, "package router");
    }
}
