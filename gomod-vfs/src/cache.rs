//! Invalidation-driven file cache
//!
//! `CachedFs` serves directory listings, file contents and stats from a
//! `FileCache`. Once a path has been read it is never re-read from the
//! underlying filesystem until the cache is told otherwise through
//! `FileCache::create` or `FileCache::delete`. The cache never polls.

use crate::fs::{DirEntry, EntryKind, FileSystem, OsFs};
use crate::path;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Listing of a directory. A `None` kind marks a name that was announced
/// through `create` and has not been stat'ed yet.
type Listing = BTreeMap<String, Option<EntryKind>>;

#[derive(Debug, Clone)]
enum Slot {
    /// Seen on disk (or announced and since read)
    Present(Node),
    /// Explicitly deleted, or observed missing
    Absent,
    /// Announced by a watcher; the next read goes to disk
    Created,
}

#[derive(Debug, Clone)]
struct Node {
    kind: EntryKind,
    listing: Option<Listing>,
    data: Option<Arc<[u8]>>,
}

impl Node {
    fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            listing: None,
            data: None,
        }
    }
}

enum Lookup {
    Hit(Node),
    Gone,
    Miss,
}

/// Thread-safe cache of filesystem state keyed by relative path.
///
/// Cloning shares the same underlying cache, so a watcher can hold one
/// handle while readers hold another.
#[derive(Debug, Clone, Default)]
pub struct FileCache {
    inner: Arc<RwLock<FxHashMap<String, Slot>>>,
}

impl FileCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as existing.
    ///
    /// Cached contents for the path are dropped so the next read goes to
    /// the filesystem, and the name is added to every cached ancestor
    /// listing.
    pub fn create(&self, path: &str) {
        let path = match path::clean(path) {
            Ok(path) => path,
            Err(e) => {
                warn!("Ignoring create for invalid path: {}", e);
                return;
            }
        };

        let mut slots = self.inner.write();
        slots.retain(|key, _| !path::is_below(key, &path));
        slots.insert(path.clone(), Slot::Created);

        let mut child = path.clone();
        let mut kind = None;
        while let Some(parent) = path::parent(&child) {
            let parent = parent.to_string();
            match slots.get_mut(&parent) {
                Some(Slot::Present(node)) => {
                    if let Some(listing) = node.listing.as_mut() {
                        listing
                            .entry(path::base(&child).to_string())
                            .or_insert(kind);
                    }
                }
                Some(Slot::Absent) => {
                    slots.insert(parent.clone(), Slot::Created);
                }
                Some(Slot::Created) | None => {}
            }
            child = parent;
            kind = Some(EntryKind::Dir);
        }
        debug!("Marked created in file cache: {}", path);
    }

    /// Mark `path` (and everything below it) as deleted and drop it from
    /// its parent's cached listing.
    pub fn delete(&self, path: &str) {
        let path = match path::clean(path) {
            Ok(path) => path,
            Err(e) => {
                warn!("Ignoring delete for invalid path: {}", e);
                return;
            }
        };

        let mut slots = self.inner.write();
        slots.retain(|key, _| !path::is_below(key, &path));
        slots.insert(path.clone(), Slot::Absent);

        if let Some(parent) = path::parent(&path) {
            if let Some(Slot::Present(node)) = slots.get_mut(parent) {
                if let Some(listing) = node.listing.as_mut() {
                    listing.remove(path::base(&path));
                }
            }
        }
        debug!("Marked deleted in file cache: {}", path);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.inner.write().clear();
        debug!("Cleared file cache");
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    fn lookup(&self, path: &str) -> Lookup {
        let slots = self.inner.read();
        let mut ancestor = path::parent(path);
        while let Some(dir) = ancestor {
            if let Some(Slot::Absent) = slots.get(dir) {
                return Lookup::Gone;
            }
            ancestor = path::parent(dir);
        }
        match slots.get(path) {
            Some(Slot::Present(node)) => Lookup::Hit(node.clone()),
            Some(Slot::Absent) => Lookup::Gone,
            Some(Slot::Created) | None => Lookup::Miss,
        }
    }

    /// Record what the filesystem reported for `path` and return the node
    /// readers should see. A concurrent delete wins over a stale read.
    fn remember(&self, path: &str, kind: EntryKind, update: impl FnOnce(&mut Node)) -> Node {
        let mut slots = self.inner.write();
        match slots.get_mut(path) {
            Some(Slot::Present(node)) => {
                node.kind = kind;
                update(node);
                node.clone()
            }
            Some(Slot::Absent) => {
                let mut node = Node::new(kind);
                update(&mut node);
                node
            }
            Some(Slot::Created) | None => {
                let mut node = Node::new(kind);
                update(&mut node);
                slots.insert(path.to_string(), Slot::Present(node.clone()));
                node
            }
        }
    }

    /// Created paths stay listed even when the disk disagrees.
    fn forget_missing(&self, path: &str) {
        let mut slots = self.inner.write();
        if !slots.contains_key(path) {
            slots.insert(path.to_string(), Slot::Absent);
        }
    }

    /// Store a listing read from the filesystem.
    ///
    /// Deletes and creates recorded for children are applied under the same
    /// write guard that stores the listing, so an invalidation racing with
    /// the read is never lost.
    fn remember_listing(&self, dir: &str, entries: Vec<DirEntry>) -> Listing {
        let mut slots = self.inner.write();
        let mut listing: Listing = entries
            .into_iter()
            .map(|e| (e.name().to_string(), Some(e.kind())))
            .collect();
        for (key, slot) in slots.iter() {
            if key == dir || path::parent(key) != Some(dir) {
                continue;
            }
            match slot {
                Slot::Absent => {
                    listing.remove(path::base(key));
                }
                Slot::Created => {
                    listing.entry(path::base(key).to_string()).or_insert(None);
                }
                Slot::Present(_) => {}
            }
        }

        match slots.get_mut(dir) {
            Some(Slot::Present(node)) => {
                node.kind = EntryKind::Dir;
                node.listing = Some(listing.clone());
            }
            Some(Slot::Absent) => {}
            Some(Slot::Created) | None => {
                let mut node = Node::new(EntryKind::Dir);
                node.listing = Some(listing.clone());
                slots.insert(dir.to_string(), Slot::Present(node));
            }
        }
        listing
    }
}

/// A filesystem whose reads are served from a `FileCache`
#[derive(Debug, Clone)]
pub struct CachedFs<F: FileSystem = OsFs> {
    fs: F,
    cache: FileCache,
}

impl<F: FileSystem> CachedFs<F> {
    /// Wrap `fs` with a fresh cache
    pub fn new(fs: F) -> Self {
        Self::with_cache(fs, FileCache::new())
    }

    /// Wrap `fs` with an existing cache handle
    pub fn with_cache(fs: F, cache: FileCache) -> Self {
        Self { fs, cache }
    }

    /// The cache handle, for watchers to signal changes through
    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// The wrapped filesystem
    pub fn inner(&self) -> &F {
        &self.fs
    }

    /// List a directory, sorted by name
    pub fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let dir = path::clean(dir)?;
        let listing = match self.cache.lookup(&dir) {
            Lookup::Gone => return Err(not_exist(&dir)),
            Lookup::Hit(Node {
                listing: Some(listing),
                ..
            }) => {
                trace!("File cache hit for directory: {}", dir);
                listing
            }
            Lookup::Hit(_) | Lookup::Miss => {
                trace!("File cache miss for directory: {}", dir);
                self.load_listing(&dir)?
            }
        };

        let mut entries = Vec::with_capacity(listing.len());
        for (name, kind) in listing {
            let kind = match kind {
                Some(kind) => kind,
                None => match self.stat(&path::join(&dir, &name)) {
                    Ok(kind) => kind,
                    // Announced but not on disk yet
                    Err(e) if e.kind() == io::ErrorKind::NotFound => EntryKind::File,
                    Err(e) => return Err(e),
                },
            };
            entries.push(DirEntry::new(name, kind));
        }
        Ok(entries)
    }

    /// Read a file's contents
    pub fn read_file(&self, file: &str) -> io::Result<Arc<[u8]>> {
        let file = path::clean(file)?;
        match self.cache.lookup(&file) {
            Lookup::Gone => return Err(not_exist(&file)),
            Lookup::Hit(Node {
                kind: EntryKind::Dir,
                ..
            }) => return Err(is_a_directory(&file)),
            Lookup::Hit(Node { data: Some(data), .. }) => {
                trace!("File cache hit for file: {}", file);
                return Ok(data);
            }
            Lookup::Hit(_) | Lookup::Miss => {}
        }

        trace!("File cache miss for file: {}", file);
        let data: Arc<[u8]> = match self.fs.read_file(&file) {
            Ok(data) => data.into(),
            Err(e) => return Err(self.on_error(&file, e)),
        };
        let node = self.cache.remember(&file, EntryKind::File, |node| {
            node.data = Some(Arc::clone(&data));
        });
        Ok(node.data.unwrap_or(data))
    }

    /// Report whether a path is a file or directory
    pub fn stat(&self, target: &str) -> io::Result<EntryKind> {
        let target = path::clean(target)?;
        match self.cache.lookup(&target) {
            Lookup::Gone => return Err(not_exist(&target)),
            Lookup::Hit(node) => return Ok(node.kind),
            Lookup::Miss => {}
        }

        let kind = match self.fs.stat(&target) {
            Ok(kind) => kind,
            Err(e) => return Err(self.on_error(&target, e)),
        };
        Ok(self.cache.remember(&target, kind, |_| {}).kind)
    }

    /// Whether a path exists as far as the cache is concerned
    pub fn exists(&self, target: &str) -> bool {
        self.stat(target).is_ok()
    }

    /// The subset of `paths` that exist
    pub fn some_exist<'a, I>(&self, paths: I) -> FxHashSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|p| self.exists(p))
            .map(|p| p.to_string())
            .collect()
    }

    fn load_listing(&self, dir: &str) -> io::Result<Listing> {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => return Err(self.on_error(dir, e)),
        };
        Ok(self.cache.remember_listing(dir, entries))
    }

    /// Remember paths observed missing; other failures pass through untouched.
    fn on_error(&self, target: &str, err: io::Error) -> io::Error {
        if err.kind() == io::ErrorKind::NotFound {
            self.cache.forget_missing(target);
        }
        err
    }
}

impl<F: FileSystem> FileSystem for CachedFs<F> {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        CachedFs::read_dir(self, dir)
    }

    fn read_file(&self, file: &str) -> io::Result<Vec<u8>> {
        CachedFs::read_file(self, file).map(|data| data.to_vec())
    }

    fn stat(&self, target: &str) -> io::Result<EntryKind> {
        CachedFs::stat(self, target)
    }
}

fn not_exist(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}: file does not exist", path))
}

fn is_a_directory(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: is a directory", path))
}
