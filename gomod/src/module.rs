//! A located module and its view of the filesystem

use crate::env::Env;
use crate::finder::{Finder, Options, Session};
use crate::manifest::Manifest;
use crate::modcache::ModCache;
use crate::resolver::{locate_nested, nested_boundary, Resolver};
use crate::{ModError, Result};
use gomod_vfs::{CachedFs, DirEntry, EntryKind, FileCache, OsFs};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::trace;

/// A module rooted at the directory holding its manifest.
///
/// Modules are shared through `Arc` and are safe to use from many threads.
/// The manifest lock is not reentrant: do not resolve imports while holding
/// the guard returned by [`Module::manifest_mut`].
#[derive(Debug)]
pub struct Module {
    import: String,
    dir: PathBuf,
    is_std: bool,
    manifest: RwLock<Manifest>,
    modcache: ModCache,
    fs: CachedFs<OsFs>,
    env: Arc<Env>,
    resolver: Arc<Resolver>,
    session: Weak<Session>,
}

pub(crate) struct Parts {
    pub dir: PathBuf,
    pub is_std: bool,
    pub manifest: Manifest,
    pub modcache: ModCache,
    pub file_cache: FileCache,
    pub env: Arc<Env>,
    pub resolver: Arc<Resolver>,
    pub session: Weak<Session>,
}

impl Module {
    pub(crate) fn from_parts(parts: Parts) -> Self {
        Self {
            import: parts.manifest.module().to_string(),
            fs: CachedFs::with_cache(OsFs::new(&parts.dir), parts.file_cache),
            dir: parts.dir,
            is_std: parts.is_std,
            manifest: RwLock::new(parts.manifest),
            modcache: parts.modcache,
            env: parts.env,
            resolver: parts.resolver,
            session: parts.session,
        }
    }

    /// Declared module path (`"std"` for the standard library).
    ///
    /// Fixed when the module is located; later manifest edits do not change
    /// it.
    pub fn import_path(&self) -> &str {
        &self.import
    }

    /// Join segments onto the module path
    pub fn import_join(&self, segments: &[&str]) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.is_std {
            parts.push(&self.import);
        }
        parts.extend(
            segments
                .iter()
                .flat_map(|s| s.split('/'))
                .filter(|s| !s.is_empty() && *s != "."),
        );
        if parts.is_empty() {
            self.import.clone()
        } else {
            parts.join("/")
        }
    }

    /// Root directory
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Join slash-separated segments onto the root directory
    pub fn directory_join(&self, segments: &[&str]) -> PathBuf {
        let mut dir = self.dir.clone();
        for part in segments.iter().flat_map(|s| s.split('/')) {
            if !part.is_empty() && part != "." {
                dir.push(part);
            }
        }
        dir
    }

    /// Whether this is the standard library pseudo-module
    pub fn is_std(&self) -> bool {
        self.is_std
    }

    /// Read access to the manifest
    pub fn manifest(&self) -> RwLockReadGuard<'_, Manifest> {
        self.manifest.read()
    }

    /// Write access to the manifest. Changes are in memory until
    /// [`Manifest::save`].
    pub fn manifest_mut(&self) -> RwLockWriteGuard<'_, Manifest> {
        self.manifest.write()
    }

    /// Module cache used for required modules
    pub fn mod_cache(&self) -> &ModCache {
        &self.modcache
    }

    /// Environment this module was located in
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Cached view of the module tree
    pub fn fs(&self) -> &CachedFs<OsFs> {
        &self.fs
    }

    /// Handle to the file cache, for invalidation by a watcher
    pub fn file_cache(&self) -> &FileCache {
        self.fs.cache()
    }

    /// List a directory relative to the root
    pub fn read_dir(&self, rel: &str) -> Result<Vec<DirEntry>> {
        self.fs.read_dir(rel).map_err(|e| ModError::io(self.directory_join(&[rel]), e))
    }

    /// Read a file relative to the root
    pub fn read_file(&self, rel: &str) -> Result<Arc<[u8]>> {
        self.fs.read_file(rel).map_err(|e| ModError::io(self.directory_join(&[rel]), e))
    }

    /// Kind of the entry at `rel`
    pub fn stat(&self, rel: &str) -> Result<EntryKind> {
        self.fs.stat(rel).map_err(|e| ModError::io(self.directory_join(&[rel]), e))
    }

    /// Resolve an import path to a directory
    pub fn resolve_directory(&self, import_path: &str) -> Result<PathBuf> {
        self.resolver.resolve(self, import_path)
    }

    /// Map a directory back to an import path.
    ///
    /// Directories under the standard library, under this module's root and
    /// inside the cached copy of a required module are addressable. A
    /// directory inside a nested module gets that module's path. Anything
    /// else fails with `OutsideModule`.
    pub fn resolve_import(&self, dir: &Path) -> Result<String> {
        if let Ok(rel) = dir.strip_prefix(self.env.std_dir()) {
            let rel = slash_path(rel);
            return Ok(if rel.is_empty() { "std".to_string() } else { rel });
        }
        if let Ok(rel) = dir.strip_prefix(&self.dir) {
            let rel = slash_path(rel);
            if !self.is_std && !rel.is_empty() {
                if let Some(boundary) = nested_boundary(self, &rel)? {
                    if let Some(nested) = locate_nested(self, &boundary)? {
                        return nested.resolve_import(dir);
                    }
                }
            }
            return Ok(self.import_join(&[rel.as_str()]));
        }

        let manifest = self.manifest();
        for require in manifest.requires().iter().rev() {
            let root = self.modcache.resolve_directory(&require.path, &require.version);
            if let Ok(rel) = dir.strip_prefix(&root) {
                let rel = slash_path(rel);
                return Ok(if rel.is_empty() {
                    require.path.clone()
                } else {
                    format!("{}/{}", require.path, rel)
                });
            }
        }
        Err(ModError::OutsideModule {
            dir: dir.to_path_buf(),
        })
    }

    /// Resolve `import_path` and locate the module that owns it
    pub fn find(&self, import_path: &str) -> Result<Arc<Module>> {
        let dir = self.resolve_directory(import_path)?;
        trace!("Finding module for {} in {:?}", import_path, dir);
        let options = Options::new().mod_cache(self.modcache.clone());
        self.finder().find_with(&dir, options)
    }

    /// The finder this module came from, or a detached one when it has been
    /// dropped
    pub(crate) fn finder(&self) -> Finder {
        match self.session.upgrade() {
            Some(session) => Finder::from_session(session),
            None => Finder::detached(
                Arc::clone(&self.env),
                self.modcache.clone(),
                Arc::clone(&self.resolver),
            ),
        }
    }
}

fn slash_path(rel: &Path) -> String {
    rel.iter()
        .map(|segment| segment.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
