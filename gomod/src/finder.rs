//! Locating modules on disk
//!
//! The finder walks upward from a directory to the first `go.mod` and
//! memoizes the resulting module by its root directory, so every caller
//! asking about the same tree shares one [`Module`].

use crate::env::Env;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::modcache::ModCache;
use crate::module::{Module, Parts};
use crate::resolver::Resolver;
use crate::{ModError, Result};
use dashmap::DashMap;
use gomod_vfs::FileCache;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Per-call overrides for [`Finder::find_with`] and [`Finder::parse`]
#[derive(Debug, Clone, Default)]
pub struct Options {
    mod_cache: Option<ModCache>,
    file_cache: Option<FileCache>,
}

impl Options {
    /// No overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `cache` for required modules instead of the finder's
    pub fn mod_cache(mut self, cache: ModCache) -> Self {
        self.mod_cache = Some(cache);
        self
    }

    /// Serve the module tree through an existing file cache
    pub fn file_cache(mut self, cache: FileCache) -> Self {
        self.file_cache = Some(cache);
        self
    }
}

/// State shared by a finder and every module it produced
#[derive(Debug)]
pub(crate) struct Session {
    env: Arc<Env>,
    modcache: ModCache,
    resolver: Arc<Resolver>,
    modules: DashMap<PathBuf, Arc<Module>>,
}

/// Locates and memoizes modules. Cloning shares the memo.
#[derive(Debug, Clone)]
pub struct Finder {
    session: Arc<Session>,
}

impl Default for Finder {
    fn default() -> Self {
        Self::new(Env::from_env())
    }
}

impl Finder {
    /// Create a finder with the default resolver
    pub fn new(env: Env) -> Self {
        Self::with_resolver(env, Resolver::default())
    }

    /// Create a finder from the loaded configuration
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(Env::load()?))
    }

    /// Create a finder with a custom resolver
    pub fn with_resolver(env: Env, resolver: Resolver) -> Self {
        let modcache = ModCache::new(env.mod_cache_dir());
        Self::detached(Arc::new(env), modcache, Arc::new(resolver))
    }

    pub(crate) fn detached(env: Arc<Env>, modcache: ModCache, resolver: Arc<Resolver>) -> Self {
        Self {
            session: Arc::new(Session {
                env,
                modcache,
                resolver,
                modules: DashMap::new(),
            }),
        }
    }

    pub(crate) fn from_session(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Environment
    pub fn env(&self) -> &Env {
        &self.session.env
    }

    /// Default module cache
    pub fn mod_cache(&self) -> &ModCache {
        &self.session.modcache
    }

    /// Number of memoized modules
    pub fn len(&self) -> usize {
        self.session.modules.len()
    }

    /// Whether nothing has been memoized yet
    pub fn is_empty(&self) -> bool {
        self.session.modules.is_empty()
    }

    /// Locate the module containing `dir`
    pub fn find(&self, dir: impl AsRef<Path>) -> Result<Arc<Module>> {
        self.find_with(dir, Options::default())
    }

    /// Locate the module containing `dir`.
    ///
    /// Directories under the standard library yield the `std` module.
    /// Directories inside a cached module version whose download carries no
    /// manifest get one synthesized from the cache path. Options only apply
    /// when the module is not memoized yet.
    pub fn find_with(&self, dir: impl AsRef<Path>, options: Options) -> Result<Arc<Module>> {
        let start = absolute(dir.as_ref())?;
        if start.starts_with(self.session.env.std_dir()) {
            return Ok(self.std_module());
        }

        let modcache = options
            .mod_cache
            .unwrap_or_else(|| self.session.modcache.clone());
        let (root, synthesized) = locate_root(&start, &modcache)?;

        if let Some(module) = self.session.modules.get(&root) {
            trace!("Module cache hit: {:?}", root);
            return Ok(Arc::clone(module.value()));
        }

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = match synthesized {
            Some(module_path) => {
                debug!("Synthesizing manifest for {} at {:?}", module_path, root);
                Manifest::new(manifest_path, module_path)
            }
            None => Manifest::from_file(&manifest_path)?,
        };
        let module = self.build(root.clone(), false, manifest, modcache, options.file_cache);
        info!("Found module {} at {:?}", module.import_path(), root);

        let entry = self.session.modules.entry(root).or_insert(module);
        Ok(Arc::clone(entry.value()))
    }

    /// Build a module from manifest bytes without touching the memo.
    ///
    /// The module root is the directory containing `path`.
    pub fn parse(&self, path: impl AsRef<Path>, data: &[u8], options: Options) -> Result<Arc<Module>> {
        let path = absolute(path.as_ref())?;
        let manifest = Manifest::parse(&path, data)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ModError::OutsideModule { dir: path.clone() })?;
        let modcache = options
            .mod_cache
            .unwrap_or_else(|| self.session.modcache.clone());
        Ok(self.build(root, false, manifest, modcache, options.file_cache))
    }

    /// The standard library pseudo-module rooted at `<goroot>/src`
    pub fn std_module(&self) -> Arc<Module> {
        let root = self.session.env.std_dir();
        let entry = self.session.modules.entry(root.clone()).or_insert_with(|| {
            let manifest = Manifest::new(root.join(MANIFEST_FILE), "std");
            self.build(root, true, manifest, self.session.modcache.clone(), None)
        });
        Arc::clone(entry.value())
    }

    fn build(
        &self,
        dir: PathBuf,
        is_std: bool,
        manifest: Manifest,
        modcache: ModCache,
        file_cache: Option<FileCache>,
    ) -> Arc<Module> {
        Arc::new(Module::from_parts(Parts {
            dir,
            is_std,
            manifest,
            modcache,
            file_cache: file_cache.unwrap_or_default(),
            env: Arc::clone(&self.session.env),
            resolver: Arc::clone(&self.session.resolver),
            session: Arc::downgrade(&self.session),
        }))
    }
}

/// Walk upward from `start` to the first directory holding a manifest.
///
/// Inside the module cache the walk stops at the version directory; when it
/// holds no manifest the module path decoded from the cache is returned for
/// synthesis.
fn locate_root(start: &Path, modcache: &ModCache) -> Result<(PathBuf, Option<String>)> {
    let cached = modcache.module_root(start);
    let mut dir = start;
    loop {
        let candidate = dir.join(MANIFEST_FILE);
        match fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => return Ok((dir.to_path_buf(), None)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ModError::io(candidate, e)),
        }
        if let Some((module_path, _, root)) = &cached {
            if dir == root.as_path() {
                return Ok((root.clone(), Some(module_path.clone())));
            }
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err(ModError::not_exist(format!(
                    "{} in {} or any parent directory",
                    MANIFEST_FILE,
                    start.display()
                )))
            }
        }
    }
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ModError::io(dir, e))?;
    Ok(cwd.join(dir))
}
