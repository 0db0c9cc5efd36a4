//! Import path resolution
//!
//! An import path is mapped to a directory by trying a fixed sequence of
//! tiers. Each tier either claims the import (returning a directory or a
//! hard error) or passes it on to the next one.

use crate::finder::Options;
use crate::manifest::{has_path_prefix, Replace, MANIFEST_FILE};
use crate::module::Module;
use crate::{ModError, Result};
use gomod_vfs::EntryKind;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One resolution strategy
pub trait Tier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Resolve `import_path` against `module`.
    ///
    /// `Ok(None)` passes the import to the next tier.
    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>>;
}

/// Ordered list of tiers
pub struct Resolver {
    tiers: Vec<Box<dyn Tier>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("tiers", &self.tier_names()).finish()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SelfTree),
            Box::new(NestedModule),
            Box::new(Replaced),
            Box::new(Required),
            Box::new(Stdlib),
            Box::new(NestedScan),
        ])
    }
}

impl Resolver {
    /// Create a resolver trying `tiers` in order
    pub fn new(tiers: Vec<Box<dyn Tier>>) -> Self {
        Self { tiers }
    }

    /// Tier names in the order they are tried
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve `import_path` to a directory, failing with `NotExist` when no
    /// tier claims it
    pub fn resolve(&self, module: &Module, import_path: &str) -> Result<PathBuf> {
        for tier in &self.tiers {
            if let Some(dir) = tier.resolve(module, import_path)? {
                debug!("Resolved {} via {} to {:?}", import_path, tier.name(), dir);
                return Ok(dir);
            }
            trace!("Tier {} passed on {}", tier.name(), import_path);
        }
        Err(ModError::not_exist(import_path))
    }
}

/// Packages inside the module's own tree
pub struct SelfTree;

impl Tier for SelfTree {
    fn name(&self) -> &'static str {
        "self"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        let Some(rel) = relative_import(module.import_path(), import_path) else {
            return Ok(None);
        };
        if nested_boundary(module, rel)?.is_some() {
            return Ok(None);
        }
        match module.stat(rel) {
            Ok(EntryKind::Dir) => Ok(Some(module.directory_join(&[rel]))),
            Ok(EntryKind::File) => Ok(None),
            Err(e) if e.is_not_exist() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Subdirectories that declare their own module
pub struct NestedModule;

impl Tier for NestedModule {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        let Some(rel) = relative_import(module.import_path(), import_path) else {
            return Ok(None);
        };
        let Some(boundary) = nested_boundary(module, rel)? else {
            return Ok(None);
        };
        let Some(nested) = locate_nested(module, &boundary)? else {
            return Err(ModError::not_exist(import_path));
        };
        debug!(
            "Delegating {} to nested module {} at {:?}",
            import_path,
            nested.import_path(),
            nested.directory()
        );
        nested.resolve_directory(import_path).map(Some)
    }
}

/// `replace` directives
pub struct Replaced;

impl Tier for Replaced {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        let (replace, required) = {
            let manifest = module.manifest();
            let Some(replace) = select_replace(manifest.replaces(), import_path, |path| {
                manifest.require(path).map(|r| r.version.clone())
            }) else {
                return Ok(None);
            };
            let required = manifest
                .require(&replace.old.path)
                .or_else(|| manifest.require(&replace.new.path))
                .map(|r| r.version.clone());
            (replace, required)
        };
        let suffix = import_path[replace.old.path.len()..].trim_start_matches('/');

        if replace.is_local() {
            let target = Path::new(&replace.new.path);
            let base = if target.is_absolute() {
                target.to_path_buf()
            } else {
                module.directory().join(target)
            };
            let dir = normalize(&join_suffix(base, suffix));
            return if dir_exists(&dir)? {
                Ok(Some(dir))
            } else {
                Err(ModError::not_exist(import_path))
            };
        }

        let Some(version) = replace.new.version.clone().or(required) else {
            return Err(ModError::not_exist(import_path));
        };
        let root = module.mod_cache().resolve_directory(&replace.new.path, &version);
        cached_package(root, suffix, import_path).map(Some)
    }
}

/// Required modules in the module cache
pub struct Required;

impl Tier for Required {
    fn name(&self) -> &'static str {
        "require"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        let found = {
            let manifest = module.manifest();
            let mut best: Option<(String, String)> = None;
            for require in manifest.requires() {
                if !has_path_prefix(import_path, &require.path) {
                    continue;
                }
                let longer = best
                    .as_ref()
                    .map_or(true, |(path, _)| require.path.len() >= path.len());
                if longer {
                    best = Some((require.path.clone(), require.version.clone()));
                }
            }
            best
        };
        let Some((module_path, version)) = found else {
            return Ok(None);
        };
        let suffix = import_path[module_path.len()..].trim_start_matches('/');
        let root = module.mod_cache().resolve_directory(&module_path, &version);
        cached_package(root, suffix, import_path).map(Some)
    }
}

/// The standard library under `<goroot>/src`
pub struct Stdlib;

impl Tier for Stdlib {
    fn name(&self) -> &'static str {
        "std"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        // Standard library paths never start with a domain.
        let first = import_path.split('/').next().unwrap_or_default();
        if first.is_empty() || first.contains('.') {
            return Ok(None);
        }
        let dir = join_suffix(module.env().std_dir(), import_path);
        if dir_exists(&dir)? {
            Ok(Some(dir))
        } else {
            Ok(None)
        }
    }
}

/// Nested modules anywhere below the root, whatever path they declare.
///
/// Runs after every other tier. The walk is served by the file cache.
pub struct NestedScan;

impl Tier for NestedScan {
    fn name(&self) -> &'static str {
        "nested-scan"
    }

    fn resolve(&self, module: &Module, import_path: &str) -> Result<Option<PathBuf>> {
        if module.is_std() {
            return Ok(None);
        }
        for boundary in nested_roots(module)? {
            let Some(nested) = locate_nested(module, &boundary)? else {
                continue;
            };
            if has_path_prefix(import_path, nested.import_path()) {
                debug!(
                    "Found {} in nested module {} at {:?}",
                    import_path,
                    nested.import_path(),
                    nested.directory()
                );
                return nested.resolve_directory(import_path).map(Some);
            }
        }
        Ok(None)
    }
}

/// Path of `import_path` relative to `module_path`: `"."` for the module
/// itself, `None` when outside
fn relative_import<'a>(module_path: &str, import_path: &'a str) -> Option<&'a str> {
    if !has_path_prefix(import_path, module_path) {
        return None;
    }
    let rel = import_path[module_path.len()..].trim_start_matches('/');
    Some(if rel.is_empty() { "." } else { rel })
}

/// First directory on the way down to `rel` that holds its own manifest
pub(crate) fn nested_boundary(module: &Module, rel: &str) -> Result<Option<String>> {
    if rel == "." {
        return Ok(None);
    }
    let segments: Vec<&str> = rel.split('/').collect();
    for depth in 1..=segments.len() {
        let prefix = segments[..depth].join("/");
        match module.stat(&prefix) {
            Ok(EntryKind::Dir) => {}
            Ok(EntryKind::File) => return Ok(None),
            Err(e) if e.is_not_exist() => return Ok(None),
            Err(e) => return Err(e),
        }
        match module.stat(&format!("{}/{}", prefix, MANIFEST_FILE)) {
            Ok(EntryKind::File) => return Ok(Some(prefix)),
            Ok(EntryKind::Dir) => {}
            Err(e) if e.is_not_exist() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Locate the module rooted at `boundary` below `module`.
///
/// The boundary comes from the file cache while the finder reads the disk.
/// When the two disagree (a manifest deleted without invalidation) the
/// finder lands on an ancestor and `None` is returned.
pub(crate) fn locate_nested(module: &Module, boundary: &str) -> Result<Option<Arc<Module>>> {
    let dir = module.directory_join(&[boundary]);
    let options = Options::new().mod_cache(module.mod_cache().clone());
    let nested = module.finder().find_with(&dir, options)?;
    if nested.directory() != dir.as_path() {
        warn!(
            "Stale manifest in file cache: {:?} belongs to {:?}",
            dir,
            nested.directory()
        );
        return Ok(None);
    }
    Ok(Some(nested))
}

/// Directories below the root holding their own manifest. The walk does
/// not descend into them, nor into hidden, `_`-prefixed, `testdata` or
/// `vendor` directories.
fn nested_roots(module: &Module) -> Result<Vec<String>> {
    let mut roots = Vec::new();
    let mut pending = vec![".".to_string()];
    while let Some(dir) = pending.pop() {
        let entries = match module.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_exist() => continue,
            Err(e) => return Err(e),
        };
        for entry in entries.iter().filter(|e| e.is_dir()) {
            let name = entry.name();
            if name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor" {
                continue;
            }
            let child = if dir == "." {
                name.to_string()
            } else {
                format!("{}/{}", dir, name)
            };
            match module.stat(&format!("{}/{}", child, MANIFEST_FILE)) {
                Ok(EntryKind::File) => roots.push(child),
                Ok(EntryKind::Dir) => pending.push(child),
                Err(e) if e.is_not_exist() => pending.push(child),
                Err(e) => return Err(e),
            }
        }
    }
    roots.sort();
    Ok(roots)
}

/// The replacement covering `import_path` with the longest old path. Later
/// directives win ties. A versioned old path only applies when the
/// requirement pins exactly that version.
fn select_replace<F>(replaces: &[Replace], import_path: &str, required: F) -> Option<Replace>
where
    F: Fn(&str) -> Option<String>,
{
    let mut best: Option<&Replace> = None;
    for replace in replaces {
        if !replace.old.covers(import_path) {
            continue;
        }
        if let Some(version) = &replace.old.version {
            if required(&replace.old.path).as_ref() != Some(version) {
                continue;
            }
        }
        if best.map_or(true, |b| replace.old.path.len() >= b.old.path.len()) {
            best = Some(replace);
        }
    }
    best.cloned()
}

fn cached_package(root: PathBuf, suffix: &str, import_path: &str) -> Result<PathBuf> {
    if !dir_exists(&root)? {
        return Err(ModError::not_exist(import_path));
    }
    let dir = join_suffix(root, suffix);
    if !dir_exists(&dir)? {
        return Err(ModError::not_exist(import_path));
    }
    Ok(dir)
}

fn join_suffix(mut dir: PathBuf, suffix: &str) -> PathBuf {
    for segment in suffix.split('/').filter(|s| !s.is_empty() && *s != ".") {
        dir.push(segment);
    }
    dir
}

fn dir_exists(dir: &Path) -> Result<bool> {
    match fs::metadata(dir) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ModError::io(dir, e)),
    }
}

/// Lexically resolve `.` and `..`
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
