//! Shared module cache
//!
//! Downloaded modules live at `<dir>/<escaped path>@<version>`, where every
//! uppercase letter in the path is written as `!` followed by its lowercase
//! form so case-insensitive filesystems cannot collide two modules.

use crate::env::Env;
use crate::{ModError, Result};
use gomod_vfs::MapFs;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File name to contents
pub type Files = BTreeMap<String, String>;

/// `path@version` key to the files of that module version
pub type Modules = BTreeMap<String, Files>;

/// A module cache rooted at one directory
#[derive(Debug, Clone)]
pub struct ModCache {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Default for ModCache {
    /// The cache named by the process environment
    fn default() -> Self {
        Self::new(Env::from_env().mod_cache_dir())
    }
}

impl PartialEq for ModCache {
    fn eq(&self, other: &Self) -> bool {
        self.dir == other.dir
    }
}

impl Eq for ModCache {}

impl ModCache {
    /// Create a cache rooted at `dir`. Nothing is created on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Join path segments onto the root. Segments may contain `/`.
    pub fn directory(&self, segments: &[&str]) -> PathBuf {
        join_slashed(&self.dir, segments)
    }

    /// Directory where `module_path@version` is (or would be) stored
    pub fn resolve_directory(&self, module_path: &str, version: &str) -> PathBuf {
        let escaped = format!("{}@{}", escape_path(module_path), version);
        join_slashed(&self.dir, &[escaped.as_str()])
    }

    /// Whether a module version is present
    pub fn contains(&self, module_path: &str, version: &str) -> bool {
        self.resolve_directory(module_path, version).is_dir()
    }

    /// Identify the cached module containing `dir`, if any.
    ///
    /// Returns the unescaped module path, its version and the module's root
    /// directory inside the cache.
    pub fn module_root(&self, dir: &Path) -> Option<(String, String, PathBuf)> {
        let rel = dir.strip_prefix(&self.dir).ok()?;
        let mut root = self.dir.clone();
        let mut segments = Vec::new();
        for component in rel.iter() {
            let segment = component.to_str()?;
            root.push(segment);
            match segment.rsplit_once('@') {
                Some((last, version)) => {
                    segments.push(last);
                    let path = unescape_path(&segments.join("/"))?;
                    return Some((path, version.to_string(), root));
                }
                None => segments.push(segment),
            }
        }
        None
    }

    /// Write module versions into the cache.
    ///
    /// Keys are `path@version`; file names are relative to the module root.
    /// Writers are serialized per cache.
    pub fn write(&self, modules: &Modules) -> Result<()> {
        let _guard = self.write_lock.lock();
        for (key, files) in modules {
            let (module_path, version) = split_module_version(key)?;
            let dir = self.resolve_directory(module_path, version);
            let tree: MapFs = files.iter().map(|(name, data)| (name.as_str(), data.as_str())).collect();
            tree.write_to(&dir).map_err(|e| ModError::io(&dir, e))?;
            debug!("Cached {}@{} in {:?}", module_path, version, dir);
        }
        info!("Wrote {} module versions to {:?}", modules.len(), self.dir);
        Ok(())
    }
}

/// Split `path@version` at the last `@`.
///
/// Both halves must stay inside the cache: the path is made of plain
/// slash-separated elements and the version is a single element.
pub fn split_module_version(key: &str) -> Result<(&str, &str)> {
    match key.rsplit_once('@') {
        Some((path, version)) if is_cache_path(path) && is_cache_element(version) => Ok((path, version)),
        _ => Err(ModError::InvalidModuleVersion {
            key: key.to_string(),
        }),
    }
}

fn is_cache_path(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(is_cache_element)
}

fn is_cache_element(element: &str) -> bool {
    !element.is_empty() && element != "." && element != ".." && !element.contains(['/', '\\'])
}

/// Escape a module path for storage in the cache
pub fn escape_path(module_path: &str) -> String {
    let mut escaped = String::with_capacity(module_path.len());
    for c in module_path.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverse `escape_path`. Returns `None` for a malformed escape.
pub fn unescape_path(escaped: &str) -> Option<String> {
    let mut path = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => path.push(next.to_ascii_uppercase()),
                _ => return None,
            },
            c if c.is_ascii_uppercase() => return None,
            c => path.push(c),
        }
    }
    Some(path)
}

fn join_slashed(base: &Path, segments: &[&str]) -> PathBuf {
    let mut dir = base.to_path_buf();
    for part in segments.iter().flat_map(|s| s.split('/')) {
        if !part.is_empty() && part != "." && part != ".." {
            dir.push(part);
        }
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path("github.com/BurntSushi/toml"), "github.com/!burnt!sushi/toml");
        assert_eq!(
            unescape_path("github.com/!burnt!sushi/toml").as_deref(),
            Some("github.com/BurntSushi/toml")
        );
        assert_eq!(unescape_path("bad!"), None);
        assert_eq!(unescape_path("Bad"), None);
    }

    #[test]
    fn test_split_module_version() {
        assert_eq!(
            split_module_version("mod.test/module@v1.2.4").unwrap(),
            ("mod.test/module", "v1.2.4")
        );
        assert!(matches!(
            split_module_version("mod.test/module"),
            Err(ModError::InvalidModuleVersion { .. })
        ));
        assert!(split_module_version("@v1").is_err());
        assert!(split_module_version("mod.test/module@").is_err());

        for key in ["../../x@v1", "/abs/x@v1", "a//b@v1", "a/./b@v1", "a\\b@v1", "a/b@v1/../..", "a/b@.."] {
            assert!(
                matches!(split_module_version(key), Err(ModError::InvalidModuleVersion { .. })),
                "{} accepted",
                key
            );
        }
    }

    #[test]
    fn test_directory() {
        let cache = ModCache::new("/cache");
        assert_eq!(
            cache.directory(&["mod.test", "module@v1.2.4"]),
            cache.resolve_directory("mod.test/module", "v1.2.4")
        );
        assert_eq!(
            cache.resolve_directory("github.com/BurntSushi/toml", "v1.0.0"),
            PathBuf::from("/cache/github.com/!burnt!sushi/toml@v1.0.0")
        );
    }

    #[test]
    fn test_write_and_module_root() {
        let temp = TempDir::new().unwrap();
        let cache = ModCache::new(temp.path());

        let mut modules = Modules::new();
        modules.insert(
            "mod.test/Module@v1.2.4".to_string(),
            Files::from([
                ("go.mod".to_string(), "module mod.test/Module\n".to_string()),
                ("inner/inner.go".to_string(), "package inner\n".to_string()),
            ]),
        );
        cache.write(&modules).unwrap();

        assert!(cache.contains("mod.test/Module", "v1.2.4"));
        let root = cache.directory(&["mod.test", "!module@v1.2.4"]);
        assert!(root.join("inner").join("inner.go").is_file());

        let (path, version, found) = cache.module_root(&root.join("inner")).unwrap();
        assert_eq!(path, "mod.test/Module");
        assert_eq!(version, "v1.2.4");
        assert_eq!(found, root);

        assert!(cache.module_root(&cache.directory(&["mod.test"])).is_none());
        assert!(cache.module_root(Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn test_write_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        let cache = ModCache::new(temp.path());
        let mut modules = Modules::new();
        modules.insert("no-version".to_string(), Files::new());
        assert!(matches!(cache.write(&modules), Err(ModError::InvalidModuleVersion { .. })));
    }

    #[test]
    fn test_write_stays_inside_cache() {
        let temp = TempDir::new().unwrap();
        let cache = ModCache::new(temp.path().join("cache"));
        let mut modules = Modules::new();
        let mut files = Files::new();
        files.insert("go.mod".to_string(), "module x\n".to_string());
        modules.insert("../../x@v1".to_string(), files);

        assert!(matches!(cache.write(&modules), Err(ModError::InvalidModuleVersion { .. })));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
        assert_eq!(cache.directory(&["..", "x@v1"]), temp.path().join("cache/x@v1"));
    }
}
