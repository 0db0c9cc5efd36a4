//! Toolchain environment configuration

use crate::{ModError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locations the resolver reads from: the standard library sources, the
/// GOPATH workspace and the module cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// Toolchain root; standard library sources live in `<goroot>/src`
    #[serde(default = "default_goroot")]
    pub goroot: PathBuf,

    /// Workspace root
    #[serde(default = "default_gopath")]
    pub gopath: PathBuf,

    /// Module cache directory (defaults to `<gopath>/pkg/mod`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gomodcache: Option<PathBuf>,
}

fn default_goroot() -> PathBuf {
    PathBuf::from("/usr/local/go")
}

fn default_gopath() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("go")
}

impl Default for Env {
    fn default() -> Self {
        Self {
            goroot: default_goroot(),
            gopath: default_gopath(),
            gomodcache: None,
        }
    }
}

impl Env {
    /// Load from the configuration file (if any), then apply `GOROOT`,
    /// `GOPATH` and `GOMODCACHE` from the process environment.
    pub fn load() -> Result<Self> {
        let env = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        Ok(env.with_vars(|key| std::env::var_os(key)))
    }

    /// Defaults overlaid with the process environment. Never reads a file.
    pub fn from_env() -> Self {
        Self::default().with_vars(|key| std::env::var_os(key))
    }

    /// Load an explicit TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ModError::io(path, e))?;
        let env: Self = toml::from_str(&content).map_err(|e| ModError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded environment from {:?}", path);
        Ok(env)
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gomod").join("config.toml"))
    }

    /// Overlay variables from `lookup`. Only the first entry of a
    /// list-valued `GOPATH` is used.
    pub fn with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(goroot) = non_empty(lookup("GOROOT")) {
            self.goroot = PathBuf::from(goroot);
        }
        if let Some(gopath) = non_empty(lookup("GOPATH")) {
            if let Some(first) = std::env::split_paths(&gopath).next() {
                self.gopath = first;
            }
        }
        if let Some(cache) = non_empty(lookup("GOMODCACHE")) {
            self.gomodcache = Some(PathBuf::from(cache));
        }
        self
    }

    /// Builder form of setting `goroot`
    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = goroot.into();
        self
    }

    /// Builder form of setting `gomodcache`
    pub fn with_mod_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.gomodcache = Some(dir.into());
        self
    }

    /// Standard library source root
    pub fn std_dir(&self) -> PathBuf {
        self.goroot.join("src")
    }

    /// Module cache directory
    pub fn mod_cache_dir(&self) -> PathBuf {
        match &self.gomodcache {
            Some(dir) => dir.clone(),
            None => self.gopath.join("pkg").join("mod"),
        }
    }

    /// Infer an import path for a directory inside `$GOPATH/src`
    pub fn infer_import(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(self.gopath.join("src")).ok()?;
        let import = rel
            .iter()
            .map(|segment| segment.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if import.is_empty() {
            None
        } else {
            Some(import)
        }
    }
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let env = Env::default();
        assert_eq!(env.std_dir(), PathBuf::from("/usr/local/go/src"));
        assert_eq!(env.mod_cache_dir(), env.gopath.join("pkg").join("mod"));
    }

    #[test]
    fn test_with_vars() {
        let env = Env::default().with_vars(vars(&[
            ("GOROOT", "/opt/go"),
            ("GOPATH", "/work/go"),
            ("GOMODCACHE", ""),
        ]));
        assert_eq!(env.goroot, PathBuf::from("/opt/go"));
        assert_eq!(env.mod_cache_dir(), PathBuf::from("/work/go/pkg/mod"));

        let env = env.with_vars(vars(&[("GOMODCACHE", "/cache/mod")]));
        assert_eq!(env.mod_cache_dir(), PathBuf::from("/cache/mod"));
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "goroot = \"/opt/go\"\ngomodcache = \"/cache/mod\"\n").unwrap();

        let env = Env::from_file(&path).unwrap();
        assert_eq!(env.goroot, PathBuf::from("/opt/go"));
        assert_eq!(env.gopath, default_gopath());
        assert_eq!(env.mod_cache_dir(), PathBuf::from("/cache/mod"));

        std::fs::write(&path, "goroot = 42\n").unwrap();
        assert!(matches!(Env::from_file(&path), Err(ModError::Config { .. })));
    }

    #[test]
    fn test_infer_import() {
        let env = Env::default().with_vars(vars(&[("GOPATH", "/work/go")]));
        assert_eq!(
            env.infer_import(Path::new("/work/go/src/github.com/me/app")),
            Some("github.com/me/app".to_string())
        );
        assert_eq!(env.infer_import(Path::new("/work/go/src")), None);
        assert_eq!(env.infer_import(Path::new("/elsewhere/app")), None);
    }
}
