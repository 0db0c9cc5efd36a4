//! Module system error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for module system results
pub type Result<T> = std::result::Result<T, ModError>;

/// Errors that can occur while locating modules and resolving imports
#[derive(Error, Debug)]
pub enum ModError {
    /// Malformed manifest text
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        /// Manifest being parsed
        path: PathBuf,
        /// 1-indexed line of the failure
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Nothing satisfies the request: no manifest above a directory, an
    /// import no tier can resolve, or a subpackage missing on disk
    #[error("{what}: file does not exist")]
    NotExist {
        /// What was looked for
        what: String,
    },

    /// Filesystem failure other than a missing path
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Directory is not addressable from the module
    #[error("unable to resolve import for {}: outside of module", .dir.display())]
    OutsideModule {
        /// Directory that was asked about
        dir: PathBuf,
    },

    /// Module cache key is not of the form `path@version`
    #[error("invalid module version {key:?}: expected <path>@<version>")]
    InvalidModuleVersion {
        /// The offending key
        key: String,
    },

    /// Configuration file could not be loaded
    #[error("invalid configuration in {}: {message}", .path.display())]
    Config {
        /// Configuration file
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

impl ModError {
    /// Build a `NotExist` error
    pub fn not_exist(what: impl Into<String>) -> Self {
        ModError::NotExist { what: what.into() }
    }

    /// Wrap an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ModError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means "does not exist".
    ///
    /// True for `NotExist` and for I/O errors of kind `NotFound`. Permission
    /// and other I/O failures are never classified as missing.
    pub fn is_not_exist(&self) -> bool {
        match self {
            ModError::NotExist { .. } => true,
            ModError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
