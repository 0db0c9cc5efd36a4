//! Go module discovery and import resolution
//!
//! This crate provides:
//! - Parsing and formatting of `go.mod` manifests
//! - Locating the module that owns a directory, memoized per root
//! - Resolving import paths to directories through an ordered set of tiers:
//!   the module's own tree, nested modules, `replace` directives, required
//!   modules in the module cache and finally the standard library
//! - Mapping directories back to import paths
//! - An invalidation-driven cached view of each module's files

pub mod env;
pub mod error;
pub mod finder;
pub mod manifest;
pub mod modcache;
pub mod module;
pub mod resolver;

pub use env::Env;
pub use error::{ModError, Result};
pub use finder::{Finder, Options};
pub use manifest::{Directive, Manifest, ModuleVersion, Replace, Require, MANIFEST_FILE};
pub use modcache::{Files, ModCache, Modules};
pub use module::Module;
pub use resolver::{Resolver, Tier};

pub use gomod_vfs::{DirEntry, EntryKind, FileCache};
