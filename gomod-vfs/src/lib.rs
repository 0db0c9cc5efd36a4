//! Cached file view for module trees
//!
//! This crate provides the filesystem layer the module resolver and its
//! consumers read through:
//! - A `FileSystem` seam with an on-disk implementation rooted at a directory
//! - An in-memory `MapFs` used to seed directories
//! - `CachedFs`, which remembers what it has seen until a watcher explicitly
//!   signals a create or delete through its `FileCache`
//!
//! Paths are always slash-separated and relative to the filesystem root,
//! with `"."` naming the root itself.

pub mod cache;
pub mod fs;
pub mod map;
pub mod path;

pub use cache::{CachedFs, FileCache};
pub use fs::{DirEntry, EntryKind, FileSystem, OsFs};
pub use map::MapFs;
