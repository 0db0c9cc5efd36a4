use gomod_vfs::{CachedFs, EntryKind, FileCache, FileSystem, MapFs, OsFs};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn tree() -> MapFs {
    MapFs::new()
        .with_file("go.mod", "module app.com\n")
        .with_file("a/a.go", "package a\n")
        .with_file("a/b.go", "package a\n")
        .with_file("a/inner/c.go", "package inner\n")
}

#[test]
fn test_in_memory_backend() {
    let fsys = CachedFs::new(tree());

    let names: Vec<_> = fsys
        .read_dir("a")
        .unwrap()
        .iter()
        .map(|e| (e.name().to_string(), e.kind()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("a.go".to_string(), EntryKind::File),
            ("b.go".to_string(), EntryKind::File),
            ("inner".to_string(), EntryKind::Dir),
        ]
    );

    fsys.cache().delete("a/inner");
    assert_eq!(fsys.read_dir("a").unwrap().len(), 2);
    assert!(fsys.read_dir("a/inner").is_err());
    assert!(fsys.stat("a/inner/c.go").is_err());
}

#[test]
fn test_some_exist_after_invalidation() {
    let temp = TempDir::new().unwrap();
    tree().write_to(temp.path()).unwrap();
    let fsys = CachedFs::new(OsFs::new(temp.path()));

    let found = fsys.some_exist(["a/a.go", "a/b.go", "a/missing.go"]);
    assert_eq!(found.len(), 2);

    fs::write(temp.path().join("a/missing.go"), "package a\n").unwrap();
    assert_eq!(fsys.some_exist(["a/missing.go"]).len(), 0);

    fsys.cache().create("a/missing.go");
    assert_eq!(fsys.some_exist(["a/missing.go"]).len(), 1);
}

#[test]
fn test_invalidation_visible_across_threads() {
    let temp = TempDir::new().unwrap();
    tree().write_to(temp.path()).unwrap();
    let cache = FileCache::new();
    let fsys = Arc::new(CachedFs::with_cache(OsFs::new(temp.path()), cache.clone()));

    assert_eq!(fsys.read_dir("a").unwrap().len(), 3);
    cache.delete("a/b.go");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fsys = Arc::clone(&fsys);
            thread::spawn(move || fsys.read_dir("a").unwrap().len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}

#[test]
fn test_cached_fs_is_a_file_system() {
    fn count<F: FileSystem>(fsys: &F, dir: &str) -> usize {
        fsys.read_dir(dir).map(|entries| entries.len()).unwrap_or(0)
    }

    let fsys = CachedFs::new(tree());
    assert_eq!(count(&fsys, "."), 2);
    assert_eq!(fsys.read_file("go.mod").unwrap().len(), "module app.com\n".len());
}
