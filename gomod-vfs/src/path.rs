//! Slash-separated relative path helpers

use std::io;

/// Normalize a relative path, resolving `.` and `..` segments.
///
/// Returns `"."` for the root. Absolute paths and paths that climb above
/// the root are rejected with `InvalidInput`.
pub fn clean(path: &str) -> io::Result<String> {
    if path.starts_with('/') {
        return Err(invalid(path));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(invalid(path));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(segments.join("/"))
    }
}

/// Parent of a cleaned path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "." {
        return None;
    }
    match path.rfind('/') {
        Some(idx) => Some(&path[..idx]),
        None => Some("."),
    }
}

/// Final segment of a cleaned path.
pub fn base(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a cleaned directory and a single name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "." {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `path` lies strictly below `dir`.
pub fn is_below(path: &str, dir: &str) -> bool {
    if dir == "." {
        return path != ".";
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

fn invalid(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid relative path: {:?}", path),
    )
}
