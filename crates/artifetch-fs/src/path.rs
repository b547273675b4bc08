use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Join a `/`-separated relative item path onto `base`.
///
/// Rejects absolute paths, drive prefixes and `..` so a listed item can
/// never land outside `base`. Empty and `.` segments are dropped.
pub fn join_relative(base: impl AsRef<Path>, relative: &str) -> Result<PathBuf> {
    let invalid = |reason| Error::InvalidRelativePath {
        path: relative.to_string(),
        reason,
    };

    if relative.starts_with('/') || relative.starts_with('\\') {
        return Err(invalid("absolute path"));
    }

    let mut joined = base.as_ref().to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("parent directory reference")),
            s if s.contains(':') && cfg!(windows) => return Err(invalid("drive or stream prefix")),
            s if s.contains('\\') => return Err(invalid("backslash in segment")),
            s => joined.push(s),
        }
    }
    Ok(joined)
}

/// Render `path` relative to `root` with `/` separators.
///
/// Returns `None` when `path` is not under `root` or is not valid UTF-8.
pub fn relative_slash_path(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Option<String> {
    let relative = path.as_ref().strip_prefix(root.as_ref()).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}
