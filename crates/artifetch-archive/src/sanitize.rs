use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve an archive entry path under `base`, rejecting absolute paths and
/// any `..` that would climb out of `base`.
pub fn sanitize_entry_path(entry: impl AsRef<Path>, base: impl AsRef<Path>) -> Result<PathBuf> {
    let entry = entry.as_ref();
    let escape = || Error::PathEscape {
        entry: entry.to_path_buf(),
    };

    let relative = normalize_relative(entry).ok_or_else(escape)?;
    if relative.as_os_str().is_empty() {
        return Err(escape());
    }
    Ok(base.as_ref().join(relative))
}

/// Check that a symlink at `link` (already under `base`) pointing at
/// `target` stays inside `base`.
pub fn sanitize_symlink_target(
    target: impl AsRef<Path>,
    link: impl AsRef<Path>,
    base: impl AsRef<Path>,
) -> Result<PathBuf> {
    let target = target.as_ref();
    let link = link.as_ref();
    let base = base.as_ref();
    let escape = || Error::SymlinkEscape {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
    };

    let link_dir = link
        .parent()
        .and_then(|p| p.strip_prefix(base).ok())
        .ok_or_else(escape)?;
    let combined = link_dir.join(target);
    normalize_relative(&combined).ok_or_else(escape)?;
    Ok(target.to_path_buf())
}

/// Collapse `.` and `..` in a relative path; `None` if it is absolute or
/// climbs above its starting point.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:/work/extract")
        } else {
            Path::new("/work/extract")
        }
    }

    #[test]
    fn test_plain_entry() {
        let resolved = sanitize_entry_path("bin/tool", base()).unwrap();
        assert_eq!(resolved, base().join("bin/tool"));
    }

    #[test]
    fn test_inner_parent_reference() {
        let resolved = sanitize_entry_path("a/../b/./c", base()).unwrap();
        assert_eq!(resolved, base().join("b/c"));
    }

    #[test]
    fn test_escaping_entry() {
        assert!(matches!(
            sanitize_entry_path("../outside", base()),
            Err(Error::PathEscape { .. })
        ));
        let absolute = if cfg!(windows) { "C:\\etc\\passwd" } else { "/etc/passwd" };
        assert!(matches!(
            sanitize_entry_path(absolute, base()),
            Err(Error::PathEscape { .. })
        ));
    }

    #[test]
    fn test_symlink_inside() {
        let link = base().join("bin/current");
        assert!(sanitize_symlink_target("../lib/tool", &link, base()).is_ok());
    }

    #[test]
    fn test_symlink_escape() {
        let link = base().join("bin/current");
        assert!(matches!(
            sanitize_symlink_target("../../secret", &link, base()),
            Err(Error::SymlinkEscape { .. })
        ));
    }
}
