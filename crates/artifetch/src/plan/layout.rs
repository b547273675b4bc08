use std::path::PathBuf;

use crate::data::DownloadParameters;

/// Directory an artifact's files are placed under.
///
/// A single-artifact download goes straight into the target directory unless
/// `include_artifact_name_in_path` is set; multi-artifact downloads always
/// get one subdirectory per artifact name.
pub fn artifact_dir(params: &DownloadParameters, artifact_name: &str, multiple: bool) -> PathBuf {
    if multiple || params.include_artifact_name_in_path {
        params.target_directory.join(artifact_name)
    } else {
        params.target_directory.clone()
    }
}

/// Path of a listed item relative to the artifact root, `/`-separated.
///
/// `None` for the root folder itself and for items outside the root.
pub fn relative_to_root(item_path: &str, root: &str) -> Option<String> {
    let path = item_path.replace('\\', "/");
    let path = path.trim_matches('/');
    let root = root.trim_matches('/');

    if root.is_empty() {
        return (!path.is_empty()).then(|| path.to_string());
    }
    let rest = path.strip_prefix(root)?.strip_prefix('/')?;
    (!rest.is_empty()).then(|| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_artifact_dir() {
        let params = DownloadParameters::new("/out");
        assert_eq!(artifact_dir(&params, "drop", false), Path::new("/out"));
        assert_eq!(artifact_dir(&params, "drop", true), Path::new("/out/drop"));

        let named = params.include_artifact_name_in_path(true);
        assert_eq!(artifact_dir(&named, "drop", false), Path::new("/out/drop"));
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(relative_to_root("drop/a.txt", "drop").as_deref(), Some("a.txt"));
        assert_eq!(relative_to_root("/drop/sub/b.txt", "drop").as_deref(), Some("sub/b.txt"));
        assert_eq!(relative_to_root("drop", "drop"), None);
        assert_eq!(relative_to_root("dropzone/a.txt", "drop"), None);
        assert_eq!(relative_to_root("other/a.txt", "drop"), None);
        assert_eq!(relative_to_root("a/b.txt", "").as_deref(), Some("a/b.txt"));
        assert_eq!(relative_to_root(r"drop\win\c.txt", "drop").as_deref(), Some("win/c.txt"));
    }
}
