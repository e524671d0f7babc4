//! Single-directory listing.
//!
//! The scanner only reads names and entry types. Classification and overlay
//! resolution happen in `FsSource`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One visible entry of a physical directory.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    /// Entry name as found on disk.
    pub name: String,
    /// Absolute path.
    pub path: PathBuf,
    pub is_dir: bool,
    /// The entry itself is a symbolic link.
    pub is_symlink: bool,
}

/// True if the linked directory resolves to `root` or to one of the
/// directories on the way from `root` to `dir`.
///
/// `dir` is the slash separated path of the directory holding the link.
pub(crate) fn links_to_ancestor(root: &Path, dir: &str, link: &Path) -> bool {
    let Ok(target) = link.canonicalize() else {
        return false;
    };
    let mut current = root.to_path_buf();
    if current.canonicalize().is_ok_and(|c| c == target) {
        return true;
    }
    for segment in dir.split('/').filter(|s| !s.is_empty()) {
        current.push(segment);
        if current.canonicalize().is_ok_and(|c| c == target) {
            return true;
        }
    }
    false
}

/// List a directory, skipping hidden entries.
///
/// Entries whose type can't be determined are treated as files. Names that
/// are not valid UTF-8 are skipped with a warning.
pub(crate) fn list_dir(dir: &Path) -> io::Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        // Follow symlinks so linked directories are walked too
        let is_dir = fs::metadata(entry.path()).is_ok_and(|m| m.is_dir());
        let is_symlink = entry.file_type().is_ok_and(|t| t.is_symlink());
        entries.push(RawEntry {
            path: entry.path(),
            name,
            is_dir,
            is_symlink,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_list_dir_sorted_without_hidden() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.md"), "").unwrap();
        fs::write(temp.path().join("a.md"), "").unwrap();
        fs::write(temp.path().join(".hidden"), "").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let entries = list_dir(temp.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();

        assert_eq!(names, vec![("a.md", false), ("b.md", false), ("sub", true)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_links_to_ancestor() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("content");
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::create_dir_all(temp.path().join("shared")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("blog/loop")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("shared"), root.join("blog/shared")).unwrap();

        let entries = list_dir(&root.join("blog")).unwrap();
        assert!(entries.iter().all(|e| e.is_dir && e.is_symlink));

        assert!(links_to_ancestor(&root, "blog", &root.join("blog/loop")));
        assert!(!links_to_ancestor(&root, "blog", &root.join("blog/shared")));
    }

    #[test]
    fn test_list_dir_missing() {
        let err = list_dir(Path::new("/nonexistent/weft")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
