//! Mock source implementation for testing.
//!
//! Provides [`MockSource`] for unit testing without filesystem access.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::classify::{classify, split_lang};
use crate::source::{
    ContentSource, FileClass, Open, SourceEntry, SourceError, SourceErrorKind, SourceFile,
};

#[derive(Debug, Clone)]
struct MockFile {
    class: FileClass,
    lang: String,
    content: String,
}

#[derive(Debug, Default)]
struct MockFiles {
    files: RwLock<BTreeMap<String, MockFile>>,
}

impl Open for MockFiles {
    fn open(&self, filename: &Path) -> Result<Box<dyn Read + Send>, SourceError> {
        let key = filename.to_string_lossy();
        let files = self.files.read().unwrap();
        let file = files.get(key.as_ref()).ok_or_else(|| {
            SourceError::not_found(filename).with_backend("Mock")
        })?;
        Ok(Box::new(Cursor::new(file.content.clone().into_bytes())))
    }
}

/// Mock source for testing.
///
/// Stores files in memory, keyed by relative path. Directory listings are
/// derived from the stored paths. Use the builder methods to configure the
/// mock with test data.
///
/// # Example
///
/// ```ignore
/// use weft_source::{ContentSource, MockSource};
///
/// let source = MockSource::new()
///     .with_file("blog/_index.md", "---\ntitle: Blog\n---\n")
///     .with_file("blog/post.md", "");
///
/// let entries = source.read_dir("blog").unwrap();
/// ```
#[derive(Debug)]
pub struct MockSource {
    files: Arc<MockFiles>,
    languages: Vec<String>,
    failing: RwLock<HashSet<String>>,
    vanished: RwLock<HashSet<String>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            files: Arc::new(MockFiles::default()),
            languages: vec!["en".to_owned()],
            failing: RwLock::new(HashSet::new()),
            vanished: RwLock::new(HashSet::new()),
        }
    }
}

impl MockSource {
    /// Create a new empty mock source with a single `en` language.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the known languages. The first one is the default language.
    #[must_use]
    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|&l| l.to_owned()).collect();
        self
    }

    /// Add a file, classifying it by name.
    ///
    /// A language segment in the name (`post.fr.md`) assigns the file to
    /// that language, otherwise the default language is used.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: &str, content: impl Into<String>) -> Self {
        let path = normalize(path);
        let name = path.rsplit_once('/').map_or(path.as_str(), |(_, n)| n);
        let class = classify(name, &self.languages);
        let base = name.rsplit_once('.').map_or(name, |(b, _)| b);
        let lang = split_lang(base, &self.languages)
            .1
            .map_or_else(|| self.default_lang().to_owned(), str::to_owned);
        self.insert(path, class, lang, content.into())
    }

    /// Add a file with an explicit language, classifying it by name.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_lang_file(self, path: &str, lang: &str, content: impl Into<String>) -> Self {
        let path = normalize(path);
        let name = path.rsplit_once('/').map_or(path.as_str(), |(_, n)| n);
        let class = classify(name, &self.languages);
        self.insert(path, class, lang.to_owned(), content.into())
    }

    /// Add a file with an explicit classification and language.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_classified(
        self,
        path: &str,
        class: FileClass,
        lang: &str,
        content: impl Into<String>,
    ) -> Self {
        let path = normalize(path);
        self.insert(path, class, lang.to_owned(), content.into())
    }

    /// Make listing the given directory fail with a permission error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_dir(self, dir: &str) -> Self {
        self.failing.write().unwrap().insert(normalize(dir));
        self
    }

    /// Make a directory show up in its parent's listing but fail with
    /// not found when read, as if it was deleted between the two calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_vanished_dir(self, dir: &str) -> Self {
        self.vanished.write().unwrap().insert(normalize(dir));
        self
    }

    /// Remove a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_file(&self, path: &str) {
        self.files.files.write().unwrap().remove(&normalize(path));
    }

    fn default_lang(&self) -> &str {
        self.languages.first().map_or("en", String::as_str)
    }

    fn insert(self, path: String, class: FileClass, lang: String, content: String) -> Self {
        self.files.files.write().unwrap().insert(
            path,
            MockFile {
                class,
                lang,
                content,
            },
        );
        self
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}

impl ContentSource for MockSource {
    fn read_dir(&self, dir: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let dir = normalize(dir);
        if self.failing.read().unwrap().contains(&dir) {
            return Err(SourceError::new(SourceErrorKind::PermissionDenied)
                .with_backend("Mock")
                .with_path(PathBuf::from(&dir)));
        }
        let vanished = self.vanished.read().unwrap();
        if vanished.contains(&dir) {
            return Err(SourceError::not_found(PathBuf::from(&dir)).with_backend("Mock"));
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let files = self.files.files.read().unwrap();
        let mut subdirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (path, file) in files.iter() {
            let Some(rest) = path.strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub, _)) => {
                    subdirs.insert(format!("{prefix}{sub}"));
                }
                None => {
                    let opener: Arc<dyn Open> = Arc::clone(&self.files) as Arc<dyn Open>;
                    entries.push(SourceEntry::File(SourceFile::new(
                        path.as_str(),
                        path,
                        file.class,
                        file.lang.as_str(),
                        opener,
                    )));
                }
            }
        }

        for gone in vanished.iter() {
            let parent = gone.rsplit_once('/').map_or("", |(p, _)| p);
            if parent == dir {
                subdirs.insert(gone.clone());
            }
        }

        if entries.is_empty() && subdirs.is_empty() && !dir.is_empty() {
            return Err(SourceError::not_found(PathBuf::from(&dir)).with_backend("Mock"));
        }

        entries.extend(subdirs.into_iter().map(SourceEntry::Dir));
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(entries: &[SourceEntry]) -> Vec<&str> {
        entries.iter().map(SourceEntry::name).collect()
    }

    #[test]
    fn test_read_dir_lists_files_and_dirs() {
        let source = MockSource::new()
            .with_file("blog/_index.md", "")
            .with_file("blog/post.md", "")
            .with_file("blog/bundle/index.md", "")
            .with_file("about.md", "");

        let root = source.read_dir("").unwrap();
        assert_eq!(names(&root), vec!["about.md", "blog"]);
        assert!(root[1].is_dir());

        let blog = source.read_dir("blog").unwrap();
        assert_eq!(names(&blog), vec!["_index.md", "bundle", "post.md"]);
    }

    #[test]
    fn test_read_dir_missing_is_not_found() {
        let source = MockSource::new().with_file("a.md", "");

        let err = source.read_dir("nope").unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_dir_empty_root_is_ok() {
        let source = MockSource::new();

        assert!(source.read_dir("").unwrap().is_empty());
    }

    #[test]
    fn test_failing_dir() {
        let source = MockSource::new()
            .with_file("blog/a.md", "")
            .with_failing_dir("blog");

        let err = source.read_dir("blog").unwrap_err();

        assert_eq!(err.kind, SourceErrorKind::PermissionDenied);
    }

    #[test]
    fn test_vanished_dir_is_listed_but_not_readable() {
        let source = MockSource::new()
            .with_file("blog/a.md", "")
            .with_vanished_dir("blog/old");

        let names: Vec<_> = source
            .read_dir("blog")
            .unwrap()
            .iter()
            .map(|e| e.name().to_owned())
            .collect();
        let err = source.read_dir("blog/old").unwrap_err();

        assert_eq!(names, vec!["a.md", "old"]);
        assert_eq!(err.kind, SourceErrorKind::NotFound);
    }

    #[test]
    fn test_with_file_detects_class_and_language() {
        let source = MockSource::new()
            .with_languages(&["en", "fr"])
            .with_file("blog/index.fr.md", "bonjour");

        let entries = source.read_dir("blog").unwrap();
        let SourceEntry::File(file) = &entries[0] else {
            panic!("expected file");
        };

        assert_eq!(file.class(), FileClass::LeafHeader);
        assert_eq!(file.lang(), "fr");
        assert_eq!(file.read_to_string().unwrap(), "bonjour");
    }

    #[test]
    fn test_remove_file() {
        let source = MockSource::new().with_file("a.md", "").with_file("b.md", "");

        source.remove_file("a.md");

        assert_eq!(names(&source.read_dir("").unwrap()), vec!["b.md"]);
    }
}
