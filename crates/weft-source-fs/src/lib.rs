//! Filesystem content source for weft.
//!
//! This crate provides [`FsSource`], a filesystem-based implementation of the
//! [`ContentSource`](weft_source::ContentSource) trait. It handles:
//!
//! - Overlaying several content roots (project first, then themes)
//! - Classifying files into bundle headers, content and resources
//! - Detecting the language from `name.<lang>.<ext>` file names
//! - Skipping hidden entries and files matching ignore patterns
//!
//! # Example
//!
//! ```ignore
//! use weft_source::ContentSource;
//! use weft_source_fs::FsSource;
//!
//! let source = FsSource::new("content").with_root("themes/base/content");
//! for entry in source.read_dir("")? {
//!     println!("{}", entry.path());
//! }
//! ```

mod scanner;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;

use scanner::{RawEntry, links_to_ancestor, list_dir};
use weft_source::{
    ContentSource, Open, SourceEntry, SourceError, SourceErrorKind, SourceFile, classify,
    split_lang,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Opens files straight from disk.
#[derive(Debug)]
struct FsOpener;

impl Open for FsOpener {
    fn open(&self, filename: &Path) -> Result<Box<dyn Read + Send>, SourceError> {
        let file = File::open(filename)
            .map_err(|e| SourceError::io(e, Some(filename.to_path_buf())).with_backend(BACKEND))?;
        Ok(Box::new(file))
    }
}

/// Filesystem content source.
///
/// Merges one or more root directories into a single logical tree. When the
/// same relative path exists under several roots, the root added first wins.
pub struct FsSource {
    roots: Vec<PathBuf>,
    languages: Vec<String>,
    ignore: Vec<Pattern>,
    opener: Arc<dyn Open>,
}

impl FsSource {
    /// Create a source over a single content root with the `en` language.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            languages: vec!["en".to_owned()],
            ignore: Vec::new(),
            opener: Arc::new(FsOpener),
        }
    }

    /// Add a lower-priority root (e.g. a theme's content directory).
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Set the known languages. The first one is the default language.
    ///
    /// An empty list keeps the current languages.
    #[must_use]
    pub fn with_languages(mut self, languages: &[String]) -> Self {
        if !languages.is_empty() {
            self.languages = languages.to_vec();
        }
        self
    }

    /// Skip files whose relative path matches any of the glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] with [`SourceErrorKind::InvalidPath`] if a
    /// pattern is not a valid glob.
    pub fn with_ignore<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, SourceError> {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = Pattern::new(pattern).map_err(|e| {
                SourceError::new(SourceErrorKind::InvalidPath)
                    .with_backend(BACKEND)
                    .with_path(pattern)
                    .with_source(e)
            })?;
            self.ignore.push(compiled);
        }
        Ok(self)
    }

    /// Content roots in priority order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn default_lang(&self) -> &str {
        self.languages.first().map_or("en", String::as_str)
    }

    fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignore.iter().any(|p| p.matches(rel_path))
    }

    fn describe(&self, raw: &RawEntry, rel_path: String) -> SourceEntry {
        if raw.is_dir {
            return SourceEntry::Dir(rel_path);
        }
        let class = classify(&raw.name, &self.languages);
        let base = raw.name.rsplit_once('.').map_or(raw.name.as_str(), |(b, _)| b);
        let lang = split_lang(base, &self.languages)
            .1
            .unwrap_or_else(|| self.default_lang());
        SourceEntry::File(SourceFile::new(
            raw.path.clone(),
            &rel_path,
            class,
            lang,
            Arc::clone(&self.opener),
        ))
    }
}

impl ContentSource for FsSource {
    fn read_dir(&self, dir: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let dir = dir.trim_matches('/');
        let mut seen = std::collections::BTreeMap::new();
        let mut found = false;

        for root in &self.roots {
            let path = if dir.is_empty() {
                root.clone()
            } else {
                root.join(dir)
            };
            let raw_entries = match list_dir(&path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(SourceError::io(e, Some(path)).with_backend(BACKEND));
                }
            };
            found = true;

            for raw in raw_entries {
                let rel_path = if dir.is_empty() {
                    raw.name.clone()
                } else {
                    format!("{dir}/{}", raw.name)
                };
                if self.is_ignored(&rel_path) {
                    tracing::debug!(path = %rel_path, "Ignoring file");
                    continue;
                }
                if raw.is_dir && raw.is_symlink && links_to_ancestor(root, dir, &raw.path) {
                    tracing::warn!(
                        path = %rel_path,
                        "Skipping symlink back to an ancestor directory"
                    );
                    continue;
                }
                if seen.contains_key(&raw.name) {
                    tracing::trace!(
                        path = %rel_path,
                        root = %root.display(),
                        "Shadowed by earlier root"
                    );
                    continue;
                }
                let entry = self.describe(&raw, rel_path);
                seen.insert(raw.name, entry);
            }
        }

        if !found && !dir.is_empty() {
            return Err(SourceError::not_found(dir).with_backend(BACKEND));
        }

        Ok(seen.into_values().collect())
    }
}
