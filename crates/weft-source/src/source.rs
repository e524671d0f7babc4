//! Source trait, file descriptors and error types.
//!
//! Provides the core [`ContentSource`] trait for listing classified content
//! files, along with [`SourceError`] for unified error handling across backends.
//!
//! # Path Convention
//!
//! All path parameters are **relative slash paths** rooted at the content tree:
//! - `""` - the content root
//! - `"blog"` - a directory
//! - `"blog/post.md"` - a file
//!
//! Backends handle the mapping from relative paths to their internal layout
//! (several overlaid directories, an archive, memory).

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Classification of a content file, decided by the source backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileClass {
    /// A regular content file (`post.md`).
    Content,
    /// Header of a leaf bundle (`index.md`).
    LeafHeader,
    /// Header of a branch bundle, i.e. a section (`_index.md`).
    BranchHeader,
    /// Any non-content file (images, data files).
    Resource,
}

impl FileClass {
    /// True for leaf and branch bundle headers.
    #[must_use]
    pub fn is_bundle_header(self) -> bool {
        matches!(self, Self::LeafHeader | Self::BranchHeader)
    }

    /// Stable lowercase name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::LeafHeader => "leaf",
            Self::BranchHeader => "branch",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens the byte stream behind a [`SourceFile`].
///
/// Implemented by each backend; descriptors hold a shared handle to it so
/// that consumers can read content without knowing the backend.
pub trait Open: Send + Sync {
    /// Open the file with the given absolute filename.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file doesn't exist or can't be opened.
    fn open(&self, filename: &Path) -> Result<Box<dyn Read + Send>, SourceError>;
}

/// Descriptor of one classified content file.
#[derive(Clone)]
pub struct SourceFile {
    filename: PathBuf,
    path: String,
    class: FileClass,
    lang: String,
    opener: Arc<dyn Open>,
}

impl SourceFile {
    /// Create a new descriptor.
    ///
    /// `path` is normalized to forward slashes without a leading slash.
    pub fn new(
        filename: impl Into<PathBuf>,
        path: &str,
        class: FileClass,
        lang: impl Into<String>,
        opener: Arc<dyn Open>,
    ) -> Self {
        let path = path.replace('\\', "/").trim_start_matches('/').to_owned();
        Self {
            filename: filename.into(),
            path,
            class,
            lang: lang.into(),
            opener,
        }
    }

    /// Absolute filename in the backend.
    #[must_use]
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Relative slash path including the file name (e.g. `"blog/post.md"`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File classification.
    #[must_use]
    pub fn class(&self) -> FileClass {
        self.class
    }

    /// Language tag (e.g. `"en"`).
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// File name with extension (e.g. `"post.fr.md"`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit_once('/').map_or(&self.path, |(_, name)| name)
    }

    /// Directory part of the relative path, empty at the content root.
    #[must_use]
    pub fn dir(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Extension without the leading dot, empty if none.
    #[must_use]
    pub fn ext(&self) -> &str {
        self.name().rsplit_once('.').map_or("", |(_, ext)| ext)
    }

    /// File name without extension (e.g. `"post.fr"`).
    #[must_use]
    pub fn base_name(&self) -> &str {
        let name = self.name();
        name.rsplit_once('.').map_or(name, |(base, _)| base)
    }

    /// File name without extension and language segment (e.g. `"post"`).
    #[must_use]
    pub fn translation_base_name(&self) -> &str {
        let base = self.base_name();
        if self.lang.is_empty() {
            return base;
        }
        base.strip_suffix(self.lang.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(base)
    }

    /// Open the file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the backend cannot open the file.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, SourceError> {
        self.opener.open(&self.filename)
    }

    /// Read the whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be opened or read.
    pub fn read_to_string(&self) -> Result<String, SourceError> {
        let mut reader = self.open()?;
        let mut buf = String::new();
        reader
            .read_to_string(&mut buf)
            .map_err(|e| SourceError::io(e, Some(self.filename.clone())))?;
        Ok(buf)
    }

    /// Copy of this descriptor with a different classification.
    #[must_use]
    pub fn with_class(&self, class: FileClass) -> Self {
        Self {
            class,
            ..self.clone()
        }
    }

    /// Copy of this descriptor assigned to another language.
    #[must_use]
    pub fn with_lang(&self, lang: &str) -> Self {
        Self {
            lang: lang.to_owned(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("path", &self.path)
            .field("class", &self.class)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
            && self.path == other.path
            && self.class == other.class
            && self.lang == other.lang
    }
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEntry {
    /// Subdirectory, identified by its relative path.
    Dir(String),
    /// Classified file.
    File(SourceFile),
}

impl SourceEntry {
    /// Last path segment of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Dir(path) => path.rsplit_once('/').map_or(path.as_str(), |(_, n)| n),
            Self::File(file) => file.name(),
        }
    }

    /// Relative path of the entry.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Dir(path) => path,
            Self::File(file) => file.path(),
        }
    }

    /// True for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Invalid path or identifier.
    InvalidPath,
    /// Other/unknown error category.
    Other,
}

/// Source error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct SourceError {
    /// Semantic error category.
    pub kind: SourceErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Create a new source error.
    #[must_use]
    pub fn new(kind: SourceErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceErrorKind::NotFound).with_path(path)
    }

    /// True if the error means the resource is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == SourceErrorKind::NotFound
    }

    /// Create a source error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => SourceErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SourceErrorKind::PermissionDenied,
            _ => SourceErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            SourceErrorKind::NotFound => "Not found",
            SourceErrorKind::PermissionDenied => "Permission denied",
            SourceErrorKind::InvalidPath => "Invalid path",
            SourceErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Classified directory listing of a content tree.
///
/// Implementations merge whatever physical layout they have (overlaid
/// project and theme directories, archives, memory) into one logical tree.
pub trait ContentSource: Send + Sync {
    /// List the entries of a directory, ordered by name.
    ///
    /// # Arguments
    ///
    /// * `dir` - Relative slash path, `""` for the content root
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] with [`SourceErrorKind::NotFound`] if the
    /// directory doesn't exist, or another kind if it can't be read.
    fn read_dir(&self, dir: &str) -> Result<Vec<SourceEntry>, SourceError>;
}
