//! The unit stored in every content tree.

use std::sync::{Arc, OnceLock};

use weft_source::{FileClass, SourceFile};

use crate::error::BuildError;
use crate::meta::FrontMatter;
use crate::page::Page;

/// Taxonomy information attached to taxonomy and term nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewInfo {
    /// Index of the taxonomy in the site configuration.
    pub ordinal: usize,
    /// Singular taxonomy name (`tag`).
    pub singular: String,
    /// Plural taxonomy name (`tags`).
    pub plural: String,
    /// Term key below the taxonomy, empty for the taxonomy node itself.
    pub term: String,
    pub weight: i32,
}

impl ViewInfo {
    /// True for the taxonomy list node (`/tags/`).
    #[must_use]
    pub fn is_taxonomy(&self) -> bool {
        self.term.is_empty()
    }
}

/// A section, page or resource in a content tree.
///
/// Synthesized sections have no backing file. The page object is set at
/// most once per build and only cleared by an explicit rebuild.
#[derive(Debug, Default)]
pub struct ContentNode {
    path: String,
    file: Option<SourceFile>,
    front_matter: Option<Arc<FrontMatter>>,
    page: OnceLock<Arc<Page>>,
    view_info: Option<ViewInfo>,
}

impl ContentNode {
    /// Node backed by a source file.
    #[must_use]
    pub fn from_file(file: SourceFile) -> Self {
        Self {
            path: file.path().to_lowercase(),
            file: Some(file),
            ..Self::default()
        }
    }

    /// Synthesized node without a backing file.
    #[must_use]
    pub fn synthesized(path: &str) -> Self {
        Self {
            path: path.trim_matches('/').to_lowercase(),
            ..Self::default()
        }
    }

    /// Attach already parsed front matter.
    #[must_use]
    pub fn with_front_matter(mut self, front_matter: FrontMatter) -> Self {
        self.front_matter = Some(Arc::new(front_matter));
        self
    }

    /// Read and parse the backing file's front matter.
    ///
    /// Only content files are read. Other nodes are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the file can't be read or parsed.
    pub fn parsed(mut self) -> Result<Self, BuildError> {
        self.parse_front_matter()?;
        Ok(self)
    }

    /// In-place variant of [`ContentNode::parsed`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the file can't be read or parsed.
    pub fn parse_front_matter(&mut self) -> Result<(), BuildError> {
        if self.front_matter.is_some() {
            return Ok(());
        }
        let Some(file) = &self.file else {
            return Ok(());
        };
        if file.class() == FileClass::Resource {
            return Ok(());
        }
        self.front_matter = Some(Arc::new(read_front_matter(file)?));
        Ok(())
    }

    /// Lower-cased relative path, no leading slash.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// First segment of the path, empty at the root.
    #[must_use]
    pub fn root_section(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }

    /// Backing file, `None` for synthesized sections.
    #[must_use]
    pub fn file(&self) -> Option<&SourceFile> {
        self.file.as_ref()
    }

    /// Parsed front matter, if the node was parsed.
    #[must_use]
    pub fn front_matter(&self) -> Option<&Arc<FrontMatter>> {
        self.front_matter.as_ref()
    }

    /// Materialized page object.
    #[must_use]
    pub fn page(&self) -> Option<&Arc<Page>> {
        self.page.get()
    }

    /// Set the page object.
    ///
    /// # Panics
    ///
    /// Panics if the page was already set during this build.
    pub fn set_page(&self, page: Arc<Page>) {
        if self.page.set(page).is_err() {
            panic!("BUG: page for {:?} materialized twice", self.path);
        }
    }

    /// Clear the page object for a rebuild.
    pub fn reset_page(&mut self) -> Option<Arc<Page>> {
        self.page.take()
    }

    /// Taxonomy information, set for taxonomy and term nodes.
    #[must_use]
    pub fn view_info(&self) -> Option<&ViewInfo> {
        self.view_info.as_ref()
    }

    pub(crate) fn set_view_info(&mut self, view_info: ViewInfo) {
        self.view_info = Some(view_info);
    }

    /// Drop the backing file, turning the node into a synthesized one.
    pub(crate) fn detach_file(&mut self) {
        self.file = None;
        self.front_matter = None;
        self.page.take();
    }
}

/// Read and parse a file's front matter.
///
/// # Errors
///
/// Returns [`BuildError::Source`] on read failures and
/// [`BuildError::FrontMatter`] on parse failures.
pub fn read_front_matter(file: &SourceFile) -> Result<FrontMatter, BuildError> {
    let text = file.read_to_string()?;
    FrontMatter::parse(&text).map_err(|e| BuildError::FrontMatter {
        path: file.path().to_owned(),
        message: e.to_string(),
    })
}
