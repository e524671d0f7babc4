//! Page objects and their capability traits.
//!
//! A single concrete [`Page`] type backs home, section, taxonomy, term and
//! regular pages. Its behavior is grouped into small traits:
//!
//! - [`Metadata`] - title, weight, params and other front matter values
//! - [`Dated`] - content dates
//! - [`Content`] - backing file and raw content
//! - [`Renderable`] - render and list decisions
//! - [`TreeNavigation`] - position in the content tree
//!
//! Navigation needs the [`ContentMap`] the page belongs to, which is passed in
//! explicitly.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use weft_source::SourceFile;

use crate::bucket::PagesBucket;
use crate::key::{LEAF_SEP, parent_dir_key, section_depth};
use crate::map::ContentMap;
use crate::meta::{BuildOptions, Dates, FrontMatter, ListMode, Params, RenderMode};
use crate::node::ViewInfo;

/// Page kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Home,
    Section,
    Page,
    Taxonomy,
    Term,
}

impl Kind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Section => "section",
            Self::Page => "page",
            Self::Taxonomy => "taxonomy",
            Self::Term => "term",
        }
    }

    /// True for every kind that owns a bucket of children.
    #[must_use]
    pub fn is_node(self) -> bool {
        self != Self::Page
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Front matter backed metadata.
pub trait Metadata {
    fn kind(&self) -> Kind;
    fn title(&self) -> &str;
    /// Title used in menus and listings; falls back to [`Metadata::title`].
    fn link_title(&self) -> &str;
    fn weight(&self) -> i32;
    fn draft(&self) -> bool;
    fn lang(&self) -> &str;
    /// Params after cascade.
    fn params(&self) -> &Params;
    /// Single param, looked up case-insensitively.
    fn param(&self, key: &str) -> Option<&Value> {
        self.params().get(&key.to_lowercase())
    }
}

/// Content dates.
pub trait Dated {
    fn dates(&self) -> Dates;
    fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.dates().date
    }
    fn lastmod(&self) -> Option<DateTime<FixedOffset>> {
        self.dates().lastmod
    }
    fn publish_date(&self) -> Option<DateTime<FixedOffset>> {
        self.dates().publish_date
    }
    fn expiry_date(&self) -> Option<DateTime<FixedOffset>> {
        self.dates().expiry_date
    }
}

/// Source backed content.
pub trait Content {
    /// Backing file, `None` for synthesized pages.
    fn file(&self) -> Option<&SourceFile>;
    /// Content after the front matter, unrendered.
    fn raw_content(&self) -> &str;
}

/// Output decisions.
pub trait Renderable {
    fn build_options(&self) -> BuildOptions;
    /// True if the page gets written out.
    fn should_render(&self) -> bool {
        self.build_options().render == RenderMode::Always
    }
    /// True if the page appears in listings; `global` selects site-wide lists.
    fn should_list(&self, global: bool) -> bool {
        match self.build_options().list {
            ListMode::Always => true,
            ListMode::Never => false,
            ListMode::Local => !global,
        }
    }
}

/// Position in the content tree.
pub trait TreeNavigation {
    /// Tree key of the page.
    fn key(&self) -> &str;
    /// Key of the section the page belongs to; its own key for nodes.
    fn section_key(&self) -> &str;
    /// Parent section page, `None` for home.
    fn parent(&self, map: &ContentMap) -> Option<Arc<Page>>;
    /// The page itself for nodes, its section for regular pages.
    fn current_section(&self, map: &ContentMap) -> Option<Arc<Page>>;
    /// First-level section containing the page, home for home.
    fn first_section(&self, map: &ContentMap) -> Option<Arc<Page>>;
    /// Direct child sections, default sorted.
    fn sections(&self, map: &ContentMap) -> Vec<Arc<Page>>;
    /// Listed children: pages and sections for nodes, nothing for regular pages.
    fn pages(&self, map: &ContentMap) -> Vec<Arc<Page>>;
    /// Direct regular pages, default sorted.
    fn regular_pages(&self, map: &ContentMap) -> Vec<Arc<Page>>;
    /// Direct pages and child sections merged, default sorted.
    fn pages_and_sections(&self, map: &ContentMap) -> Vec<Arc<Page>>;
    /// Resource files bundled with the page.
    fn resources<'m>(&self, map: &'m ContentMap) -> Vec<&'m SourceFile>;
    fn is_ancestor(&self, other: &Page) -> bool;
    fn is_descendant(&self, other: &Page) -> bool;
    /// True if both pages share the current section.
    fn in_section(&self, other: &Page) -> bool;
}

/// Materialized page.
pub struct Page {
    kind: Kind,
    key: String,
    section_key: String,
    lang: String,
    file: Option<SourceFile>,
    title: String,
    link_title: Option<String>,
    weight: i32,
    draft: bool,
    dates: Dates,
    rolled_up: OnceLock<Dates>,
    params: Params,
    build: BuildOptions,
    content: String,
    view_info: Option<ViewInfo>,
    bucket: Option<Arc<PagesBucket>>,
    bundled: bool,
}

/// Inputs for constructing a [`Page`].
pub(crate) struct PageInit<'a> {
    pub kind: Kind,
    pub key: String,
    pub section_key: String,
    pub lang: &'a str,
    pub file: Option<SourceFile>,
    pub front_matter: Option<Arc<FrontMatter>>,
    pub default_title: String,
    pub view_info: Option<ViewInfo>,
    pub parent_bucket: Option<&'a Arc<PagesBucket>>,
    pub bundled: bool,
}

impl Page {
    pub(crate) fn new(init: PageInit<'_>) -> Arc<Self> {
        let front_matter = init.front_matter.unwrap_or_default();
        let meta = &front_matter.meta;

        let mut params = meta.params.clone();
        if let Some(parent) = init.parent_bucket {
            for (key, value) in parent.cascade() {
                params.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let bucket = init.kind.is_node().then(|| {
            Arc::new(PagesBucket::new(
                init.key.clone(),
                init.parent_bucket.map(Arc::as_ref),
                &meta.cascade,
            ))
        });

        Arc::new(Self {
            kind: init.kind,
            key: init.key,
            section_key: init.section_key,
            lang: init.lang.to_owned(),
            file: init.file,
            title: meta.title.clone().unwrap_or(init.default_title),
            link_title: meta.link_title.clone(),
            weight: meta.weight,
            draft: meta.draft,
            dates: meta.dates,
            rolled_up: OnceLock::new(),
            params,
            build: meta.build,
            content: front_matter.content.clone(),
            view_info: init.view_info,
            bucket,
            bundled: init.bundled,
        })
    }

    /// Child bucket, present for nodes.
    #[must_use]
    pub fn bucket(&self) -> Option<&Arc<PagesBucket>> {
        self.bucket.as_ref()
    }

    /// Taxonomy information for taxonomy and term pages.
    #[must_use]
    pub fn view_info(&self) -> Option<&ViewInfo> {
        self.view_info.as_ref()
    }

    /// True for content files nested in a leaf bundle.
    #[must_use]
    pub fn is_bundled(&self) -> bool {
        self.bundled
    }

    #[must_use]
    pub fn is_home(&self) -> bool {
        self.kind == Kind::Home
    }

    #[must_use]
    pub fn is_section(&self) -> bool {
        self.kind == Kind::Section
    }

    /// Dates read from the page's own front matter.
    #[must_use]
    pub fn own_dates(&self) -> Dates {
        self.dates
    }

    /// Record dates rolled up from descendants.
    ///
    /// They only become visible while the page's own dates are zero.
    pub(crate) fn set_rolled_up_dates(&self, dates: Dates) {
        // A second aggregation within the same build keeps the first result
        let _ = self.rolled_up.set(dates);
    }

    /// Section key a node page lists children for.
    fn listing_key(&self) -> &str {
        if self.kind.is_node() {
            &self.key
        } else {
            &self.section_key
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("lang", &self.lang)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl Metadata for Page {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn link_title(&self) -> &str {
        self.link_title.as_deref().unwrap_or(&self.title)
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn draft(&self) -> bool {
        self.draft
    }

    fn lang(&self) -> &str {
        &self.lang
    }

    fn params(&self) -> &Params {
        &self.params
    }
}

impl Dated for Page {
    fn dates(&self) -> Dates {
        if self.dates.is_zero() {
            self.rolled_up.get().copied().unwrap_or(self.dates)
        } else {
            self.dates
        }
    }
}

impl Content for Page {
    fn file(&self) -> Option<&SourceFile> {
        self.file.as_ref()
    }

    fn raw_content(&self) -> &str {
        &self.content
    }
}

impl Renderable for Page {
    fn build_options(&self) -> BuildOptions {
        self.build
    }
}

impl TreeNavigation for Page {
    fn key(&self) -> &str {
        &self.key
    }

    fn section_key(&self) -> &str {
        &self.section_key
    }

    fn parent(&self, map: &ContentMap) -> Option<Arc<Page>> {
        match self.kind {
            Kind::Home => None,
            Kind::Page => map.section_page(&self.section_key),
            _ => map.section_page(&map.section_for(&parent_dir_key(&self.key))?),
        }
    }

    fn current_section(&self, map: &ContentMap) -> Option<Arc<Page>> {
        map.section_page(self.listing_key())
    }

    fn first_section(&self, map: &ContentMap) -> Option<Arc<Page>> {
        let section = self.listing_key();
        if section_depth(section) == 0 {
            return map.section_page("/");
        }
        let end = section[1..].find('/').map_or(section.len(), |i| i + 2);
        map.section_page(&section[..end])
    }

    fn sections(&self, map: &ContentMap) -> Vec<Arc<Page>> {
        self.bucket
            .as_ref()
            .map(|b| b.sections(map).to_vec())
            .unwrap_or_default()
    }

    fn pages(&self, map: &ContentMap) -> Vec<Arc<Page>> {
        match self.kind {
            Kind::Page => Vec::new(),
            Kind::Term => self.regular_pages(map),
            _ => self.pages_and_sections(map),
        }
    }

    fn regular_pages(&self, map: &ContentMap) -> Vec<Arc<Page>> {
        self.bucket
            .as_ref()
            .map(|b| b.pages(map).to_vec())
            .unwrap_or_default()
    }

    fn pages_and_sections(&self, map: &ContentMap) -> Vec<Arc<Page>> {
        self.bucket
            .as_ref()
            .map(|b| b.pages_and_sections(map).to_vec())
            .unwrap_or_default()
    }

    fn resources<'m>(&self, map: &'m ContentMap) -> Vec<&'m SourceFile> {
        let prefix = if self.kind.is_node() {
            format!("{}{LEAF_SEP}", self.key)
        } else {
            self.key.clone()
        };
        map.resource_files(&prefix)
    }

    fn is_ancestor(&self, other: &Page) -> bool {
        self.kind.is_node() && self.key != other.key && other.key.starts_with(&self.key)
    }

    fn is_descendant(&self, other: &Page) -> bool {
        other.is_ancestor(self)
    }

    fn in_section(&self, other: &Page) -> bool {
        self.listing_key() == other.listing_key()
    }
}
