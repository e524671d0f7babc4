//! Sections, pages and resources of one site.
//!
//! The map owns three [`KeyedTree`]s. Intake methods insert nodes in any
//! order; [`ContentMap::create_missing_nodes`] and the assembler make the
//! trees consistent afterwards. Once assembled the map is only read.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use weft_source::{FileClass, SourceFile};

use crate::bucket::PagesBucket;
use crate::key::{
    BRANCH_SEP, KeyBuilder, LEAF_SEP, TreeKind, clean_section_tree_key, clean_tree_key,
    first_segment, parent_dir_key, section_depth, split_page_key,
};
use crate::meta::Dates;
use crate::node::{ContentNode, ViewInfo};
use crate::page::{Page, Renderable};
use crate::sort::sort_by_default;
use crate::tree::KeyedTree;

/// How sections are synthesized for directories without an `_index` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingSections {
    /// Only first-level sections are synthesized. Deeper pages nest under the
    /// nearest existing ancestor section.
    #[default]
    Root,
    /// Every directory between the root and a page becomes a section.
    Eager,
}

/// A configured taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    pub singular: String,
    pub plural: String,
}

impl Taxonomy {
    #[must_use]
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }
}

/// Per-site settings the map needs during intake.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    /// Language of the site owning the map.
    pub lang: String,
    pub missing_sections: MissingSections,
    pub taxonomies: Vec<Taxonomy>,
}

/// Aggregated statistics of one section subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionStats {
    /// Regular pages in the section and every section below it.
    pub page_count: usize,
    /// Latest `date` and `lastmod` found in the subtree.
    pub dates: Dates,
}

/// First-level section holding the most regular pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainSection {
    pub name: String,
    pub page_count: usize,
}

/// Read-only view over several content trees.
///
/// Walks merge the trees in key order.
#[derive(Debug, Clone, Copy)]
pub struct ContentTrees<'a> {
    trees: &'a [&'a KeyedTree<ContentNode>],
}

impl<'a> ContentTrees<'a> {
    /// Exact lookup in the first tree holding the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a ContentNode> {
        self.trees.iter().find_map(|t| t.get(key))
    }

    /// True if any tree holds a key below `prefix`.
    #[must_use]
    pub fn has_below(&self, prefix: &str) -> bool {
        self.trees.iter().any(|t| t.has_below(prefix))
    }

    /// Visit entries below `prefix` across all trees, in key order.
    ///
    /// Returns `true` if the walk was stopped early.
    pub fn walk_prefix<F>(&self, prefix: &str, mut visit: F) -> bool
    where
        F: FnMut(&str, &ContentNode) -> ControlFlow<()>,
    {
        let mut entries: Vec<(&str, &ContentNode)> = self
            .trees
            .iter()
            .flat_map(|t| t.iter_prefix(prefix))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .any(|(k, n)| visit(k, n).is_break())
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.iter().map(|t| t.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.iter().all(|t| t.is_empty())
    }
}

/// The content model of one site.
#[derive(Debug)]
pub struct ContentMap {
    pub(crate) config: MapConfig,
    pub(crate) sections: KeyedTree<ContentNode>,
    pub(crate) pages: KeyedTree<ContentNode>,
    pub(crate) resources: KeyedTree<ContentNode>,
    pub(crate) stats: BTreeMap<String, SectionStats>,
    pub(crate) main_section: Option<MainSection>,
    pub(crate) site_bucket: Option<Arc<PagesBucket>>,
}

impl ContentMap {
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            sections: KeyedTree::new("sections"),
            pages: KeyedTree::new("pages"),
            resources: KeyedTree::new("resources"),
            stats: BTreeMap::new(),
            main_section: None,
            site_bucket: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    #[must_use]
    pub fn lang(&self) -> &str {
        &self.config.lang
    }

    #[must_use]
    pub fn sections(&self) -> &KeyedTree<ContentNode> {
        &self.sections
    }

    #[must_use]
    pub fn pages(&self) -> &KeyedTree<ContentNode> {
        &self.pages
    }

    #[must_use]
    pub fn resources(&self) -> &KeyedTree<ContentNode> {
        &self.resources
    }

    /// Sections and pages, used for listings.
    pub fn with_page_trees<R>(&self, f: impl FnOnce(ContentTrees<'_>) -> R) -> R {
        f(ContentTrees {
            trees: &[&self.sections, &self.pages],
        })
    }

    /// Sections, pages and resources, used for whole-bundle walks.
    pub fn with_bundle_trees<R>(&self, f: impl FnOnce(ContentTrees<'_>) -> R) -> R {
        f(ContentTrees {
            trees: &[&self.sections, &self.pages, &self.resources],
        })
    }

    // Intake

    /// Deepest existing section containing `key`.
    #[must_use]
    pub fn section_for(&self, key: &str) -> Option<String> {
        self.sections.longest_prefix(key).map(|(k, _)| k.to_owned())
    }

    /// Section key of the nearest existing section above a section.
    pub(crate) fn parent_section_key(&self, section_key: &str) -> Option<String> {
        if section_key == "/" {
            return None;
        }
        self.section_for(&parent_dir_key(section_key))
    }

    /// Section a page with the given bundle path belongs to, created if needed.
    ///
    /// Returns the section key.
    pub fn get_or_create_section(&mut self, bundle_path: &str) -> String {
        let path = clean_tree_key(bundle_path);
        let dir = parent_dir_key(&path);

        match self.config.missing_sections {
            MissingSections::Root => {
                let level = path.matches('/').count();
                match self.section_for(&dir) {
                    Some(key) if !(level > 1 && key == "/") => key,
                    _ => {
                        let key = if level > 1 {
                            clean_section_tree_key(first_segment(&path))
                        } else {
                            "/".to_owned()
                        };
                        self.ensure_section(&key);
                        key
                    }
                }
            }
            MissingSections::Eager => {
                let key = clean_section_tree_key(&dir);
                self.ensure_ancestors(&key);
                self.ensure_section(&key);
                key
            }
        }
    }

    /// Synthesize every section strictly between the root and `section_key`,
    /// the root included.
    fn ensure_ancestors(&mut self, section_key: &str) {
        let mut key = "/".to_owned();
        self.ensure_section(&key);
        let segments: Vec<&str> = section_key.split('/').filter(|s| !s.is_empty()).collect();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            key.push_str(segment);
            key.push('/');
            self.ensure_section(&key);
        }
    }

    /// Insert a synthesized section unless the key is taken.
    fn ensure_section(&mut self, key: &str) {
        if !self.sections.contains(key) {
            tracing::debug!(lang = %self.config.lang, section = %key, "Synthesizing section");
            self.insert_section(key.to_owned(), ContentNode::synthesized(key));
        }
    }

    fn insert_section(&mut self, key: String, mut node: ContentNode) {
        let weight = node.front_matter().map_or(0, |fm| fm.meta.weight);
        if let Some(view) = self.taxonomy_view(&key, weight) {
            node.set_view_info(view);
        }
        self.sections.insert(key, node);
    }

    /// Taxonomy information for a section key below a configured plural.
    #[must_use]
    pub fn taxonomy_view(&self, section_key: &str, weight: i32) -> Option<ViewInfo> {
        let plural = first_segment(section_key);
        if plural.is_empty() {
            return None;
        }
        let (ordinal, taxonomy) = self
            .config
            .taxonomies
            .iter()
            .enumerate()
            .find(|(_, t)| t.plural == plural)?;
        let term = section_key
            .trim_matches('/')
            .strip_prefix(plural)
            .unwrap_or("")
            .trim_matches('/');
        Some(ViewInfo {
            ordinal,
            singular: taxonomy.singular.clone(),
            plural: taxonomy.plural.clone(),
            term: term.to_owned(),
            weight,
        })
    }

    /// Directory a file's bundle is identified by.
    ///
    /// Plain content files are bundles of their own named after the file.
    #[must_use]
    pub fn bundle_dir(file: &SourceFile) -> String {
        let dir = file.dir();
        if file.class() != FileClass::Content {
            return dir.to_owned();
        }
        if dir.is_empty() {
            file.translation_base_name().to_owned()
        } else {
            format!("{dir}/{}", file.translation_base_name())
        }
    }

    /// Insert a bundle header with its resources.
    ///
    /// Branch headers become sections (or taxonomy nodes), leaf headers and
    /// content files become pages. Re-adding a bundle replaces the resources
    /// it had before. Returns the header's key.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing its file or is a resource.
    pub fn add_bundle(&mut self, header: ContentNode, resources: Vec<ContentNode>) -> String {
        let Some(file) = header.file() else {
            panic!("BUG: bundle header {:?} has no file", header.path());
        };
        let bundle_path = Self::bundle_dir(file);

        let builder = match file.class() {
            FileClass::BranchHeader => {
                let builder = KeyBuilder::for_section(&bundle_path);
                if self.config.missing_sections == MissingSections::Eager {
                    self.ensure_ancestors(builder.key());
                }
                self.insert_section(builder.key().to_owned(), header);
                builder
            }
            FileClass::LeafHeader | FileClass::Content => {
                let section = self.get_or_create_section(&bundle_path);
                let builder = KeyBuilder::for_section(&section).for_page(&bundle_path);
                let existing = self.pages.get(builder.key()).and_then(ContentNode::file);
                if let Some(existing) = existing
                    && existing.path() != file.path()
                {
                    let keep_existing = page_rank(existing) <= page_rank(file);
                    let (kept, dropped) = if keep_existing {
                        (existing.path(), file.path())
                    } else {
                        (file.path(), existing.path())
                    };
                    tracing::warn!(key = %builder.key(), kept, dropped, "Duplicate page key");
                    if keep_existing {
                        return builder.into_key();
                    }
                }
                self.pages.insert(builder.key(), header);
                builder
            }
            FileClass::Resource => {
                panic!("BUG: invalid classifier {} for bundle header", file.class())
            }
        };

        let resource_prefix = match builder.tree() {
            TreeKind::Sections => format!("{}{LEAF_SEP}", builder.key()),
            _ => builder.key().to_owned(),
        };
        let removed = self.resources.delete_prefix(&resource_prefix);
        if removed > 0 {
            tracing::debug!(key = %builder.key(), removed, "Replaced bundle resources");
        }

        for resource in resources {
            let key = builder.for_resource(resource.path()).into_key();
            self.resources.insert(key, resource);
        }

        tracing::debug!(
            lang = %self.config.lang,
            key = %builder.key(),
            tree = ?builder.tree(),
            "Added bundle"
        );
        builder.into_key()
    }

    /// Insert a single file.
    ///
    /// Content and header files are added as bundles without resources.
    /// Resources attach to the deepest page whose bundle directory contains
    /// them, or to the nearest section.
    ///
    /// # Panics
    ///
    /// Panics if the node has no file.
    pub fn add_file(&mut self, node: ContentNode) -> String {
        let Some(file) = node.file() else {
            panic!("BUG: file node {:?} has no file", node.path());
        };
        if file.class() != FileClass::Resource {
            return self.add_bundle(node, Vec::new());
        }
        if !self.sections.contains("/") {
            self.ensure_section("/");
        }
        let key = self.resource_key(node.path());
        self.resources.insert(key.clone(), node);
        key
    }

    /// Key for a standalone resource file given its lower-cased path.
    fn resource_key(&self, path: &str) -> String {
        let path = clean_tree_key(path);
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        for i in (1..parts.len()).rev() {
            let bundle_path = format!("/{}", parts[..i].join("/"));
            let Some(section) = self.section_for(&parent_dir_key(&bundle_path)) else {
                continue;
            };
            let page = KeyBuilder::for_section(&section).for_page(&bundle_path);
            if self.pages.contains(page.key()) {
                return page.for_resource(&path).into_key();
            }
        }

        let section = self
            .section_for(&parent_dir_key(&path))
            .unwrap_or_else(|| "/".to_owned());
        KeyBuilder::for_section(&section).for_resource(&path).into_key()
    }

    // Structure

    /// Make the trees consistent before assembly.
    ///
    /// Ensures the root section and every first-level section a page or
    /// section lives in exist, then moves pages and resources inserted under
    /// a shallower section than the deepest one now available.
    pub fn create_missing_nodes(&mut self) {
        self.ensure_section("/");

        let mut roots: Vec<String> = Vec::new();
        for key in self.sections.keys().into_iter().chain(self.pages.keys()) {
            let section = split_page_key(&key).map_or(key.as_str(), |(s, _)| s);
            let root = first_segment(section);
            if !root.is_empty() {
                roots.push(clean_section_tree_key(root));
            }
        }
        for root in roots {
            self.ensure_section(&root);
        }
        if self.config.missing_sections == MissingSections::Eager {
            for key in self.sections.keys() {
                self.ensure_ancestors(&key);
            }
        }

        self.rekey_pages();
        self.rekey_section_resources();
    }

    fn rekey_pages(&mut self) {
        for old_key in self.pages.keys() {
            let Some((section, local)) = split_page_key(&old_key) else {
                continue;
            };
            let bundle_path = format!("{section}{local}");
            let Some(expected) = self.section_for(&parent_dir_key(&bundle_path)) else {
                continue;
            };
            if expected == section {
                continue;
            }
            let new_key = KeyBuilder::for_section(&expected)
                .for_page(&bundle_path)
                .into_key();
            tracing::debug!(from = %old_key, to = %new_key, "Re-keying page");

            if let Some(node) = self.pages.delete(&old_key) {
                self.pages.insert(new_key.clone(), node);
            }
            for resource_key in self.resources.keys_with_prefix(&old_key) {
                if let Some(node) = self.resources.delete(&resource_key) {
                    let moved = format!("{new_key}{}", &resource_key[old_key.len()..]);
                    self.resources.insert(moved, node);
                }
            }
        }
    }

    fn rekey_section_resources(&mut self) {
        for old_key in self.resources.keys() {
            if old_key.contains(BRANCH_SEP) {
                continue;
            }
            let Some(path) = self.resources.get(&old_key).map(|n| n.path().to_owned()) else {
                continue;
            };
            let new_key = self.resource_key(&path);
            if new_key != old_key
                && let Some(node) = self.resources.delete(&old_key)
            {
                tracing::debug!(from = %old_key, to = %new_key, "Re-keying resource");
                self.resources.insert(new_key, node);
            }
        }
    }

    // Incremental

    /// Remove a page and its resources. Returns `true` if the page existed.
    pub fn delete_page(&mut self, key: &str) -> bool {
        let existed = self.pages.delete(key).is_some();
        self.resources.delete_prefix(key);
        existed
    }

    /// Remove a section with everything below it.
    ///
    /// # Panics
    ///
    /// Panics if `section_key` does not start and end with a slash.
    pub fn delete_section_by_path(&mut self, section_key: &str) {
        assert!(
            section_key.starts_with('/') && section_key.ends_with('/'),
            "BUG: section key {section_key:?} must start and end with a slash"
        );
        let sections = self.sections.delete_prefix(section_key);
        let pages = self.pages.delete_prefix(section_key);
        let resources = self.resources.delete_prefix(section_key);
        tracing::debug!(section = %section_key, sections, pages, resources, "Deleted section");
    }

    /// Remove the node backed by a source file.
    ///
    /// A removed section header leaves a synthesized section behind, which
    /// the next cleanup drops if nothing else lives below it. Returns `true`
    /// if a node was found.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let path = path.trim_matches('/').to_lowercase();
        let backed_by = |node: &ContentNode| node.file().is_some() && node.path() == path;

        if let Some(key) = find_key(&self.pages, backed_by) {
            return self.delete_page(&key);
        }
        if let Some(key) = find_key(&self.sections, backed_by) {
            if let Some(node) = self.sections.get_mut(&key) {
                node.detach_file();
            }
            return true;
        }
        if let Some(key) = find_key(&self.resources, backed_by) {
            self.resources.delete(&key);
            return true;
        }
        false
    }

    /// Drop synthesized sections with nothing below them.
    ///
    /// The root and file-backed sections are always kept. Returns the number
    /// of removed sections.
    pub fn delete_orphan_sections(&mut self) -> usize {
        let mut removed = 0;
        for key in self.sections.keys().into_iter().rev() {
            if key == "/" {
                continue;
            }
            let Some(node) = self.sections.get(&key) else {
                continue;
            };
            if node.file().is_some() {
                continue;
            }
            let occupied = self.sections.has_below(&key)
                || self.pages.iter_prefix(&key).next().is_some()
                || self.resources.iter_prefix(&key).next().is_some();
            if !occupied {
                tracing::debug!(section = %key, "Removing orphan section");
                self.sections.delete(&key);
                removed += 1;
            }
        }
        removed
    }

    /// Clear every page object and aggregate for an explicit rebuild.
    pub fn reset_pages(&mut self) {
        for tree in [&mut self.sections, &mut self.pages, &mut self.resources] {
            for (_, node) in tree.iter_mut() {
                node.reset_page();
            }
        }
        self.stats.clear();
        self.main_section = None;
        self.site_bucket = None;
    }

    // Queries

    /// Page object of a section.
    #[must_use]
    pub fn section_page(&self, section_key: &str) -> Option<Arc<Page>> {
        self.sections.get(section_key)?.page().cloned()
    }

    /// Home page.
    #[must_use]
    pub fn home(&self) -> Option<Arc<Page>> {
        self.section_page("/")
    }

    /// Site-level bucket, parent of the home page's bucket.
    #[must_use]
    pub fn site_bucket(&self) -> Option<&Arc<PagesBucket>> {
        self.site_bucket.as_ref()
    }

    /// Files of the resources whose key starts with `prefix`.
    #[must_use]
    pub fn resource_files(&self, prefix: &str) -> Vec<&SourceFile> {
        self.resources
            .iter_prefix(prefix)
            .filter_map(|(_, n)| n.file())
            .collect()
    }

    /// Regular pages directly owned by a section, unsorted.
    #[must_use]
    pub fn direct_pages(&self, section_key: &str) -> Vec<Arc<Page>> {
        let prefix = format!("{section_key}{BRANCH_SEP}");
        self.pages
            .iter_prefix(&prefix)
            .filter_map(|(_, n)| n.page().cloned())
            .collect()
    }

    /// Sections whose nearest ancestor section is `section_key`, unsorted.
    #[must_use]
    pub fn child_sections(&self, section_key: &str) -> Vec<Arc<Page>> {
        let mut children = Vec::new();
        self.collect_sections(section_key, |_, node| {
            if let Some(page) = node.page() {
                children.push(Arc::clone(page));
            }
        });
        children
    }

    /// Visit the direct child sections of a section in key order.
    pub fn collect_sections<F>(&self, section_key: &str, mut visit: F)
    where
        F: FnMut(&str, &ContentNode),
    {
        for (key, node) in self.sections.iter_prefix(section_key) {
            if key != section_key
                && self.parent_section_key(key).as_deref() == Some(section_key)
            {
                visit(key, node);
            }
        }
    }

    /// Visit every rendered section and page in key order.
    ///
    /// Returns `true` if the walk was stopped early.
    pub fn walk_renderable<F>(&self, mut visit: F) -> bool
    where
        F: FnMut(&str, &Arc<Page>) -> ControlFlow<()>,
    {
        self.with_page_trees(|trees| {
            trees.walk_prefix("", |key, node| match node.page() {
                Some(page) if page.should_render() => visit(key, page),
                _ => ControlFlow::Continue(()),
            })
        })
    }

    /// Page `name` directly owned by the section at `section_path`.
    #[must_use]
    pub fn get_page(&self, section_path: &str, name: &str) -> Option<&ContentNode> {
        let section = clean_section_tree_key(section_path);
        let key = format!("{section}{BRANCH_SEP}{}{LEAF_SEP}", name.to_lowercase());
        self.pages.get(&key)
    }

    /// Section at the given directory path.
    #[must_use]
    pub fn get_section(&self, section_path: &str) -> Option<&ContentNode> {
        self.sections.get(&clean_section_tree_key(section_path))
    }

    /// Visit everything stored below `prefix` across all trees, in key order.
    ///
    /// Returns `true` if the walk was stopped early.
    pub fn walk_below<F>(&self, prefix: &str, mut visit: F) -> bool
    where
        F: FnMut(&str, &ContentNode) -> ControlFlow<()>,
    {
        self.with_bundle_trees(|trees| {
            trees.walk_prefix(prefix, |key, node| {
                if key == prefix {
                    ControlFlow::Continue(())
                } else {
                    visit(key, node)
                }
            })
        })
    }

    /// True if any tree holds a key below `prefix`.
    #[must_use]
    pub fn has_below(&self, prefix: &str) -> bool {
        self.with_bundle_trees(|trees| trees.has_below(prefix))
    }

    /// Aggregated statistics of a section subtree.
    #[must_use]
    pub fn section_stats(&self, section_key: &str) -> Option<&SectionStats> {
        self.stats.get(section_key)
    }

    /// First-level section with the most regular pages.
    #[must_use]
    pub fn main_section(&self) -> Option<&MainSection> {
        self.main_section.as_ref()
    }

    /// Latest dates across the whole site.
    #[must_use]
    pub fn site_dates(&self) -> Dates {
        self.stats.get("/").map(|s| s.dates).unwrap_or_default()
    }

    /// Every page and section listed site-wide, default sorted.
    #[must_use]
    pub fn all_pages(&self) -> Vec<Arc<Page>> {
        let mut all: Vec<Arc<Page>> = self
            .sections
            .iter()
            .chain(self.pages.iter())
            .filter_map(|(_, n)| n.page())
            .filter(|p| p.should_list(true))
            .cloned()
            .collect();
        sort_by_default(&mut all);
        all
    }

    /// Number of first-level sections.
    #[must_use]
    pub fn root_section_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|(k, _)| section_depth(k) == 1)
            .count()
    }
}

/// Precedence among files mapping to the same page key, lowest wins.
///
/// Bundle headers beat plain content files, then the smaller path wins.
fn page_rank(file: &SourceFile) -> (bool, &str) {
    (file.class() != FileClass::LeafHeader, file.path())
}

fn find_key<F>(tree: &KeyedTree<ContentNode>, pred: F) -> Option<String>
where
    F: Fn(&ContentNode) -> bool,
{
    tree.iter()
        .find(|(_, n)| pred(n))
        .map(|(k, _)| k.clone())
}
