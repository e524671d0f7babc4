//! Turns a populated content map into page objects.
//!
//! Runs after intake finished. Sections are assembled before pages; both
//! walks rely on parents sorting before their children.

use std::sync::Arc;
use std::time::Instant;

use weft_source::FileClass;

use crate::bucket::PagesBucket;
use crate::key::{LEAF_SEP, parent_dir_key, split_page_key};
use crate::map::ContentMap;
use crate::node::ContentNode;
use crate::page::{Kind, Page, PageInit};
use crate::site::SiteOptions;

/// Counts reported by [`ContentMap::assemble`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleReport {
    pub sections: usize,
    pub pages: usize,
    /// Content files inside leaf bundles turned into pages.
    pub bundled: usize,
    pub resources: usize,
    /// Pages and sections dropped as draft, future or expired.
    pub excluded: usize,
    /// Synthesized sections removed because nothing lived below them.
    pub orphans_removed: usize,
}

impl ContentMap {
    /// Fill gaps, build page objects and aggregate section statistics.
    ///
    /// Nodes that already have a page object are left alone, so a map can be
    /// assembled again after [`ContentMap::reset_pages`].
    ///
    /// # Panics
    ///
    /// Panics if a page's owning section has no page object after the
    /// section pass.
    pub fn assemble(&mut self, options: &SiteOptions) -> AssembleReport {
        let start = Instant::now();
        let mut report = AssembleReport::default();

        self.create_missing_nodes();
        let site_bucket = Arc::new(PagesBucket::site(options.cascade.clone()));
        self.site_bucket = Some(Arc::clone(&site_bucket));

        self.assemble_sections(options, &site_bucket, &mut report);
        self.assemble_pages(options, &mut report);
        report.orphans_removed = self.delete_orphan_sections();
        self.aggregate();

        report.sections = self.sections.len();
        report.pages = self.pages.len();
        report.resources = self.resources.len().saturating_sub(report.bundled);

        tracing::debug!(
            lang = %self.config.lang,
            sections = report.sections,
            pages = report.pages,
            bundled = report.bundled,
            resources = report.resources,
            excluded = report.excluded,
            orphans = report.orphans_removed,
            elapsed_ms = crate::site::elapsed_ms(start),
            "Assembled content map"
        );
        report
    }

    fn assemble_sections(
        &mut self,
        options: &SiteOptions,
        site_bucket: &Arc<PagesBucket>,
        report: &mut AssembleReport,
    ) {
        for key in self.sections.keys() {
            let Some(node) = self.sections.get(&key) else {
                // Removed together with an excluded ancestor
                continue;
            };
            if node.page().is_some() {
                continue;
            }

            if key != "/"
                && let Some(reason) = node
                    .front_matter()
                    .and_then(|fm| options.exclusion(&fm.meta))
            {
                tracing::debug!(section = %key, reason, "Excluding section");
                self.delete_section_by_path(&key);
                report.excluded += 1;
                continue;
            }

            let parent_bucket = if key == "/" {
                Arc::clone(site_bucket)
            } else {
                let parent = self
                    .section_for(&parent_dir_key(&key))
                    .and_then(|p| self.section_page(&p))
                    .and_then(|p| p.bucket().cloned());
                match parent {
                    Some(bucket) => bucket,
                    None => panic!("BUG: parent not set for section {key:?}"),
                }
            };

            let Some(node) = self.sections.get(&key) else {
                continue;
            };
            let view_info = node.view_info().cloned();
            let kind = match &view_info {
                _ if key == "/" => Kind::Home,
                Some(v) if v.is_taxonomy() => Kind::Taxonomy,
                Some(_) => Kind::Term,
                None => Kind::Section,
            };
            let default_title = match (kind, &view_info) {
                (Kind::Home, _) => options.title.clone(),
                (Kind::Taxonomy, Some(v)) => titlecase_from_slug(&v.plural),
                (Kind::Term, Some(v)) => titlecase_from_slug(last_segment(&v.term)),
                _ => titlecase_from_slug(last_segment(&key)),
            };

            let page = Page::new(PageInit {
                kind,
                key: key.clone(),
                section_key: key.clone(),
                lang: &self.config.lang,
                file: node.file().cloned(),
                front_matter: node.front_matter().cloned(),
                default_title,
                view_info,
                parent_bucket: Some(&parent_bucket),
                bundled: false,
            });
            node.set_page(Arc::clone(&page));

            if let Some(bucket) = page.bucket() {
                let bucket = Arc::clone(bucket);
                self.assemble_resources(
                    &format!("{key}{LEAF_SEP}"),
                    &key,
                    &bucket,
                    options,
                    report,
                );
            }
        }
    }

    fn assemble_pages(&mut self, options: &SiteOptions, report: &mut AssembleReport) {
        for key in self.pages.keys() {
            let Some(node) = self.pages.get(&key) else {
                continue;
            };
            if node.page().is_some() {
                continue;
            }

            if let Some(reason) = node
                .front_matter()
                .and_then(|fm| options.exclusion(&fm.meta))
            {
                tracing::debug!(page = %key, reason, "Excluding page");
                self.delete_page(&key);
                report.excluded += 1;
                continue;
            }

            let Some((section_key, _)) = split_page_key(&key) else {
                panic!("BUG: malformed page key {key:?}");
            };
            let Some(bucket) = self
                .section_page(section_key)
                .and_then(|p| p.bucket().cloned())
            else {
                panic!("BUG: parent not set for page {key:?}");
            };

            let page = new_regular_page(
                node,
                &key,
                section_key,
                &self.config.lang,
                &bucket,
                false,
            );
            node.set_page(page);

            self.assemble_resources(&key, section_key, &bucket, options, report);
        }
    }

    /// Build page objects for content files among the resources below `prefix`.
    fn assemble_resources(
        &mut self,
        prefix: &str,
        section_key: &str,
        bucket: &Arc<PagesBucket>,
        options: &SiteOptions,
        report: &mut AssembleReport,
    ) {
        for key in self.resources.keys_with_prefix(prefix) {
            let Some(node) = self.resources.get(&key) else {
                continue;
            };
            let is_content = node.file().is_some_and(|f| f.class() == FileClass::Content);
            if !is_content || node.page().is_some() {
                continue;
            }
            if let Some(reason) = node
                .front_matter()
                .and_then(|fm| options.exclusion(&fm.meta))
            {
                tracing::debug!(resource = %key, reason, "Excluding bundled page");
                self.resources.delete(&key);
                report.excluded += 1;
                continue;
            }
            let page = new_regular_page(
                node,
                &key,
                section_key,
                &self.config.lang,
                bucket,
                true,
            );
            node.set_page(page);
            report.bundled += 1;
        }
    }
}

fn new_regular_page(
    node: &ContentNode,
    key: &str,
    section_key: &str,
    lang: &str,
    parent_bucket: &Arc<PagesBucket>,
    bundled: bool,
) -> Arc<Page> {
    Page::new(PageInit {
        kind: Kind::Page,
        key: key.to_owned(),
        section_key: section_key.to_owned(),
        lang,
        file: node.file().cloned(),
        front_matter: node.front_matter().cloned(),
        default_title: String::new(),
        view_info: None,
        parent_bucket: Some(parent_bucket),
        bundled,
    })
}

fn last_segment(key: &str) -> &str {
    key.trim_matches('/').rsplit('/').next().unwrap_or("")
}

/// Convert a slug (kebab-case or `snake_case`) to title case.
///
/// Replaces `-` and `_` with spaces, then capitalizes the first letter of each word.
fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}
