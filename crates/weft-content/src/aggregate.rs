//! Bottom-up section statistics.

use std::collections::BTreeMap;

use crate::key::{BRANCH_SEP, first_segment, section_depth};
use crate::map::{ContentMap, MainSection, SectionStats};
use crate::page::{Dated, Kind, Metadata};

impl ContentMap {
    /// Roll page counts and dates up the section tree.
    ///
    /// Sections are visited in reverse key order, so every section is
    /// finished before its parent. Sections whose own front matter has no
    /// dates take the latest dates found below them.
    pub(crate) fn aggregate(&mut self) {
        let mut pending: BTreeMap<String, SectionStats> = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for key in self.sections.keys().into_iter().rev() {
            let mut acc = pending.remove(&key).unwrap_or_default();

            let prefix = format!("{key}{BRANCH_SEP}");
            for (_, node) in self.pages.iter_prefix(&prefix) {
                if let Some(page) = node.page() {
                    acc.page_count += 1;
                    acc.dates.update_date_and_lastmod_if_after(&page.dates());
                }
            }

            if let Some(page) = self.sections.get(&key).and_then(|n| n.page()) {
                acc.dates.update_date_and_lastmod_if_after(&page.own_dates());
                if page.own_dates().is_zero() {
                    page.set_rolled_up_dates(acc.dates);
                }
            }

            if let Some(parent) = self.parent_section_key(&key) {
                let parent_acc = pending.entry(parent).or_default();
                parent_acc.page_count += acc.page_count;
                parent_acc
                    .dates
                    .update_date_and_lastmod_if_after(&acc.dates);
            }
            stats.insert(key, acc);
        }

        self.main_section = stats
            .iter()
            .filter(|(k, _)| section_depth(k) == 1)
            .filter(|(k, _)| {
                self.section_page(k)
                    .is_none_or(|p| matches!(p.kind(), Kind::Section))
            })
            .fold(None::<MainSection>, |best, (k, s)| match best {
                Some(b) if b.page_count >= s.page_count => Some(b),
                _ if s.page_count == 0 => best,
                _ => Some(MainSection {
                    name: first_segment(k).to_owned(),
                    page_count: s.page_count,
                }),
            });
        self.stats = stats;

        tracing::debug!(
            lang = %self.config.lang,
            main_section = ?self.main_section,
            "Aggregated section statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use weft_source::{ContentSource, MockSource, SourceEntry};

    use super::*;
    use crate::map::{MapConfig, MissingSections};
    use crate::node::ContentNode;
    use crate::site::SiteOptions;

    fn build(source: &MockSource, missing: MissingSections) -> ContentMap {
        let mut map = ContentMap::new(MapConfig {
            lang: "en".to_owned(),
            missing_sections: missing,
            taxonomies: Vec::new(),
        });
        let mut dirs = vec![String::new()];
        while let Some(dir) = dirs.pop() {
            for entry in source.read_dir(&dir).unwrap() {
                match entry {
                    SourceEntry::Dir(d) => dirs.push(d),
                    SourceEntry::File(f) => {
                        map.add_file(ContentNode::from_file(f).parsed().unwrap());
                    }
                }
            }
        }
        map.assemble(&SiteOptions::default());
        map
    }

    #[test]
    fn test_main_section_is_largest_first_level_section() {
        let mut source = MockSource::new();
        for i in 0..12 {
            source = source.with_file(&format!("blog/post-{i}.md"), "");
        }
        for i in 0..5 {
            source = source.with_file(&format!("docs/page-{i}.md"), "");
        }

        let map = build(&source, MissingSections::Root);

        assert_eq!(
            map.main_section(),
            Some(&MainSection {
                name: "blog".to_owned(),
                page_count: 12
            })
        );
        assert_eq!(map.section_stats("/").unwrap().page_count, 17);
    }

    #[test]
    fn test_main_section_tie_keeps_first() {
        let source = MockSource::new()
            .with_file("a/one.md", "")
            .with_file("b/two.md", "");

        let map = build(&source, MissingSections::Root);

        assert_eq!(map.main_section().unwrap().name, "a");
    }

    #[test]
    fn test_counts_roll_up_through_nested_sections() {
        let source = MockSource::new()
            .with_file("a/one.md", "")
            .with_file("a/b/two.md", "")
            .with_file("a/b/c/three.md", "");

        let map = build(&source, MissingSections::Eager);

        assert_eq!(map.section_stats("/a/b/c/").unwrap().page_count, 1);
        assert_eq!(map.section_stats("/a/b/").unwrap().page_count, 2);
        assert_eq!(map.section_stats("/a/").unwrap().page_count, 3);
        assert_eq!(map.section_stats("/").unwrap().page_count, 3);
    }

    #[test]
    fn test_section_takes_latest_dates_from_pages() {
        let source = MockSource::new()
            .with_file("blog/old.md", "---\ndate: 2023-01-01\n---\n")
            .with_file("blog/new.md", "---\ndate: 2024-06-01\n---\n")
            .with_file("dated/_index.md", "---\ndate: 2020-01-01\n---\n")
            .with_file("dated/p.md", "---\ndate: 2024-01-01\n---\n");

        let map = build(&source, MissingSections::Root);

        let blog = map.section_page("/blog/").unwrap();
        assert_eq!(blog.date().unwrap().format("%Y-%m-%d").to_string(), "2024-06-01");
        let dated = map.section_page("/dated/").unwrap();
        assert_eq!(dated.date().unwrap().format("%Y-%m-%d").to_string(), "2020-01-01");
        assert_eq!(
            map.site_dates().date.unwrap().format("%Y-%m-%d").to_string(),
            "2024-06-01"
        );
    }

    #[test]
    fn test_no_main_section_without_pages() {
        let source = MockSource::new().with_file("about.md", "");

        let map = build(&source, MissingSections::Root);

        assert_eq!(map.main_section(), None);
        assert_eq!(map.section_stats("/").unwrap().page_count, 1);
    }
}
