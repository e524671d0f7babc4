//! Multi-site build driver.
//!
//! One collection walk feeds a [`ProcessorSet`]; every site's map is then
//! assembled on a bounded rayon pool.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use rayon::prelude::*;
use weft_source::ContentSource;

use crate::assembler::AssembleReport;
use crate::collector::{Collector, FileFilter};
use crate::error::BuildError;
use crate::map::{ContentMap, MapConfig, MissingSections, Taxonomy};
use crate::meta::{PageMeta, Params};
use crate::page::Page;
use crate::processor::ProcessorSet;

/// Build options shared by every site.
#[derive(Clone)]
pub struct SiteOptions {
    /// Site title, used for the home page without a header.
    pub title: String,
    pub default_language: String,
    /// All site languages; the default language is added if missing.
    pub languages: Vec<String>,
    pub build_drafts: bool,
    pub build_future: bool,
    pub build_expired: bool,
    /// Reference time for future and expired checks.
    pub now: DateTime<FixedOffset>,
    pub missing_sections: MissingSections,
    pub taxonomies: Vec<Taxonomy>,
    /// Site-level cascade applied below the home page.
    pub cascade: Params,
    /// Upper bound on sites assembled at the same time.
    pub worker_multiplier: usize,
    /// Source files rejected by this predicate are never collected.
    pub filter: Option<Arc<FileFilter>>,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            default_language: "en".to_owned(),
            languages: Vec::new(),
            build_drafts: false,
            build_future: false,
            build_expired: false,
            now: Utc::now().fixed_offset(),
            missing_sections: MissingSections::default(),
            taxonomies: vec![
                Taxonomy::new("category", "categories"),
                Taxonomy::new("tag", "tags"),
            ],
            cascade: Params::new(),
            worker_multiplier: std::thread::available_parallelism().map_or(1, usize::from),
            filter: None,
        }
    }
}

impl fmt::Debug for SiteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteOptions")
            .field("title", &self.title)
            .field("default_language", &self.default_language)
            .field("languages", &self.languages)
            .field("build_drafts", &self.build_drafts)
            .field("build_future", &self.build_future)
            .field("build_expired", &self.build_expired)
            .field("missing_sections", &self.missing_sections)
            .field("worker_multiplier", &self.worker_multiplier)
            .field("filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

impl SiteOptions {
    /// Set the source file predicate.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&weft_source::SourceFile) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Site languages, default language first, without duplicates.
    #[must_use]
    pub fn site_languages(&self) -> Vec<String> {
        let mut languages = vec![self.default_language.clone()];
        for lang in &self.languages {
            if !languages.contains(lang) {
                languages.push(lang.clone());
            }
        }
        languages
    }

    /// Reason a page is left out of the build, if any.
    #[must_use]
    pub fn exclusion(&self, meta: &PageMeta) -> Option<&'static str> {
        if meta.draft && !self.build_drafts {
            return Some("draft");
        }
        if !self.build_future
            && meta.dates.publish_date.is_some_and(|d| d > self.now)
        {
            return Some("future");
        }
        if !self.build_expired
            && meta.dates.expiry_date.is_some_and(|d| d < self.now)
        {
            return Some("expired");
        }
        None
    }

    /// True if a page with this metadata is part of the build.
    #[must_use]
    pub fn should_build(&self, meta: &PageMeta) -> bool {
        self.exclusion(meta).is_none()
    }

    /// Map settings for one language.
    #[must_use]
    pub fn map_config(&self, lang: &str) -> MapConfig {
        MapConfig {
            lang: lang.to_owned(),
            missing_sections: self.missing_sections,
            taxonomies: self.taxonomies.clone(),
        }
    }
}

/// One assembled site.
#[derive(Debug)]
pub struct Site {
    lang: String,
    map: ContentMap,
    report: AssembleReport,
}

impl Site {
    /// Assemble a populated map.
    #[must_use]
    pub fn assemble(mut map: ContentMap, options: &SiteOptions) -> Self {
        let report = map.assemble(options);
        Self {
            lang: map.lang().to_owned(),
            map,
            report,
        }
    }

    /// Drop every page object and assemble again.
    pub fn rebuild(&mut self, options: &SiteOptions) -> AssembleReport {
        self.map.reset_pages();
        self.report = self.map.assemble(options);
        self.report
    }

    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    #[must_use]
    pub fn map(&self) -> &ContentMap {
        &self.map
    }

    /// Mutable map access for incremental updates before a rebuild.
    pub fn map_mut(&mut self) -> &mut ContentMap {
        &mut self.map
    }

    #[must_use]
    pub fn home(&self) -> Option<Arc<Page>> {
        self.map.home()
    }

    #[must_use]
    pub fn report(&self) -> AssembleReport {
        self.report
    }
}

/// Every site of a build, default language first.
#[derive(Debug)]
pub struct Sites {
    sites: Vec<Site>,
}

impl Sites {
    /// Collect and assemble every site.
    ///
    /// # Arguments
    ///
    /// * `source` - Classified source files shared by all sites
    /// * `options` - Build options
    ///
    /// # Errors
    ///
    /// Returns the first failure. A site's own error takes precedence over
    /// the collection error it caused. No partial result is returned.
    ///
    /// # Panics
    ///
    /// Re-raises internal consistency panics from processors and assembly.
    pub fn build(source: &dyn ContentSource, options: &SiteOptions) -> Result<Self, BuildError> {
        let start = Instant::now();
        let languages = options.site_languages();
        let workers = options.worker_multiplier.max(1);

        let maps = languages
            .iter()
            .map(|lang| ContentMap::new(options.map_config(lang)))
            .collect();
        let processors = ProcessorSet::start(maps, workers * 2);

        let collected = Collector::new(source, &processors)
            .with_filter(options.filter.as_deref())
            .collect();
        let maps = processors.wait()?;
        let stats = collected?;
        tracing::info!(
            sites = maps.len(),
            files = stats.files,
            bundles = stats.bundles,
            elapsed_ms = elapsed_ms(start),
            "Collected content"
        );

        let assemble_start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.min(maps.len()).max(1))
            .build()?;
        let sites: Vec<Site> = pool.install(|| {
            maps.into_par_iter()
                .map(|map| Site::assemble(map, options))
                .collect()
        });

        for site in &sites {
            tracing::info!(
                lang = %site.lang,
                sections = site.report.sections,
                pages = site.report.pages,
                resources = site.report.resources,
                excluded = site.report.excluded,
                "Site assembled"
            );
        }
        tracing::info!(
            sites = sites.len(),
            elapsed_ms = elapsed_ms(assemble_start),
            total_ms = elapsed_ms(start),
            "Assembled sites"
        );
        Ok(Self { sites })
    }

    /// Site for a language.
    #[must_use]
    pub fn get(&self, lang: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.lang == lang)
    }

    /// Mutable site for a language.
    pub fn get_mut(&mut self, lang: &str) -> Option<&mut Site> {
        self.sites.iter_mut().find(|s| s.lang == lang)
    }

    /// Site of the default language.
    #[must_use]
    pub fn default_site(&self) -> Option<&Site> {
        self.sites.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Site> {
        self.sites.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Site> {
        self.sites
    }
}

impl<'a> IntoIterator for &'a Sites {
    type Item = &'a Site;
    type IntoIter = std::slice::Iter<'a, Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::meta::Dates;

    assert_impl_all!(SiteOptions: Send, Sync);
    assert_impl_all!(Sites: Send, Sync);

    fn at(year: i32) -> Option<DateTime<FixedOffset>> {
        Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().fixed_offset())
    }

    fn options() -> SiteOptions {
        SiteOptions {
            now: at(2025).unwrap(),
            ..SiteOptions::default()
        }
    }

    #[test]
    fn test_exclusion_reasons() {
        let opts = options();
        let draft = PageMeta {
            draft: true,
            ..PageMeta::default()
        };
        let future = PageMeta {
            dates: Dates {
                publish_date: at(2030),
                ..Dates::default()
            },
            ..PageMeta::default()
        };
        let expired = PageMeta {
            dates: Dates {
                expiry_date: at(2020),
                ..Dates::default()
            },
            ..PageMeta::default()
        };

        assert_eq!(opts.exclusion(&draft), Some("draft"));
        assert_eq!(opts.exclusion(&future), Some("future"));
        assert_eq!(opts.exclusion(&expired), Some("expired"));
        assert!(opts.should_build(&PageMeta::default()));

        let lenient = SiteOptions {
            build_future: true,
            build_drafts: true,
            ..options()
        };
        assert_eq!(lenient.exclusion(&future), None);
        assert_eq!(lenient.exclusion(&draft), None);
    }

    #[test]
    fn test_site_languages_default_first() {
        let opts = SiteOptions {
            default_language: "fr".to_owned(),
            languages: vec!["en".to_owned(), "fr".to_owned(), "de".to_owned()],
            ..SiteOptions::default()
        };

        assert_eq!(opts.site_languages(), vec!["fr", "en", "de"]);
    }

    #[test]
    fn test_debug_hides_filter() {
        let opts = SiteOptions::default().with_filter(|_| true);

        assert!(format!("{opts:?}").contains("filter: true"));
    }
}
