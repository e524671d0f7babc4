//! Directory walk that groups source files into bundles.
//!
//! The walk is depth-first. A directory holding a leaf header (`index.md`)
//! is one page: everything below it becomes that page's resources and the
//! walk stops there. A directory holding a branch header (`_index.md`) is a
//! section whose header is sent with the directory's resource files; the
//! walk continues into its subdirectories. Other files are sent one by one.

use std::collections::BTreeMap;

use weft_source::{ContentSource, FileClass, SourceEntry, SourceFile};

use crate::error::BuildError;

/// Unit of work handed to a site's processor.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A single content file or a standalone resource.
    File(SourceFile),
    /// A bundle header with its resource files.
    Bundle {
        header: SourceFile,
        resources: Vec<SourceFile>,
    },
}

impl Item {
    /// Language of the site the item belongs to.
    #[must_use]
    pub fn lang(&self) -> &str {
        match self {
            Self::File(file) => file.lang(),
            Self::Bundle { header, .. } => header.lang(),
        }
    }
}

/// Receiver of collected items.
pub trait ItemSink {
    /// Deliver an item to the site of its language.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiving site failed; collection stops.
    fn send(&self, item: Item) -> Result<(), BuildError>;

    /// Languages of the receiving sites, default language first.
    fn languages(&self) -> &[String];
}

/// Predicate deciding whether a source file takes part in the build.
pub type FileFilter = dyn Fn(&SourceFile) -> bool + Send + Sync;

/// Counts reported by [`Collector::collect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub dirs: usize,
    pub files: usize,
    pub bundles: usize,
}

/// Walks a [`ContentSource`] and feeds an [`ItemSink`].
pub struct Collector<'a, S: ItemSink + ?Sized> {
    source: &'a dyn ContentSource,
    sink: &'a S,
    filter: Option<&'a FileFilter>,
    stats: CollectStats,
}

impl<'a, S: ItemSink + ?Sized> Collector<'a, S> {
    #[must_use]
    pub fn new(source: &'a dyn ContentSource, sink: &'a S) -> Self {
        Self {
            source,
            sink,
            filter: None,
            stats: CollectStats::default(),
        }
    }

    /// Skip files the predicate rejects.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<&'a FileFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Walk the whole source.
    ///
    /// # Errors
    ///
    /// Returns the first listing error other than a missing directory, or
    /// the sink's error if a site failed.
    pub fn collect(mut self) -> Result<CollectStats, BuildError> {
        self.collect_dir("")?;
        tracing::debug!(
            dirs = self.stats.dirs,
            files = self.stats.files,
            bundles = self.stats.bundles,
            "Collected content"
        );
        Ok(self.stats)
    }

    /// List a directory, treating a vanished one as empty.
    fn list(&mut self, dir: &str) -> Result<(Vec<String>, Vec<SourceFile>), BuildError> {
        let entries = match self.source.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                tracing::warn!(dir = %dir, "Directory disappeared during collection, skipping");
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => return Err(e.into()),
        };
        self.stats.dirs += 1;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                SourceEntry::Dir(path) => dirs.push(path),
                SourceEntry::File(file) => {
                    if self.filter.is_some_and(|keep| !keep(&file)) {
                        tracing::debug!(path = %file.path(), "Filtered out");
                        continue;
                    }
                    files.push(file);
                }
            }
        }
        Ok((dirs, files))
    }

    fn collect_dir(&mut self, dir: &str) -> Result<(), BuildError> {
        let (dirs, mut files) = self.list(dir)?;

        if dir.is_empty() {
            // index.md at the content root is a plain page
            for file in &mut files {
                if file.class() == FileClass::LeafHeader {
                    *file = file.with_class(FileClass::Content);
                }
            }
        }

        if files.iter().any(|f| f.class() == FileClass::LeafHeader) {
            let mut contents = files;
            for sub in dirs {
                self.collect_tree(&sub, &mut contents)?;
            }
            return self.send_leaf(contents);
        }

        if files.iter().any(|f| f.class() == FileClass::BranchHeader) {
            self.send_branch(files)?;
        } else {
            for file in files {
                self.send_file(file)?;
            }
        }

        for sub in dirs {
            self.collect_dir(&sub)?;
        }
        Ok(())
    }

    /// Gather every file below a leaf bundle directory.
    fn collect_tree(&mut self, dir: &str, out: &mut Vec<SourceFile>) -> Result<(), BuildError> {
        let (dirs, files) = self.list(dir)?;
        for file in files {
            // Headers nested in a bundle are ordinary bundled content
            let file = if file.class().is_bundle_header() {
                file.with_class(FileClass::Content)
            } else {
                file
            };
            out.push(file);
        }
        for sub in dirs {
            self.collect_tree(&sub, out)?;
        }
        Ok(())
    }

    fn send_file(&mut self, file: SourceFile) -> Result<(), BuildError> {
        self.stats.files += 1;
        if file.class() == FileClass::Resource {
            for lang in self.sink.languages() {
                self.sink.send(Item::File(file.with_lang(lang)))?;
            }
            return Ok(());
        }
        self.sink.send(Item::File(file))
    }

    fn send_leaf(&mut self, files: Vec<SourceFile>) -> Result<(), BuildError> {
        let (headers, rest): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| f.class() == FileClass::LeafHeader);
        let mut bundles = bundles_by_lang(headers);
        let Some(template) = self.template_header(&bundles) else {
            return Ok(());
        };

        let (contents, resources): (Vec<_>, Vec<_>) = rest
            .into_iter()
            .partition(|f| f.class() != FileClass::Resource);

        self.stats.files += contents.len() + resources.len();
        for file in contents {
            let lang = file.lang().to_owned();
            bundles
                .entry(lang.clone())
                .or_insert_with(|| (template.with_lang(&lang), Vec::new()))
                .1
                .push(file);
        }
        for file in &resources {
            for (lang, (_, bundle)) in &mut bundles {
                bundle.push(file.with_lang(lang));
            }
        }
        self.send_bundles(bundles)
    }

    fn send_branch(&mut self, files: Vec<SourceFile>) -> Result<(), BuildError> {
        let (headers, rest): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| f.class() == FileClass::BranchHeader);
        let mut bundles = bundles_by_lang(headers);

        for file in rest {
            if file.class() != FileClass::Resource {
                self.send_file(file)?;
                continue;
            }
            self.stats.files += 1;
            for lang in self.sink.languages() {
                match bundles.get_mut(lang) {
                    Some((_, resources)) => resources.push(file.with_lang(lang)),
                    None => self.sink.send(Item::File(file.with_lang(lang)))?,
                }
            }
        }
        self.send_bundles(bundles)
    }

    fn send_bundles(&mut self, bundles: Bundles) -> Result<(), BuildError> {
        for (_, (header, resources)) in bundles {
            self.stats.bundles += 1;
            self.stats.files += 1;
            self.sink.send(Item::Bundle { header, resources })?;
        }
        Ok(())
    }

    /// Header cloned for languages that have bundled content but no header.
    fn template_header(&self, bundles: &Bundles) -> Option<SourceFile> {
        self.sink
            .languages()
            .first()
            .and_then(|default| bundles.get(default))
            .or_else(|| bundles.values().next())
            .map(|(header, _)| header.clone())
    }
}

type Bundles = BTreeMap<String, (SourceFile, Vec<SourceFile>)>;

/// One bundle per header language; later duplicates are dropped.
fn bundles_by_lang(headers: Vec<SourceFile>) -> Bundles {
    let mut bundles = Bundles::new();
    for header in headers {
        let lang = header.lang().to_owned();
        if let Some((kept, _)) = bundles.get(&lang) {
            tracing::warn!(
                kept = %kept.path(),
                ignored = %header.path(),
                "Duplicate bundle header for language"
            );
            continue;
        }
        bundles.insert(lang, (header, Vec::new()));
    }
    bundles
}
