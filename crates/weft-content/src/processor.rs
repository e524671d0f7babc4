//! Per-site intake.
//!
//! Each site gets one [`Processor`]: a thread owning the site's
//! [`ContentMap`] fed through a bounded queue. The collector blocks while a
//! queue is full. After the first failure a processor keeps draining its
//! queue without inserting anything, so producers never block on it.

use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use weft_source::FileClass;

use crate::collector::{Item, ItemSink};
use crate::error::BuildError;
use crate::map::ContentMap;
use crate::node::ContentNode;

/// Intake pipeline of one site.
pub struct Processor {
    lang: String,
    tx: Option<SyncSender<Item>>,
    handle: Option<JoinHandle<Result<ContentMap, BuildError>>>,
    failed: Arc<AtomicBool>,
}

impl Processor {
    /// Start the consumer thread for a map.
    ///
    /// `capacity` bounds the number of queued items.
    #[must_use]
    pub fn spawn(map: ContentMap, capacity: usize) -> Self {
        let lang = map.lang().to_owned();
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let failed = Arc::new(AtomicBool::new(false));

        let consumer_failed = Arc::clone(&failed);
        let handle = thread::spawn(move || consume(map, &rx, &consumer_failed));

        Self {
            lang,
            tx: Some(tx),
            handle: Some(handle),
            failed,
        }
    }

    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Queue an item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Cancelled`] once the processor has failed.
    pub fn process(&self, item: Item) -> Result<(), BuildError> {
        if self.failed.load(Ordering::Acquire) {
            return Err(BuildError::Cancelled);
        }
        let Some(tx) = &self.tx else {
            return Err(BuildError::Cancelled);
        };
        tx.send(item).map_err(|_| BuildError::Cancelled)
    }

    /// Close the queue and wait until every queued item is applied.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while applying items.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the consumer thread.
    pub fn wait(mut self) -> Result<ContentMap, BuildError> {
        match self.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn join(&mut self) -> thread::Result<Result<ContentMap, BuildError>> {
        self.tx.take();
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(Err(BuildError::Cancelled)),
        }
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Let the consumer finish; its result is no longer wanted
            let _ = self.join();
        }
    }
}

fn consume(
    mut map: ContentMap,
    rx: &Receiver<Item>,
    failed: &AtomicBool,
) -> Result<ContentMap, BuildError> {
    let mut first_error = None;
    let mut applied = 0usize;

    for item in rx {
        if first_error.is_some() {
            continue;
        }
        match apply(&mut map, item) {
            Ok(()) => applied += 1,
            Err(e) => {
                tracing::debug!(lang = %map.lang(), error = %e, "Processor failed, draining");
                failed.store(true, Ordering::Release);
                first_error = Some(e);
            }
        }
    }

    tracing::debug!(lang = %map.lang(), applied, "Processor drained");
    match first_error {
        Some(e) => Err(e),
        None => Ok(map),
    }
}

fn apply(map: &mut ContentMap, item: Item) -> Result<(), BuildError> {
    match item {
        Item::File(file) => {
            let node = ContentNode::from_file(file).parsed()?;
            map.add_file(node);
        }
        Item::Bundle { header, resources } => {
            let header = ContentNode::from_file(header).parsed()?;
            let resources = resources
                .into_iter()
                .map(|file| {
                    let parse = file.class() == FileClass::Content;
                    let node = ContentNode::from_file(file);
                    if parse { node.parsed() } else { Ok(node) }
                })
                .collect::<Result<Vec<_>, _>>()?;
            map.add_bundle(header, resources);
        }
    }
    Ok(())
}

/// One processor per site, routing items by language.
pub struct ProcessorSet {
    languages: Vec<String>,
    processors: Vec<Processor>,
}

impl ProcessorSet {
    /// Start a processor for every map. The first map's language is the
    /// default language.
    #[must_use]
    pub fn start(maps: Vec<ContentMap>, capacity: usize) -> Self {
        let processors: Vec<Processor> = maps
            .into_iter()
            .map(|map| Processor::spawn(map, capacity))
            .collect();
        Self {
            languages: processors.iter().map(|p| p.lang.clone()).collect(),
            processors,
        }
    }

    /// Wait for every processor.
    ///
    /// All processors are joined before anything is returned. Maps are
    /// returned in start order.
    ///
    /// # Errors
    ///
    /// Returns the first failing site's error, wrapped with its language.
    ///
    /// # Panics
    ///
    /// Re-raises the first panic from any consumer thread.
    pub fn wait(self) -> Result<Vec<ContentMap>, BuildError> {
        let mut joined = Vec::with_capacity(self.processors.len());
        for mut processor in self.processors {
            let lang = std::mem::take(&mut processor.lang);
            joined.push((lang, processor.join()));
        }

        let mut maps = Vec::with_capacity(joined.len());
        let mut first_error = None;
        let mut first_panic = None;
        for (lang, result) in joined {
            match result {
                Ok(Ok(map)) => maps.push(map),
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e.in_site(&lang));
                    }
                }
                Err(payload) => {
                    if first_panic.is_none() {
                        first_panic = Some(payload);
                    }
                }
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(maps),
        }
    }
}

impl ItemSink for ProcessorSet {
    fn send(&self, item: Item) -> Result<(), BuildError> {
        let Some(processor) = self.processors.iter().find(|p| p.lang == item.lang()) else {
            tracing::warn!(lang = %item.lang(), "No site for language, skipping item");
            return Ok(());
        };
        processor.process(item)
    }

    fn languages(&self) -> &[String] {
        &self.languages
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;
    use weft_source::{ContentSource, MockSource, SourceEntry, SourceFile};

    use super::*;
    use crate::map::MapConfig;

    assert_impl_all!(Processor: Send);
    assert_impl_all!(ContentMap: Send, Sync);
    assert_impl_all!(Item: Send);

    fn map(lang: &str) -> ContentMap {
        ContentMap::new(MapConfig {
            lang: lang.to_owned(),
            ..MapConfig::default()
        })
    }

    fn files(source: &MockSource, dir: &str) -> Vec<SourceFile> {
        source
            .read_dir(dir)
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                SourceEntry::File(f) => Some(f),
                SourceEntry::Dir(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_items_are_applied_in_order() {
        let source = MockSource::new()
            .with_file("blog/a.md", "")
            .with_file("blog/b.md", "");
        let processor = Processor::spawn(map("en"), 1);

        for file in files(&source, "blog") {
            processor.process(Item::File(file)).unwrap();
        }
        let map = processor.wait().unwrap();

        assert_eq!(
            map.pages().keys(),
            vec!["/blog/__hb_a__hl_", "/blog/__hb_b__hl_"]
        );
    }

    #[test]
    fn test_failure_drains_and_reports_first_error() {
        let source = MockSource::new()
            .with_file("a.md", "---\ntitle: [\n---\n")
            .with_file("b.md", "---\ntitle: [\n---\n")
            .with_file("c.md", "");
        let processor = Processor::spawn(map("en"), 1);

        for file in files(&source, "") {
            // Sends after the failure is noticed are refused
            let _ = processor.process(Item::File(file));
        }
        let err = processor.wait().unwrap_err();

        assert!(matches!(err, BuildError::FrontMatter { ref path, .. } if path == "a.md"));
    }

    #[test]
    fn test_set_routes_by_language() {
        let source = MockSource::new()
            .with_languages(&["en", "fr"])
            .with_file("a.md", "")
            .with_file("a.fr.md", "")
            .with_lang_file("b.md", "de", "");
        let set = ProcessorSet::start(vec![map("en"), map("fr")], 4);

        for file in files(&source, "") {
            set.send(Item::File(file)).unwrap();
        }
        let maps = set.wait().unwrap();

        assert_eq!(maps[0].pages().keys(), vec!["/__hb_a__hl_"]);
        assert_eq!(maps[1].pages().keys(), vec!["/__hb_a__hl_"]);
        assert_eq!(maps[1].lang(), "fr");
    }

    #[test]
    fn test_set_wraps_error_with_language() {
        let source = MockSource::new()
            .with_languages(&["en", "fr"])
            .with_file("bad.fr.md", "+++\ntitle = \n+++\n");
        let set = ProcessorSet::start(vec![map("en"), map("fr")], 4);

        for file in files(&source, "") {
            let _ = set.send(Item::File(file));
        }
        let err = set.wait().unwrap_err();

        assert!(matches!(err, BuildError::Site { ref lang, .. } if lang == "fr"));
    }

    #[test]
    #[should_panic(expected = "BUG: invalid classifier")]
    fn test_consumer_panic_is_reraised() {
        let source = MockSource::new().with_file("img.png", "");
        let processor = Processor::spawn(map("en"), 1);

        let header = files(&source, "").remove(0);
        let _ = processor.process(Item::Bundle {
            header,
            resources: Vec::new(),
        });
        let _ = processor.wait();
    }
}
