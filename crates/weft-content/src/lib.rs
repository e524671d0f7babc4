//! Content assembly for weft.
//!
//! This crate turns a stream of classified source files into a hierarchical
//! content model per site:
//! - [`Collector`] walks a [`weft_source::ContentSource`] and groups bundles
//! - [`ProcessorSet`] inserts the items into one [`ContentMap`] per language
//! - [`ContentMap::assemble`] fills gaps, builds [`Page`] objects and
//!   aggregates section statistics
//! - [`Sites::build`] runs all of the above for every language
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use weft_content::{SiteOptions, Sites, TreeNavigation};
//! use weft_source_fs::FsSource;
//!
//! let source = FsSource::new("content");
//! let sites = Sites::build(&source, &SiteOptions::default())?;
//!
//! let site = sites.default_site().expect("at least one site");
//! let home = site.home().expect("home is always assembled");
//! for section in home.sections(site.map()) {
//!     println!("{}", section.key());
//! }
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod assembler;
mod bucket;
mod collector;
mod error;
pub mod key;
mod map;
mod meta;
mod node;
mod page;
mod processor;
mod site;
mod sort;
mod tree;

pub use assembler::AssembleReport;
pub use bucket::PagesBucket;
pub use collector::{CollectStats, Collector, FileFilter, Item, ItemSink};
pub use error::BuildError;
pub use map::{
    ContentMap, ContentTrees, MainSection, MapConfig, MissingSections, SectionStats, Taxonomy,
};
pub use meta::{
    BuildOptions, Dates, FrontMatter, FrontMatterError, ListMode, PageMeta, Params, RenderMode,
    parse_date,
};
pub use node::{ContentNode, ViewInfo, read_front_matter};
pub use page::{Content, Dated, Kind, Metadata, Page, Renderable, TreeNavigation};
pub use processor::{Processor, ProcessorSet};
pub use site::{Site, SiteOptions, Sites};
pub use sort::{default_cmp, sort_by_default};
pub use tree::KeyedTree;
