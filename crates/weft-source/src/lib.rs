//! Classified content source abstraction for weft.
//!
//! This crate provides the input side of content assembly: a [`ContentSource`]
//! trait that lists directories of classified [`SourceFile`] descriptors. The
//! content assembler depends only on this descriptor shape, never on how the
//! underlying files were found or overlaid.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`ContentSource`] trait with a single `read_dir()` method
//! - [`SourceFile`] descriptors carrying path, [`FileClass`], language and an opener
//! - [`classify`] and [`split_lang`] helpers shared by all backends
//! - [`MockSource`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use weft_source::{ContentSource, SourceEntry};
//!
//! for entry in source.read_dir("blog")? {
//!     if let SourceEntry::File(file) = entry {
//!         println!("{} ({:?})", file.path(), file.class());
//!     }
//! }
//! ```

mod classify;
#[cfg(feature = "mock")]
mod mock;
mod source;

pub use classify::{CONTENT_EXTENSIONS, classify, is_content_ext, split_lang};
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use source::{
    ContentSource, FileClass, Open, SourceEntry, SourceError, SourceErrorKind, SourceFile,
};
