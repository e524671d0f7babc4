//! Build error types.

use weft_source::SourceError;

/// Error returned when building the content model fails.
///
/// Internal consistency violations are not represented here: they panic.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Listing or reading a source file failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    /// A header or content file has invalid front matter.
    #[error("Front matter error in {path}: {message}")]
    FrontMatter {
        /// Relative path of the offending file.
        path: String,
        /// Parser message.
        message: String,
    },
    /// Building one site failed.
    #[error("Site '{lang}' failed: {source}")]
    Site {
        /// Language of the failed site.
        lang: String,
        /// Underlying failure.
        #[source]
        source: Box<BuildError>,
    },
    /// The build was stopped because another part of it failed.
    #[error("Build cancelled")]
    Cancelled,
    /// The worker pool could not be created.
    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl BuildError {
    /// Wrap an error with the language of the site it happened in.
    #[must_use]
    pub fn in_site(self, lang: &str) -> Self {
        match self {
            Self::Site { .. } | Self::Cancelled => self,
            other => Self::Site {
                lang: lang.to_owned(),
                source: Box::new(other),
            },
        }
    }
}
