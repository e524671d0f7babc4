//! CLI error types.

use weft_config::ConfigError;
use weft_content::BuildError;
use weft_source::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Build(#[from] BuildError),
}
