//! Shared arguments and the mapping from configuration to build inputs.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use weft_config::{CliSettings, Config, ConfigError};
use weft_content::{MissingSections, SiteOptions, Sites, Taxonomy};
use weft_source_fs::FsSource;

use crate::error::CliError;
use crate::output::Output;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover weft.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Content source directory (replaces configured content dirs).
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Include pages marked as draft.
    #[arg(long, global = true)]
    drafts: bool,

    /// Include pages with a publish date in the future.
    #[arg(long, global = true)]
    future: bool,

    /// Enable verbose output (phase timings and skipped entries).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl SiteArgs {
    /// Load the configuration with command line overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            source_dir: self.source.clone(),
            drafts: self.drafts.then_some(true),
            future: self.future.then_some(true),
            ..CliSettings::default()
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }

    /// Load the configuration and build every site.
    pub(crate) fn build(&self, output: &Output) -> Result<(Config, Sites), CliError> {
        let config = self.load_config()?;
        let source = source_from_config(&config)?;
        let options = options_from_config(&config);

        for root in source.roots() {
            output.info(&format!("Source: {}", root.display()));
        }

        let start = Instant::now();
        let sites = Sites::build(&source, &options)?;
        tracing::info!(
            sites = sites.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Build finished"
        );
        Ok((config, sites))
    }
}

/// Filesystem source over the configured content roots.
pub(crate) fn source_from_config(config: &Config) -> Result<FsSource, CliError> {
    let mut roots = config.content_resolved.roots().into_iter();
    let Some(first) = roots.next() else {
        return Err(ConfigError::Validation("no content directories configured".to_owned()).into());
    };

    let source = roots
        .fold(FsSource::new(first), |source, root| source.with_root(root))
        .with_languages(&config.language_codes())
        .with_ignore(&config.content_resolved.ignore_files)?;
    Ok(source)
}

/// Build options from the loaded configuration.
pub(crate) fn options_from_config(config: &Config) -> SiteOptions {
    let languages = config.language_codes();
    SiteOptions {
        title: config.title.clone(),
        default_language: config.default_language.clone(),
        languages,
        build_drafts: config.build.drafts,
        build_future: config.build.future,
        build_expired: config.build.expired,
        missing_sections: match config.build.missing_sections {
            weft_config::MissingSections::Root => MissingSections::Root,
            weft_config::MissingSections::Eager => MissingSections::Eager,
        },
        taxonomies: config
            .taxonomies
            .iter()
            .map(|(singular, plural)| Taxonomy::new(singular.as_str(), plural.as_str()))
            .collect(),
        cascade: config.cascade.clone(),
        worker_multiplier: config.build.worker_multiplier(),
        ..SiteOptions::default()
    }
}
