//! Configuration management for weft.
//!
//! Parses `weft.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `title`
//! - `content.dirs`
//! - `content.themes`

mod expand;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "weft.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Replace all project content directories with this one.
    pub source_dir: Option<PathBuf>,
    /// Override draft inclusion.
    pub drafts: Option<bool>,
    /// Override future content inclusion.
    pub future: Option<bool>,
    /// Override worker multiplier.
    pub workers: Option<usize>,
}

/// How pages in directories without section headers are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSections {
    /// Only first-level sections are synthesized; deeper pages nest under
    /// the nearest existing ancestor.
    #[default]
    Root,
    /// Every intermediate directory gets a synthesized section.
    Eager,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site title.
    pub title: String,
    /// Language used for files without a language segment.
    pub default_language: String,
    /// Content locations (paths are relative strings from TOML).
    content: ContentConfigRaw,
    /// Build options.
    pub build: BuildConfig,
    /// Site languages. Defaults to the default language alone.
    pub languages: Vec<LanguageConfig>,
    /// Taxonomies, singular name to plural name.
    pub taxonomies: BTreeMap<String, String>,
    /// Site-wide cascade applied to every page.
    pub cascade: serde_json::Map<String, serde_json::Value>,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw content configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    dirs: Option<Vec<String>>,
    themes: Vec<String>,
    ignore_files: Vec<String>,
}

/// Resolved content configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Project content roots, highest priority first.
    pub dirs: Vec<PathBuf>,
    /// Theme content roots, searched after the project roots.
    pub themes: Vec<PathBuf>,
    /// Glob patterns of relative paths to skip.
    pub ignore_files: Vec<String>,
}

impl ContentConfig {
    /// All content roots in priority order.
    #[must_use]
    pub fn roots(&self) -> Vec<PathBuf> {
        self.dirs.iter().chain(&self.themes).cloned().collect()
    }
}

/// Build options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Include pages marked as draft.
    pub drafts: bool,
    /// Include pages with a publish date in the future.
    pub future: bool,
    /// Include pages past their expiry date.
    pub expired: bool,
    /// Worker multiplier, 0 means the number of available CPUs.
    pub workers: usize,
    /// Placement of pages in directories without section headers.
    pub missing_sections: MissingSections,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            drafts: false,
            future: false,
            expired: false,
            workers: 0,
            missing_sections: MissingSections::Root,
        }
    }
}

impl BuildConfig {
    /// Effective worker multiplier.
    #[must_use]
    pub fn worker_multiplier(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(4, std::num::NonZero::get)
    }
}

/// One site language.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageConfig {
    /// Language code used in file names (`post.fr.md`).
    pub code: String,
    /// Optional per-language site title.
    pub title: Option<String>,
    /// Sort weight among languages.
    #[serde(default)]
    pub weight: i32,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`content.dirs[0]`").
        field: String,
        /// Error message (e.g., "${`CONTENT_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `weft.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Relative paths are resolved against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;
        config.resolve(base);
        config.validate()?;

        Ok(config)
    }

    /// Language codes in site order, default language first.
    #[must_use]
    pub fn language_codes(&self) -> Vec<String> {
        if self.languages.is_empty() {
            return vec![self.default_language.clone()];
        }
        let mut languages = self.languages.clone();
        languages.sort_by_key(|l| (l.code != self.default_language, l.weight));
        languages.into_iter().map(|l| l.code).collect()
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.content_resolved.dirs = vec![source_dir.clone()];
        }
        if let Some(drafts) = settings.drafts {
            self.build.drafts = drafts;
        }
        if let Some(future) = settings.future {
            self.build.future = future;
        }
        if let Some(workers) = settings.workers {
            self.build.workers = workers;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            title: String::new(),
            default_language: "en".to_owned(),
            content: ContentConfigRaw::default(),
            build: BuildConfig::default(),
            languages: Vec::new(),
            taxonomies: default_taxonomies(),
            cascade: serde_json::Map::new(),
            content_resolved: ContentConfig {
                dirs: vec![base.join("content")],
                themes: Vec::new(),
                ignore_files: Vec::new(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_content()?;
        self.validate_languages()?;
        self.validate_taxonomies()?;
        Ok(())
    }

    fn validate_content(&self) -> Result<(), ConfigError> {
        if let Some(dirs) = &self.content.dirs {
            if dirs.is_empty() {
                return Err(ConfigError::Validation(
                    "content.dirs cannot be empty".to_owned(),
                ));
            }
            for (i, dir) in dirs.iter().enumerate() {
                require_non_empty(dir, &format!("content.dirs[{i}]"))?;
            }
        }
        Ok(())
    }

    fn validate_languages(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.default_language, "default_language")?;

        let mut seen = HashSet::new();
        for lang in &self.languages {
            require_non_empty(&lang.code, "languages.code")?;
            if !seen.insert(lang.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate language code '{}'",
                    lang.code
                )));
            }
        }

        if !seen.is_empty() && !seen.contains(self.default_language.as_str()) {
            return Err(ConfigError::Validation(format!(
                "default_language '{}' is not listed in [[languages]]",
                self.default_language
            )));
        }
        Ok(())
    }

    fn validate_taxonomies(&self) -> Result<(), ConfigError> {
        let mut plurals = HashSet::new();
        for (singular, plural) in &self.taxonomies {
            require_non_empty(singular, "taxonomies")?;
            require_non_empty(plural, &format!("taxonomies.{singular}"))?;
            if !plurals.insert(plural.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "taxonomy plural '{plural}' is used more than once"
                )));
            }
        }
        for singular in self.taxonomies.keys() {
            if plurals.contains(singular.as_str()) && self.taxonomies[singular] != *singular {
                return Err(ConfigError::Validation(format!(
                    "taxonomy '{singular}' collides with another taxonomy's plural"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.title = expand::expand_env(&self.title, "title")?;
        if let Some(dirs) = &mut self.content.dirs {
            expand::expand_all(dirs, "content.dirs")?;
        }
        expand::expand_all(&mut self.content.themes, "content.themes")?;
        Ok(())
    }

    /// Resolve relative paths and fill defaults that depend on other fields.
    fn resolve(&mut self, config_dir: &Path) {
        let dirs = match &self.content.dirs {
            Some(dirs) => dirs.iter().map(|d| config_dir.join(d)).collect(),
            None => vec![config_dir.join("content")],
        };
        self.content_resolved = ContentConfig {
            dirs,
            themes: self
                .content
                .themes
                .iter()
                .map(|d| config_dir.join(d))
                .collect(),
            ignore_files: self.content.ignore_files.clone(),
        };

        if self.languages.is_empty() {
            self.languages.push(LanguageConfig {
                code: self.default_language.clone(),
                title: None,
                weight: 0,
            });
        }
    }
}

fn default_taxonomies() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("category".to_owned(), "categories".to_owned()),
        ("tag".to_owned(), "tags".to_owned()),
    ])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.default_language, "en");
        assert_eq!(config.content_resolved.dirs, vec![PathBuf::from("/test/content")]);
        assert_eq!(config.build.missing_sections, MissingSections::Root);
        assert!(!config.build.drafts);
        assert!(!config.build.future);
        assert_eq!(config.language_codes(), vec!["en".to_owned()]);
        assert_eq!(config.taxonomies.get("tag"), Some(&"tags".to_owned()));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml("", Path::new("/project")).unwrap();

        assert_eq!(
            config.content_resolved.dirs,
            vec![PathBuf::from("/project/content")]
        );
        assert_eq!(config.language_codes(), vec!["en".to_owned()]);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
title = "My Site"
default_language = "fr"

[content]
dirs = ["content", "extra"]
themes = ["themes/base/content"]
ignore_files = ["*.tmp"]

[build]
drafts = true
future = true
workers = 3
missing_sections = "eager"

[[languages]]
code = "en"
weight = 2

[[languages]]
code = "fr"
weight = 1

[taxonomies]
tag = "tags"

[cascade]
author = "Site Team"
"#;
        let config = Config::from_toml(toml, Path::new("/project")).unwrap();

        assert_eq!(config.title, "My Site");
        assert_eq!(
            config.content_resolved.roots(),
            vec![
                PathBuf::from("/project/content"),
                PathBuf::from("/project/extra"),
                PathBuf::from("/project/themes/base/content"),
            ]
        );
        assert_eq!(config.content_resolved.ignore_files, vec!["*.tmp".to_owned()]);
        assert!(config.build.drafts);
        assert!(config.build.future);
        assert_eq!(config.build.worker_multiplier(), 3);
        assert_eq!(config.build.missing_sections, MissingSections::Eager);
        assert_eq!(config.language_codes(), vec!["fr".to_owned(), "en".to_owned()]);
        assert_eq!(config.taxonomies.len(), 1);
        assert_eq!(
            config.cascade.get("author"),
            Some(&serde_json::Value::String("Site Team".to_owned()))
        );
    }

    #[test]
    fn test_empty_content_dirs_rejected() {
        let err = Config::from_toml("[content]\ndirs = []\n", Path::new("/p")).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("content.dirs"));
    }

    #[test]
    fn test_duplicate_language_rejected() {
        let toml = r#"
[[languages]]
code = "en"
[[languages]]
code = "en"
"#;
        let err = Config::from_toml(toml, Path::new("/p")).unwrap_err();

        assert!(err.to_string().contains("duplicate language"));
    }

    #[test]
    fn test_default_language_must_be_listed() {
        let toml = r#"
default_language = "de"
[[languages]]
code = "en"
"#;
        let err = Config::from_toml(toml, Path::new("/p")).unwrap_err();

        assert!(err.to_string().contains("default_language"));
    }

    #[test]
    fn test_taxonomy_collision_rejected() {
        let toml = r#"
[taxonomies]
tag = "tags"
tags = "labels"
"#;
        let err = Config::from_toml(toml, Path::new("/p")).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_missing_sections_mode() {
        let err = Config::from_toml("[build]\nmissing_sections = \"lazy\"\n", Path::new("/p"))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            source_dir: Some(PathBuf::from("/custom/content")),
            drafts: Some(true),
            future: Some(true),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.content_resolved.dirs,
            vec![PathBuf::from("/custom/content")]
        );
        assert!(config.build.drafts);
        assert!(config.build.future);
        assert_eq!(config.build.workers, 0); // Unchanged
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let err = Config::load(Some(Path::new("/nonexistent/weft.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "title = \"Docs\"\n[content]\ndirs = [\"pages\"]\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.title, "Docs");
        assert_eq!(config.content_resolved.dirs, vec![temp.path().join("pages")]);
        assert_eq!(config.config_path, Some(path));
    }
}
