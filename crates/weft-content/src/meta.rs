//! Front matter parsing.
//!
//! Headers and content files may start with YAML (`---`) or TOML (`+++`)
//! front matter. Keys are case-insensitive. Known keys populate
//! [`PageMeta`]; everything else ends up in [`PageMeta::params`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Free-form page parameters.
pub type Params = serde_json::Map<String, Value>;

/// Front matter parsing error.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    /// Opening delimiter without a closing one.
    #[error("unterminated front matter, expected closing '{0}'")]
    Unterminated(&'static str),
    /// YAML syntax error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// TOML syntax error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Front matter is valid but not a key/value map.
    #[error("front matter must be a map")]
    NotAMap,
    /// A known key has a value of the wrong type.
    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        /// Front matter key.
        field: &'static str,
        /// What was expected.
        message: String,
    },
}

/// The four content dates of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dates {
    pub date: Option<DateTime<FixedOffset>>,
    pub lastmod: Option<DateTime<FixedOffset>>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub expiry_date: Option<DateTime<FixedOffset>>,
}

impl Dates {
    /// True if no date is set.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.date.is_none()
            && self.lastmod.is_none()
            && self.publish_date.is_none()
            && self.expiry_date.is_none()
    }

    /// Move `date` and `lastmod` forward to the other's values if later.
    pub fn update_date_and_lastmod_if_after(&mut self, other: &Dates) {
        if other.date > self.date {
            self.date = other.date;
        }
        if other.lastmod > self.lastmod {
            self.lastmod = other.lastmod;
        }
    }
}

/// When a page is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Always,
    Never,
    /// Not rendered, but its permalink may be used.
    Link,
}

/// Where a page appears in listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListMode {
    #[default]
    Always,
    Never,
    /// Only in its own section's listings.
    Local,
}

/// Per-page build options (`build` or `_build` in front matter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub render: RenderMode,
    pub list: ListMode,
}

/// Metadata read from front matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub link_title: Option<String>,
    pub weight: i32,
    pub draft: bool,
    pub dates: Dates,
    pub params: Params,
    pub cascade: Params,
    pub build: BuildOptions,
}

/// Parsed header file: metadata plus the remaining raw content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub meta: PageMeta,
    pub content: String,
}

impl FrontMatter {
    /// Split and parse front matter from file content.
    ///
    /// # Errors
    ///
    /// Returns [`FrontMatterError`] on syntax errors or badly typed known keys.
    pub fn parse(input: &str) -> Result<Self, FrontMatterError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let Some((format, raw, content)) = split(input)? else {
            return Ok(Self {
                meta: PageMeta::default(),
                content: input.to_owned(),
            });
        };

        let value = match format {
            Format::Yaml => {
                if raw.trim().is_empty() {
                    Value::Null
                } else {
                    serde_yaml::from_str::<Value>(raw)?
                }
            }
            Format::Toml => toml_to_json(toml::Value::Table(toml::from_str::<toml::Table>(raw)?)),
        };
        let map = match value {
            Value::Null => Params::new(),
            Value::Object(map) => map,
            _ => return Err(FrontMatterError::NotAMap),
        };

        Ok(Self {
            meta: PageMeta::from_map(map)?,
            content: content.to_owned(),
        })
    }
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Toml,
}

/// Split input into format, front matter and remaining content.
fn split(input: &str) -> Result<Option<(Format, &str, &str)>, FrontMatterError> {
    let (format, delim) = if input.starts_with("---") {
        (Format::Yaml, "---")
    } else if input.starts_with("+++") {
        (Format::Toml, "+++")
    } else {
        return Ok(None);
    };

    let Some(first_nl) = input.find('\n') else {
        return Err(FrontMatterError::Unterminated(delim));
    };
    if input[..first_nl].trim_end() != delim {
        return Ok(None);
    }

    let body = &input[first_nl + 1..];
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim_end() == delim {
            let raw = &body[..offset];
            let content = &body[offset + line.len()..];
            return Ok(Some((format, raw, content)));
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated(delim))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

impl PageMeta {
    /// Build metadata from a front matter map.
    ///
    /// # Errors
    ///
    /// Returns [`FrontMatterError::InvalidField`] for badly typed known keys.
    pub fn from_map(map: Params) -> Result<Self, FrontMatterError> {
        let mut meta = Self::default();
        let mut date = None;
        let mut lastmod = None;
        let mut publish_date = None;

        for (key, value) in map {
            let lower = key.to_lowercase();
            match lower.as_str() {
                "title" => meta.title = Some(string_field("title", &value)?),
                "linktitle" => meta.link_title = Some(string_field("linkTitle", &value)?),
                "weight" => meta.weight = weight_field(&value)?,
                "draft" => meta.draft = bool_field("draft", &value)?,
                "date" => date = Some(date_field("date", &value)?),
                "lastmod" | "modified" => lastmod = Some(date_field("lastmod", &value)?),
                "publishdate" | "pubdate" | "published" => {
                    publish_date = Some(date_field("publishDate", &value)?);
                }
                "expirydate" | "unpublishdate" => {
                    meta.dates.expiry_date = Some(date_field("expiryDate", &value)?);
                }
                "cascade" => match value {
                    Value::Object(cascade) => meta.cascade = lowercase_keys(cascade),
                    _ => {
                        return Err(FrontMatterError::InvalidField {
                            field: "cascade",
                            message: "expected a map".to_owned(),
                        });
                    }
                },
                "build" | "_build" => meta.build = build_field(&value)?,
                _ => {
                    meta.params.insert(lower, value);
                }
            }
        }

        meta.dates.date = date.or(publish_date).or(lastmod);
        meta.dates.lastmod = lastmod.or(date).or(publish_date);
        meta.dates.publish_date = publish_date.or(date);
        Ok(meta)
    }
}

fn lowercase_keys(map: Params) -> Params {
    map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect()
}

fn string_field(field: &'static str, value: &Value) -> Result<String, FrontMatterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FrontMatterError::InvalidField {
            field,
            message: "expected a string".to_owned(),
        }),
    }
}

fn bool_field(field: &'static str, value: &Value) -> Result<bool, FrontMatterError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(FrontMatterError::InvalidField {
            field,
            message: "expected a boolean".to_owned(),
        }),
    }
}

fn weight_field(value: &Value) -> Result<i32, FrontMatterError> {
    let invalid = || FrontMatterError::InvalidField {
        field: "weight",
        message: "expected an integer".to_owned(),
    };
    let n = match value {
        Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    i32::try_from(n).map_err(|_| invalid())
}

fn build_field(value: &Value) -> Result<BuildOptions, FrontMatterError> {
    let Value::Object(map) = value else {
        return Err(FrontMatterError::InvalidField {
            field: "build",
            message: "expected a map".to_owned(),
        });
    };
    let mut options = BuildOptions::default();
    for (key, value) in map {
        match (key.to_lowercase().as_str(), value) {
            ("render", Value::Bool(true)) => options.render = RenderMode::Always,
            ("render", Value::Bool(false)) => options.render = RenderMode::Never,
            ("render", Value::String(s)) => {
                options.render = match s.to_lowercase().as_str() {
                    "always" => RenderMode::Always,
                    "never" => RenderMode::Never,
                    "link" => RenderMode::Link,
                    other => return Err(invalid_build("render", other)),
                };
            }
            ("list", Value::Bool(true)) => options.list = ListMode::Always,
            ("list", Value::Bool(false)) => options.list = ListMode::Never,
            ("list", Value::String(s)) => {
                options.list = match s.to_lowercase().as_str() {
                    "always" => ListMode::Always,
                    "never" => ListMode::Never,
                    "local" => ListMode::Local,
                    other => return Err(invalid_build("list", other)),
                };
            }
            _ => {}
        }
    }
    Ok(options)
}

fn invalid_build(option: &str, value: &str) -> FrontMatterError {
    FrontMatterError::InvalidField {
        field: "build",
        message: format!("unknown {option} option '{value}'"),
    }
}

fn date_field(
    field: &'static str,
    value: &Value,
) -> Result<DateTime<FixedOffset>, FrontMatterError> {
    let Value::String(s) = value else {
        return Err(FrontMatterError::InvalidField {
            field,
            message: "expected a date string".to_owned(),
        });
    };
    parse_date(s).ok_or_else(|| FrontMatterError::InvalidField {
        field,
        message: format!("unrecognized date '{s}'"),
    })
}

/// Parse the date formats accepted in front matter.
///
/// RFC 3339 keeps its offset; local date-times and plain dates are UTC.
#[must_use]
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return utc.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).fixed_offset())
}
