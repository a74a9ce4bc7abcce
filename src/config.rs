//! Plugin configuration: the sparse user surface and its resolved form.
//!
//! Configuration comes in two explicit shapes. [`Config`] is the partial
//! input: every field is independently omittable, and nested sections merge
//! field by field rather than replacing each other wholesale.
//! [`Config::resolve`] is the single total, pure function that fills every
//! gap and produces a [`ResolvedConfig`], immutable for the rest of the
//! plugin's lifetime.
//!
//! ## Defaults
//!
//! ```toml
//! directory = "/src/pages"
//! extensions = ["md"]
//!
//! [server]
//! cache = true
//! response_headers = {}
//!
//! [build]
//! # glob is derived from directory + extensions when omitted:
//! # "./src/pages/**/*.md"
//! out_dir = "unified"
//! out_format = "html"
//!
//! [transform]
//! # default_transformer is the identity transform (code-only field)
//! export_name = "transform"
//! ```
//!
//! ## Dependent defaults
//!
//! `build.glob` is special: when omitted it is derived from the *resolved*
//! `directory` and `extensions` at resolution time, and never re-derived
//! afterward. Supplying `directory` without `glob` therefore moves the
//! derived glob along with it; supplying both pins the glob exactly.
//!
//! ## Partial Configuration
//!
//! The data-bearing subset can also be loaded from a sparse TOML overlay
//! via [`Config::from_toml_str`]. Function-valued fields (the default
//! transformer, the out-format callback) are code-only and keep their
//! defaults when configured from a file. Unknown keys are rejected to
//! catch typos early.

use crate::transform::{self, Transform};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build-input selector: one glob pattern or an ordered list.
///
/// Patterns starting with `!` exclude matches of the other patterns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Glob {
    One(String),
    Many(Vec<String>),
}

impl Glob {
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Glob::One(pattern) => vec![pattern.as_str()],
            Glob::Many(patterns) => patterns.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Glob {
    fn from(pattern: &str) -> Self {
        Glob::One(pattern.to_string())
    }
}

/// Output extension for built files: a literal, or a function of the
/// input path.
#[derive(Clone)]
pub enum OutFormat {
    Ext(String),
    Fn(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl OutFormat {
    /// The extension to use for `input`. May come back with or without a
    /// leading dot; the path mapper prefixes one when missing.
    pub fn apply(&self, input: &str) -> String {
        match self {
            OutFormat::Ext(ext) => ext.clone(),
            OutFormat::Fn(f) => f(input),
        }
    }
}

impl fmt::Debug for OutFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutFormat::Ext(ext) => f.debug_tuple("Ext").field(ext).finish(),
            OutFormat::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

impl From<&str> for OutFormat {
    fn from(ext: &str) -> Self {
        OutFormat::Ext(ext.to_string())
    }
}

// Only the literal form is representable in a config file.
impl<'de> Deserialize<'de> for OutFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(OutFormat::Ext(String::deserialize(deserializer)?))
    }
}

/// Partial plugin configuration. Every field is independently omittable;
/// [`Config::resolve`] fills the rest.
#[derive(Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the content files (default `/src/pages`).
    pub directory: Option<String>,
    /// Extensions of the files to process (default `["md"]`). Order is
    /// preserved into the derived glob.
    pub extensions: Option<Vec<String>>,
    /// Dev-server settings.
    pub server: ServerConfig,
    /// Build settings.
    pub build: BuildConfig,
    /// Transform settings.
    pub transform: TransformConfig,
}

/// Dev-server settings.
#[derive(Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Cache computed responses on the dev server (default `true`).
    pub cache: Option<bool>,
    /// Extra headers attached to processed-file responses.
    pub response_headers: Option<BTreeMap<String, String>>,
}

/// Build settings.
#[derive(Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Pattern(s) selecting the build inputs. Derived from `directory` and
    /// `extensions` when omitted.
    pub glob: Option<Glob>,
    /// Directory within the host output where built files land
    /// (default `unified`).
    pub out_dir: Option<String>,
    /// Output extension for built files (default `html`).
    pub out_format: Option<OutFormat>,
}

/// Transform settings.
#[derive(Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Transform applied to files without an override (default: identity).
    #[serde(skip)]
    pub default_transformer: Option<Arc<dyn Transform>>,
    /// Export name required from override modules (default `transform`).
    pub export_name: Option<String>,
}

/// Fully-populated configuration, immutable after [`Config::resolve`].
#[derive(Clone)]
pub struct ResolvedConfig {
    /// Content directory, always with a leading `/`.
    pub directory: String,
    /// Non-empty ordered extension list.
    pub extensions: Vec<String>,
    pub server: ResolvedServer,
    pub build: ResolvedBuild,
    pub transform: ResolvedTransform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    pub cache: bool,
    pub response_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedBuild {
    pub glob: Glob,
    pub out_dir: String,
    pub out_format: OutFormat,
}

#[derive(Clone)]
pub struct ResolvedTransform {
    pub default_transformer: Arc<dyn Transform>,
    pub export_name: String,
}

impl Config {
    /// Parse a sparse TOML overlay. Unknown keys are rejected.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill every omitted field with its default. Total and pure: no I/O,
    /// never fails.
    ///
    /// `directory` is normalized to a leading `/` after defaults are
    /// applied, whether user-supplied or defaulted. `build.glob` is
    /// derived from the resolved `directory` and `extensions` only when
    /// the caller did not supply one.
    pub fn resolve(self) -> ResolvedConfig {
        let mut directory = self.directory.unwrap_or_else(|| "/src/pages".to_string());
        if !directory.starts_with('/') {
            directory = format!("/{directory}");
        }
        let extensions = self.extensions.unwrap_or_else(|| vec!["md".to_string()]);
        let glob = self
            .build
            .glob
            .unwrap_or_else(|| Glob::One(glob_from_prefix(&directory, &extensions)));

        ResolvedConfig {
            server: ResolvedServer {
                cache: self.server.cache.unwrap_or(true),
                response_headers: self.server.response_headers.unwrap_or_default(),
            },
            build: ResolvedBuild {
                glob,
                out_dir: self.build.out_dir.unwrap_or_else(|| "unified".to_string()),
                out_format: self
                    .build
                    .out_format
                    .unwrap_or_else(|| OutFormat::Ext("html".to_string())),
            },
            transform: ResolvedTransform {
                default_transformer: self
                    .transform
                    .default_transformer
                    .unwrap_or_else(transform::identity),
                export_name: self
                    .transform
                    .export_name
                    .unwrap_or_else(|| "transform".to_string()),
            },
            directory,
            extensions,
        }
    }
}

impl ResolvedConfig {
    /// Validate values a sparse overlay can get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "extensions must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Build a glob from a directory prefix and extension list.
///
/// The prefix is rewritten to a relative-dot form: a leading `/` becomes
/// `./`, a bare prefix gets `./` prepended, a trailing `/` is stripped.
/// A single extension is appended directly, several become a brace list
/// in their configured order.
pub fn glob_from_prefix(prefix: &str, extensions: &[String]) -> String {
    let mut re = prefix.to_string();
    if let Some(rest) = prefix.strip_prefix('/') {
        re = format!("./{rest}");
    } else if !re.starts_with('.') {
        re = format!("./{re}");
    }
    if re.ends_with('/') {
        re.pop();
    }
    let ext = if extensions.len() == 1 {
        extensions[0].clone()
    } else {
        format!("{{{}}}", extensions.join(","))
    };
    format!("{re}/**/*.{ext}")
}
