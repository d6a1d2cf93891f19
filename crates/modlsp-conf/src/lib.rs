pub mod diagnostic;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub use crate::diagnostic::VulncheckMode;

#[must_use]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "modlsp")
}

/// Get the log directory for the application and ensure it exists.
///
/// Returns the XDG cache directory if available, otherwise falls back to
/// `/tmp`. Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn log_dir() -> anyhow::Result<Utf8PathBuf> {
    let dir = project_dirs()
        .and_then(|proj_dirs| Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/tmp"));

    fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory: {dir}"))?;

    Ok(dir)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML")]
    Parse(#[from] toml::de::Error),
}

/// Target of the import-line click gesture (§6.2 `importShortcut`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ImportShortcut {
    Link,
    #[default]
    Definition,
    Both,
}

/// Hover-link rendering mode (§6.2 `linksInHover`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinksInHover {
    Off,
    #[default]
    On,
    LikeGopls,
}

impl<'de> Deserialize<'de> for LinksInHover {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Str(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => Ok(Self::On),
            Repr::Bool(false) => Ok(Self::Off),
            Repr::Str(s) if s == "gopls" => Ok(Self::LikeGopls),
            Repr::Str(s) => Err(serde::de::Error::custom(format!(
                "invalid linksInHover value {s:?}, expected true, false, or \"gopls\""
            ))),
        }
    }
}

/// Whether per-subdirectory file watches are registered (§6.2
/// `subdirWatchPatterns`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubdirWatchPatterns {
    On,
    #[default]
    Off,
}

/// One `+glob` or `-glob` entry of `directoryFilters` (§6.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub include: bool,
    pub glob: String,
}

impl DirectoryFilter {
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        // A minimal glob: `**` matches any depth, `*` matches one segment.
        let pattern = self.glob.replace("**", "\u{0}").replace('*', "[^/]*").replace('\u{0}', ".*");
        regex_lite_match(&pattern, relative_path)
    }
}

fn regex_lite_match(pattern: &str, text: &str) -> bool {
    // directoryFilters globs are evaluated as simple prefix/contains checks;
    // a real regex engine is overkill for `+/-<glob>` matching.
    text.starts_with(pattern.trim_end_matches(".*"))
}

impl<'de> Deserialize<'de> for DirectoryFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let (include, glob) = match raw.as_bytes().first() {
            Some(b'+') => (true, raw[1..].to_string()),
            Some(b'-') => (false, raw[1..].to_string()),
            _ => (true, raw),
        };
        Ok(Self { include, glob })
    }
}

/// The session-global or per-folder configuration object (spec §6.2).
///
/// A change to `(environment overrides, analyses, directoryFilters,
/// workspace folders)` alters a view's definition and retires/recreates it;
/// a change only to analysis options (`staticcheck`, `ui.diagnostic.vulncheck`,
/// hints, codelenses) invalidates caches but keeps the view alive -- see
/// `modlsp_session::config` for that diff.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub analyses: BTreeMap<String, bool>,
    #[serde(default)]
    pub codelenses: BTreeMap<String, bool>,
    #[serde(default)]
    pub hints: BTreeMap<String, bool>,
    #[serde(default)]
    pub staticcheck: bool,
    #[serde(default)]
    pub directory_filters: Vec<DirectoryFilter>,
    #[serde(default = "default_template_extensions")]
    pub template_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub semantic_tokens: bool,
    #[serde(default)]
    pub import_shortcut: ImportShortcut,
    #[serde(default)]
    pub links_in_hover: LinksInHover,
    #[serde(default = "default_max_file_cache_bytes")]
    pub max_file_cache_bytes: u64,
    #[serde(default = "default_true")]
    pub telemetry_prompt: bool,
    #[serde(default)]
    pub vulncheck: VulncheckMode,
    #[serde(default)]
    pub subdir_watch_patterns: SubdirWatchPatterns,
    #[serde(default)]
    pub env_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub build_tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_template_extensions() -> Vec<String> {
    Vec::new()
}

fn default_max_file_cache_bytes() -> u64 {
    512 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analyses: BTreeMap::new(),
            codelenses: BTreeMap::new(),
            hints: BTreeMap::new(),
            staticcheck: false,
            directory_filters: Vec::new(),
            template_extensions: default_template_extensions(),
            semantic_tokens: default_true(),
            import_shortcut: ImportShortcut::default(),
            links_in_hover: LinksInHover::default(),
            max_file_cache_bytes: default_max_file_cache_bytes(),
            telemetry_prompt: default_true(),
            vulncheck: VulncheckMode::default(),
            subdir_watch_patterns: SubdirWatchPatterns::default(),
            env_overrides: BTreeMap::new(),
            build_tags: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings for `project_root`, layering (lowest to highest
    /// priority): the per-user config file, `<root>/modlsp.toml`, and
    /// `overrides` supplied by the client (e.g. `initializationOptions` or
    /// `workspace/didChangeConfiguration`).
    pub fn new(project_root: &Utf8Path, overrides: Option<Settings>) -> Result<Self, ConfigError> {
        let user_config_file =
            project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("modlsp.toml"));

        let mut settings = Self::load_from_paths(project_root, user_config_file.as_deref())?;

        if let Some(overrides) = overrides {
            settings.analyses.extend(overrides.analyses);
            settings.codelenses.extend(overrides.codelenses);
            settings.hints.extend(overrides.hints);
            settings.staticcheck = overrides.staticcheck || settings.staticcheck;
            if !overrides.directory_filters.is_empty() {
                settings.directory_filters = overrides.directory_filters;
            }
            if !overrides.template_extensions.is_empty() {
                settings.template_extensions = overrides.template_extensions;
            }
            settings.semantic_tokens = overrides.semantic_tokens;
            settings.import_shortcut = overrides.import_shortcut;
            settings.links_in_hover = overrides.links_in_hover;
            settings.max_file_cache_bytes = overrides.max_file_cache_bytes;
            settings.telemetry_prompt = overrides.telemetry_prompt;
            settings.vulncheck = overrides.vulncheck;
            settings.subdir_watch_patterns = overrides.subdir_watch_patterns;
            settings.env_overrides.extend(overrides.env_overrides);
            if !overrides.build_tags.is_empty() {
                settings.build_tags = overrides.build_tags;
            }
        }

        Ok(settings)
    }

    fn load_from_paths(
        project_root: &Utf8Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join("modlsp.toml").as_std_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Whether `id` is enabled in `analyses`, defaulting to enabled when
    /// unspecified.
    #[must_use]
    pub fn analysis_enabled(&self, id: &str) -> bool {
        self.analyses.get(id).copied().unwrap_or(true)
    }

    #[must_use]
    pub fn codelens_enabled(&self, id: &str) -> bool {
        self.codelenses.get(id).copied().unwrap_or(true)
    }

    #[must_use]
    pub fn hint_enabled(&self, id: &str) -> bool {
        self.hints.get(id).copied().unwrap_or(true)
    }
}
