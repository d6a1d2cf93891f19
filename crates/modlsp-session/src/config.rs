//! Classifies a configuration change so the dispatcher knows whether it must
//! retire and recreate affected views or can keep them and just invalidate
//! caches (spec §4.5.3).

use modlsp_conf::Settings;

/// What a settings change requires of the view set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChangeKind {
    /// Nothing observable changed.
    Unchanged,
    /// Only analysis-option fields changed (`staticcheck`, `vulncheck`,
    /// `analyses`, `codelenses`, `hints`, `semanticTokens`, `linksInHover`,
    /// `importShortcut`): affected views stay alive, but their cached
    /// analysis results are stale.
    CacheInvalidatingOnly,
    /// A field that feeds a view's definition changed (`env_overrides`,
    /// `build_tags`, `directoryFilters`, `templateExtensions`): affected
    /// views must be retired and rediscovered.
    DefinitionAltering,
}

/// Compares `old` against `new` and classifies the change.
///
/// `directoryFilters` and `templateExtensions` are definition-altering even
/// though they don't feed `ViewDefinition::definition_hash` directly,
/// because they change which files a view's metadata graph may reference --
/// treating them as cache-only would leave stale packages pinned.
#[must_use]
pub fn classify(old: &Settings, new: &Settings) -> ConfigChangeKind {
    if old == new {
        return ConfigChangeKind::Unchanged;
    }

    let definition_altering = old.env_overrides != new.env_overrides
        || old.build_tags != new.build_tags
        || old.directory_filters != new.directory_filters
        || old.template_extensions != new.template_extensions
        || old.subdir_watch_patterns != new.subdir_watch_patterns;

    if definition_altering {
        ConfigChangeKind::DefinitionAltering
    } else {
        ConfigChangeKind::CacheInvalidatingOnly
    }
}
