//! The build-info collaborator (spec §6.4): the external process that turns
//! a view's environment and a set of package patterns into package records
//! the Package Pipeline merges into its metadata graph (spec §4.4.2).

use camino::Utf8PathBuf;
use modlsp_views::ResolvedEnv;

/// One package as reported by the build-info collaborator.
///
/// Intentionally flat path/string data, not yet interned -- interning into
/// `modlsp_snapshot::PackageId` and resolving paths to `modlsp_source::File`
/// is the Package Pipeline's job once a record crosses this boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRecord {
    pub id: String,
    pub path: Utf8PathBuf,
    pub module_path: String,
    pub compiled_sources: Vec<Utf8PathBuf>,
    /// Sources belonging to the package but excluded from compilation for
    /// the requested build configuration (build-tag-gated files, fixtures).
    pub non_compiled_sources: Vec<Utf8PathBuf>,
    /// import-path -> package id the collaborator resolved it to.
    pub imports: Vec<(String, String)>,
    pub is_test: bool,
    pub test_of: Option<String>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildInfoError {
    #[error("build-info collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("build-info collaborator exited with an error: {0}")]
    Failed(String),
}

/// Honors the view's environment and overlays; returns one record per
/// package matched by `package_patterns`, restricted to `file_uris` when
/// non-empty.
pub trait BuildInfoCollaborator: Send + Sync {
    async fn load(
        &self,
        env: &ResolvedEnv,
        package_patterns: &[String],
        file_uris: &[String],
    ) -> Result<Vec<PackageRecord>, BuildInfoError>;
}
