use serde::Deserialize;

/// Severity/mode of the vulnerability-check diagnostics (§6.2
/// `ui.diagnostic.vulncheck`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum VulncheckMode {
    #[default]
    Off,
    Imports,
}
