//! The Package Pipeline's failure taxonomy (spec §4.4.5).

use camino::Utf8PathBuf;

#[derive(Clone, Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("build-info collaborator error for {view_root}: {source}")]
    Loader { view_root: Utf8PathBuf, source: String },

    #[error("promise computation panicked")]
    Panicked,

    #[error("promise was cancelled before a result was produced")]
    Cancelled,
}

/// A single loader/type-check/analyzer diagnostic, independent of the LSP
/// wire format -- `modlsp-session` renders these against a snapshot's source
/// text when publishing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineDiagnostic {
    pub file: Option<Utf8PathBuf>,
    pub span: Option<modlsp_source::Span>,
    pub message: String,
}

impl PipelineDiagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { file: None, span: None, message: message.into() }
    }

    #[must_use]
    pub fn at(file: Utf8PathBuf, span: modlsp_source::Span, message: impl Into<String>) -> Self {
        Self { file: Some(file), span: Some(span), message: message.into() }
    }
}
