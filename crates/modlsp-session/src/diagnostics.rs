//! Diagnose-task scheduling (spec §4.5.2): after every state-changing
//! notification, walk a view's metadata graph, analyze every package, and
//! hand the caller back diagnostics grouped by file and stamped with the
//! snapshot's sequence so a superseded publication can be dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use modlsp_pipeline::Analyzer;
use modlsp_pipeline::PipelineCaches;
use modlsp_pipeline::SnapshotTypeCheck;
use modlsp_snapshot::Snapshot;
use modlsp_source::CancellationToken;
use tower_lsp_server::ls_types::Diagnostic as LspDiagnostic;
use tower_lsp_server::ls_types::DiagnosticSeverity;
use tower_lsp_server::ls_types::Position;
use tower_lsp_server::ls_types::Range;

/// One view's diagnose-task result: every file that has at least one
/// diagnostic, stamped with the snapshot sequence it was computed against.
pub struct DiagnosticsByFile {
    pub sequence: u64,
    pub by_file: BTreeMap<Utf8PathBuf, Vec<LspDiagnostic>>,
}

/// Computes diagnostics for every package reachable from `snapshot`'s
/// metadata graph, checking `cancel` between packages so a superseding
/// notification can stop this task before it finishes (spec §4.5.2).
///
/// Returns `None` if cancelled before completion; the caller must not
/// publish a partial result.
pub fn diagnose_view(
    snapshot: &Snapshot,
    caches: &PipelineCaches,
    analyzers: &[Arc<dyn Analyzer>],
    cancel: &CancellationToken,
) -> Option<DiagnosticsByFile> {
    let Some(graph) = snapshot.db().metadata_graph() else {
        return Some(DiagnosticsByFile { sequence: snapshot.sequence(), by_file: BTreeMap::new() });
    };

    let mut by_file: BTreeMap<Utf8PathBuf, Vec<LspDiagnostic>> = BTreeMap::new();

    for package_id in graph.packages(snapshot.db()).keys().copied() {
        if cancel.is_cancelled() {
            return None;
        }

        let result = snapshot.analyze(caches, analyzers, package_id);
        for diagnostic in result.diagnostics {
            let Some(file) = diagnostic.file.clone() else {
                continue;
            };
            let lsp_diagnostic = render_diagnostic(snapshot, &file, &diagnostic);
            by_file.entry(file).or_default().push(lsp_diagnostic);
        }
    }

    Some(DiagnosticsByFile { sequence: snapshot.sequence(), by_file })
}

fn render_diagnostic(
    snapshot: &Snapshot,
    file: &Utf8PathBuf,
    diagnostic: &modlsp_pipeline::PipelineDiagnostic,
) -> LspDiagnostic {
    let range = diagnostic
        .span
        .map(|span| {
            let line_index = snapshot.file(file).line_index(snapshot.db());
            let (start, end) = span.to_line_col(line_index);
            Range::new(
                Position::new(start.0.0, start.0.1),
                Position::new(end.0.0, end.0.1),
            )
        })
        .unwrap_or_else(|| Range::new(Position::new(0, 0), Position::new(0, 0)));

    LspDiagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some("modlsp".to_string()),
        message: diagnostic.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Drops every file from a view's previously published set that the new
/// result no longer mentions, so clearing a diagnostic doesn't require the
/// caller to track what was published last time -- publishes an empty list
/// for files that went quiet.
#[must_use]
pub fn diff_published(
    previous: &BTreeMap<Utf8PathBuf, Vec<LspDiagnostic>>,
    current: &BTreeMap<Utf8PathBuf, Vec<LspDiagnostic>>,
) -> Vec<Utf8PathBuf> {
    previous
        .keys()
        .filter(|file| !current.contains_key(*file))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_published_finds_files_that_went_quiet() {
        let mut previous = BTreeMap::new();
        previous.insert(Utf8PathBuf::from("a.src"), vec![]);
        previous.insert(Utf8PathBuf::from("b.src"), vec![]);
        let mut current = BTreeMap::new();
        current.insert(Utf8PathBuf::from("a.src"), vec![]);

        assert_eq!(diff_published(&previous, &current), vec![Utf8PathBuf::from("b.src")]);
    }

    #[test]
    fn diagnose_view_with_no_metadata_graph_returns_empty() {
        let db = modlsp_snapshot::SnapshotDatabase::for_tests(Arc::new(modlsp_source::InMemoryFileSystem::new()));
        let counter = modlsp_snapshot::SequenceCounter::default();
        let snapshot = Snapshot::initial(&db, &counter);
        let caches = PipelineCaches::new();
        let cancel = CancellationToken::new();

        let result = diagnose_view(&snapshot, &caches, &[], &cancel).unwrap();
        assert!(result.by_file.is_empty());
    }
}
