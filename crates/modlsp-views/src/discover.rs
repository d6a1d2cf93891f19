//! Build-root discovery and view reconciliation (spec §4.2).
//!
//! Walks workspace folders looking for module build roots, turns each root
//! into a [`ViewDefinition`], and compares a freshly discovered plan against
//! the views already live so the caller (the Session Dispatcher) knows which
//! views to keep untouched, which to create, and which to retire.

use std::collections::BTreeSet;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;

use crate::view::ResolvedEnv;
use crate::view::View;
use crate::view::ViewDefinition;
use crate::view::ViewType;

const SKIP_DIR_NAMES: &[&str] = &[".git", "target", "node_modules", ".hg", ".svn"];

/// Walk `folders` for directories containing `module_marker` (a manifest
/// file name such as `module.toml`), treating each as a build root.
///
/// Descent stops at the first marker found along a path -- a module root's
/// own subdirectories are considered part of that module, not separate
/// roots.
#[must_use]
pub fn discover_build_roots(folders: &[Utf8PathBuf], module_marker: &str) -> Vec<Utf8PathBuf> {
    let mut roots = Vec::new();
    let mut visited = FxHashSet::default();
    for folder in folders {
        walk_for_markers(folder, module_marker, &mut visited, &mut roots);
    }
    roots.sort();
    roots
}

fn walk_for_markers(
    dir: &Utf8Path,
    module_marker: &str,
    visited: &mut FxHashSet<Utf8PathBuf>,
    roots: &mut Vec<Utf8PathBuf>,
) {
    let key = std::fs::canonicalize(dir.as_std_path())
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| dir.to_owned());
    if !visited.insert(key) {
        return;
    }

    if dir.join(module_marker).is_file() {
        roots.push(dir.to_owned());
        return;
    }

    let Ok(entries) = std::fs::read_dir(dir.as_std_path()) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || SKIP_DIR_NAMES.contains(&name_str.as_ref()) {
            continue;
        }
        walk_for_markers(&path, module_marker, visited, roots);
    }
}

/// Turn discovered build roots into view definitions, all resolved against
/// the host toolchain's environment.
///
/// `multi_module_marker`, when present directly under a root, marks that
/// root as describing several modules at once rather than just one.
#[must_use]
pub fn plan_views(
    folders: &[Utf8PathBuf],
    module_marker: &str,
    multi_module_marker: &str,
) -> Vec<ViewDefinition> {
    discover_build_roots(folders, module_marker)
        .into_iter()
        .map(|root| {
            let view_type = if root.join(multi_module_marker).is_file() {
                ViewType::MultiModule
            } else {
                ViewType::SingleModule
            };
            ViewDefinition {
                folder: root.clone(),
                root,
                view_type,
                env: ResolvedEnv::host(),
            }
        })
        .collect()
}

/// Build the ad hoc or no-module fallback view definition for an open file
/// that no discovered build root covers.
///
/// Files that aren't part of any recognizable source tree at all (spec's
/// `NoModule` case, e.g. a scratch buffer with no extension matching the
/// language) are reported as `ViewType::NoModule`; everything else gets a
/// single-file `AdHoc` view rooted at the file's own directory.
#[must_use]
pub fn fallback_definition_for(file: &Utf8Path, is_source_file: bool) -> ViewDefinition {
    let folder = file.parent().map_or_else(|| file.to_owned(), Utf8Path::to_owned);
    ViewDefinition {
        root: folder.clone(),
        folder,
        view_type: if is_source_file {
            ViewType::AdHoc
        } else {
            ViewType::NoModule
        },
        env: ResolvedEnv::host(),
    }
}

/// The result of comparing a freshly discovered plan against the views
/// already live.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Existing views whose definition is unchanged; keep their identity and
    /// underlying database.
    pub kept: Vec<View>,
    /// Definitions with no matching existing view; the caller should create
    /// a fresh view (and a fresh `SnapshotDatabase`) for each.
    pub created: Vec<ViewDefinition>,
    /// Existing views with no matching planned definition; the caller should
    /// retire these (drop the database, release resources).
    pub retired: Vec<View>,
}

/// Compare `existing` views against a freshly discovered `planned` set by
/// definition hash (spec §4.2: "compare new plan to existing views by
/// definition hash; retire views no longer in the plan").
#[must_use]
pub fn reconcile(existing: &[View], planned: &[ViewDefinition]) -> Reconciliation {
    let planned_hashes: BTreeSet<u64> =
        planned.iter().map(ViewDefinition::definition_hash).collect();

    let mut kept = Vec::new();
    let mut retired = Vec::new();
    for view in existing {
        if planned_hashes.contains(&view.definition.definition_hash()) {
            kept.push(view.clone());
        } else {
            retired.push(view.clone());
        }
    }

    let kept_hashes: BTreeSet<u64> =
        kept.iter().map(|view| view.definition.definition_hash()).collect();
    let created = planned
        .iter()
        .filter(|def| !kept_hashes.contains(&def.definition_hash()))
        .cloned()
        .collect();

    Reconciliation {
        kept,
        created,
        retired,
    }
}

/// Find the already-live view covering `path`, if any.
#[must_use]
pub fn view_for_open_file<'a>(path: &Utf8Path, existing: &'a [View]) -> Option<&'a View> {
    existing.iter().find(|view| view.covers(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewId;

    fn utf8_tmpdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[test]
    fn discovers_single_module_root() {
        let (_tmp, root) = utf8_tmpdir();
        std::fs::write(root.join("module.toml"), "").unwrap();

        let roots = discover_build_roots(std::slice::from_ref(&root), "module.toml");
        assert_eq!(roots, vec![root]);
    }

    #[test]
    fn stops_descending_once_a_marker_is_found() {
        let (_tmp, root) = utf8_tmpdir();
        std::fs::write(root.join("module.toml"), "").unwrap();
        std::fs::create_dir_all(root.join("nested")).unwrap();
        std::fs::write(root.join("nested/module.toml"), "").unwrap();

        let roots = discover_build_roots(std::slice::from_ref(&root), "module.toml");
        assert_eq!(roots, vec![root]);
    }

    #[test]
    fn skips_hidden_and_vendor_directories() {
        let (_tmp, root) = utf8_tmpdir();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/module.toml"), "").unwrap();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::write(root.join("pkg/module.toml"), "").unwrap();

        let roots = discover_build_roots(std::slice::from_ref(&root), "module.toml");
        assert_eq!(roots, vec![root.join("pkg")]);
    }

    #[test]
    fn plan_views_marks_multi_module_roots() {
        let (_tmp, root) = utf8_tmpdir();
        std::fs::write(root.join("module.toml"), "").unwrap();
        std::fs::write(root.join("workspace.toml"), "").unwrap();

        let plans = plan_views(std::slice::from_ref(&root), "module.toml", "workspace.toml");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].view_type, ViewType::MultiModule);
    }

    #[test]
    fn reconcile_keeps_unchanged_views_and_retires_stale_ones() {
        let root = Utf8PathBuf::from("/proj");
        let def = ViewDefinition {
            root: root.clone(),
            folder: root.clone(),
            view_type: ViewType::SingleModule,
            env: ResolvedEnv::host(),
        };
        let view = View::new(ViewId::from_raw(1), def.clone());

        let result = reconcile(std::slice::from_ref(&view), std::slice::from_ref(&def));
        assert_eq!(result.kept.len(), 1);
        assert!(result.created.is_empty());
        assert!(result.retired.is_empty());

        let result = reconcile(std::slice::from_ref(&view), &[]);
        assert!(result.kept.is_empty());
        assert_eq!(result.retired.len(), 1);
    }

    #[test]
    fn reconcile_creates_views_for_new_definitions() {
        let root = Utf8PathBuf::from("/proj");
        let def = ViewDefinition {
            root: root.clone(),
            folder: root,
            view_type: ViewType::SingleModule,
            env: ResolvedEnv::host(),
        };

        let result = reconcile(&[], std::slice::from_ref(&def));
        assert_eq!(result.created.len(), 1);
        assert!(result.kept.is_empty());
    }

    #[test]
    fn fallback_distinguishes_source_from_non_source_files() {
        let src = fallback_definition_for(Utf8Path::new("/scratch/a.src"), true);
        assert_eq!(src.view_type, ViewType::AdHoc);

        let other = fallback_definition_for(Utf8Path::new("/scratch/notes.txt"), false);
        assert_eq!(other.view_type, ViewType::NoModule);
    }
}
