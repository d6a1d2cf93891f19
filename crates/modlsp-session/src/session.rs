//! Top-level session state (spec §4.5): ties together the view registry,
//! the configuration, the persistent file cache, the telemetry store, and
//! the command registry behind one handle the server wires LSP callbacks
//! into.

use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use modlsp_collab::TelemetryStore;
use modlsp_fs::paths;
use modlsp_fs::Buffers;
use modlsp_fs::LanguageId;
use modlsp_fs::OsFileSystem;
use modlsp_fs::TextDocument;
use modlsp_fs::WorkspaceFileSystem;
use modlsp_pipeline::Analyzer;
use modlsp_source::PositionEncoding;
use tower_lsp_server::ls_types as lsp_types;
use url::Url;

use crate::cache::default_cache_root;
use crate::cache::FileCache;
use crate::commands::CommandRegistry;
use crate::config::classify;
use crate::config::ConfigChangeKind;
use crate::registry::ViewRegistry;
use crate::telemetry::FileTelemetryStore;

const MODULE_MARKER: &str = "module.toml";
const MULTI_MODULE_MARKER: &str = "workspace.toml";

/// Everything the LSP server layer needs once `initialize` has negotiated
/// capabilities and settled on a set of workspace folders.
pub struct Session {
    pub views: ViewRegistry,
    pub fs: Arc<WorkspaceFileSystem>,
    pub buffers: Buffers,
    pub settings: Mutex<modlsp_conf::Settings>,
    pub commands: CommandRegistry,
    pub file_cache: FileCache,
    pub telemetry: Arc<dyn TelemetryStore>,
    pub position_encoding: Mutex<PositionEncoding>,
    /// Analyzers installed by the binary at startup (spec §6.4 -- specific
    /// analyzer implementations are an external collaborator, not part of
    /// this core). Empty until something calls `install_analyzer`.
    analyzers: Mutex<Vec<Arc<dyn Analyzer>>>,
    folders: Mutex<Vec<Utf8PathBuf>>,
}

impl Session {
    #[must_use]
    pub fn new(project_root: &camino::Utf8Path) -> Self {
        let buffers = Buffers::new();
        let fs = Arc::new(WorkspaceFileSystem::new(buffers.clone(), Arc::new(OsFileSystem)));
        let settings = modlsp_conf::Settings::new(project_root, None).unwrap_or_default();

        Self {
            views: ViewRegistry::new(Arc::clone(&fs), MODULE_MARKER, MULTI_MODULE_MARKER),
            fs,
            buffers,
            settings: Mutex::new(settings),
            commands: CommandRegistry::new(),
            file_cache: FileCache::open(default_cache_root(), default_max_file_cache_bytes()),
            telemetry: Arc::new(FileTelemetryStore::open(default_telemetry_root())),
            position_encoding: Mutex::new(PositionEncoding::Utf16),
            analyzers: Mutex::new(Vec::new()),
            folders: Mutex::new(Vec::new()),
        }
    }

    pub fn install_analyzer(&self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.lock().unwrap().push(analyzer);
    }

    #[must_use]
    pub fn analyzers(&self) -> Vec<Arc<dyn Analyzer>> {
        self.analyzers.lock().unwrap().clone()
    }

    /// Initializes the view set from `params`' workspace folders, and
    /// negotiates position encoding (spec §6.1).
    pub fn initialize(&self, params: &lsp_types::InitializeParams) {
        *self.position_encoding.lock().unwrap() = modlsp_fs::negotiate_position_encoding(params);

        let folders = workspace_folder_paths(params);
        *self.folders.lock().unwrap() = folders.clone();

        let settings = self.settings.lock().unwrap().clone();
        self.views.reconcile_folders(&folders, &settings);
    }

    /// Applies a `workspace/didChangeWorkspaceFolders` notification: folder
    /// add/remove always alters a view's definition, so this always
    /// re-plans (spec §4.5.3).
    pub fn did_change_workspace_folders(&self, params: lsp_types::DidChangeWorkspaceFoldersParams) {
        let mut folders = self.folders.lock().unwrap();
        for removed in &params.event.removed {
            if let Some(path) = Url::parse(removed.uri.as_str()).ok().and_then(|url| paths::url_to_path(&url)) {
                folders.retain(|existing| existing != &path);
            }
        }
        for added in &params.event.added {
            if let Some(path) = Url::parse(added.uri.as_str()).ok().and_then(|url| paths::url_to_path(&url)) {
                if !folders.contains(&path) {
                    folders.push(path);
                }
            }
        }

        let settings = self.settings.lock().unwrap().clone();
        self.views.reconcile_folders(&folders, &settings);
    }

    /// Applies a `workspace/didChangeConfiguration` notification: classifies
    /// the change and either retires affected views or leaves them alone
    /// (spec §4.5.3).
    pub fn apply_configuration(&self, new_settings: modlsp_conf::Settings) -> ConfigChangeKind {
        let mut settings = self.settings.lock().unwrap();
        let kind = classify(&settings, &new_settings);
        *settings = new_settings;

        if kind == ConfigChangeKind::DefinitionAltering {
            let folders = self.folders.lock().unwrap().clone();
            self.views.reconcile_folders(&folders, &settings);
        }

        kind
    }

    pub fn did_open(&self, params: lsp_types::DidOpenTextDocumentParams) {
        let Some(url) = Url::parse(params.text_document.uri.as_str()).ok() else {
            return;
        };
        let language_id = LanguageId::from(params.text_document.language_id.as_str());
        let document = TextDocument::new(params.text_document.text, params.text_document.version, language_id);
        self.buffers.open(url.clone(), document);
        self.bump_covering_view(&url);
    }

    pub fn did_change(&self, params: lsp_types::DidChangeTextDocumentParams) {
        let Some(url) = Url::parse(params.text_document.uri.as_str()).ok() else {
            return;
        };
        let Some(existing) = self.buffers.get(&url) else {
            return;
        };

        let new_content = apply_content_changes(&existing, params.content_changes);
        let document = TextDocument::new(new_content, params.text_document.version, existing.language_id());
        self.buffers.update(url.clone(), document);
        self.bump_covering_view(&url);
    }

    pub fn did_close(&self, params: lsp_types::DidCloseTextDocumentParams) {
        if let Some(url) = Url::parse(params.text_document.uri.as_str()).ok() {
            self.buffers.close(&url);
            // The overlay is gone; queries must re-read from disk.
            self.bump_covering_view(&url);
        }
    }

    /// Finds (creating if necessary) the view that owns `uri`, per spec
    /// §4.5.1's request-routing step.
    pub fn view_for_uri(&self, uri: &lsp_types::Uri) -> Option<Arc<crate::registry::LiveView>> {
        let url = Url::parse(uri.as_str()).ok()?;
        let path = paths::url_to_path(&url)?;
        let settings = self.settings.lock().unwrap().clone();
        Some(self.views.view_for_file(&path, true, &settings))
    }

    /// Bumps `url`'s salsa revision in the view that owns it, so the
    /// overlay edit `did_open`/`did_change` just applied is visible to that
    /// view's derived queries on the next acquired snapshot.
    fn bump_covering_view(&self, url: &Url) {
        let Some(path) = paths::url_to_path(url) else {
            return;
        };
        let settings = self.settings.lock().unwrap().clone();
        let view = self.views.view_for_file(&path, true, &settings);
        view.bump_file(&path);
    }
}

fn apply_content_changes(
    document: &TextDocument,
    changes: Vec<lsp_types::TextDocumentContentChangeEvent>,
) -> String {
    if changes.len() == 1 && changes[0].range.is_none() {
        return changes[0].text.clone();
    }

    let mut content = document.content().to_string();
    let mut line_index = modlsp_fs::LineIndex::new(&content);

    for change in changes {
        match change.range {
            Some(range) => {
                let Some(start) = line_index.offset(range.start) else {
                    continue;
                };
                let Some(end) = line_index.offset(range.end) else {
                    continue;
                };
                content.replace_range(start as usize..end as usize, &change.text);
                line_index = modlsp_fs::LineIndex::new(&content);
            }
            None => {
                content = change.text;
                line_index = modlsp_fs::LineIndex::new(&content);
            }
        }
    }

    content
}

fn workspace_folder_paths(params: &lsp_types::InitializeParams) -> Vec<Utf8PathBuf> {
    let mut folders = Vec::new();

    if let Some(workspace_folders) = &params.workspace_folders {
        for folder in workspace_folders {
            if let Some(path) = Url::parse(folder.uri.as_str()).ok().and_then(|url| paths::url_to_path(&url)) {
                folders.push(path);
            }
        }
    }

    if folders.is_empty() {
        if let Some(root_uri) = &params.root_uri {
            if let Some(path) = Url::parse(root_uri.as_str()).ok().and_then(|url| paths::url_to_path(&url)) {
                folders.push(path);
            }
        }
    }

    folders
}

fn default_max_file_cache_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_telemetry_root() -> Utf8PathBuf {
    modlsp_conf::project_dirs()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join("telemetry")).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/tmp/modlsp-telemetry"))
}
