//! The `tower-lsp-server` [`LanguageServer`] implementation: thin adapters
//! from LSP wire types onto [`Session`], plus the diagnose-and-publish
//! pipeline spec §4.5.2 hangs off every state-changing notification.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use tower_lsp_server::jsonrpc::Error as RpcError;
use tower_lsp_server::jsonrpc::Result as RpcResult;
use tower_lsp_server::ls_types::*;
use tower_lsp_server::Client;
use tower_lsp_server::LanguageServer;

use crate::diagnostics;
use crate::session::Session;
use modlsp_views::ViewId;

/// Wraps the `Client` handle `tower-lsp-server` hands `initialize` around a
/// [`Session`], and remembers the last diagnostics published per view so a
/// file that goes quiet gets its diagnostics cleared rather than left stale.
pub struct Backend {
    client: Client,
    session: Arc<Session>,
    last_published: Mutex<HashMap<ViewId, BTreeMap<Utf8PathBuf, Vec<Diagnostic>>>>,
}

impl Backend {
    #[must_use]
    pub fn new(client: Client, session: Arc<Session>) -> Self {
        Self {
            client,
            session,
            last_published: Mutex::new(HashMap::new()),
        }
    }

    /// Runs the owning view's diagnose task for `uri` and publishes the
    /// result, clearing any file that went quiet since the last publication
    /// (spec §4.5.2). A superseded task (see [`crate::queue::Queue`]) simply
    /// publishes nothing -- the notification that superseded it will.
    async fn diagnose_and_publish(&self, uri: &Uri) {
        let Some(view) = self.session.view_for_uri(uri) else {
            return;
        };
        self.diagnose_and_publish_view(&view).await;
    }

    async fn diagnose_and_publish_view(&self, view: &Arc<crate::registry::LiveView>) {
        let cancel = view.queue.begin_diagnose();
        let snapshot = view.acquire();
        let analyzers = self.session.analyzers();

        let Some(result) =
            diagnostics::diagnose_view(&snapshot, &view.pipeline_caches, &analyzers, &cancel)
        else {
            return;
        };

        let previous = {
            let mut published = self.last_published.lock().unwrap();
            published.insert(view.view.id, result.by_file.clone()).unwrap_or_default()
        };

        for file in diagnostics::diff_published(&previous, &result.by_file) {
            self.publish_for_path(&file, Vec::new()).await;
        }
        for (file, file_diagnostics) in &result.by_file {
            self.publish_for_path(file, file_diagnostics.clone()).await;
        }
    }

    async fn publish_for_path(&self, path: &Utf8PathBuf, diagnostics: Vec<Diagnostic>) {
        let Some(url) = modlsp_fs::paths::path_to_url(path) else {
            return;
        };
        let Ok(uri) = Uri::from_str(url.as_str()) else {
            return;
        };
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    /// Re-runs diagnose for every live view, used after a configuration
    /// change that invalidates analysis results workspace-wide.
    async fn diagnose_all_views(&self) {
        for view in self.session.views.views() {
            self.diagnose_and_publish_view(&view).await;
        }
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        self.session.initialize(&params);

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "modlsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                position_encoding: Some(modlsp_fs::position_encoding_to_lsp(
                    *self.session.position_encoding.lock().unwrap(),
                )),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: crate::commands::KNOWN_COMMANDS
                        .iter()
                        .map(|(id, _)| (*id).to_string())
                        .collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "modlsp initialized")
            .await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let Some(view) = self.session.view_for_uri(&uri) else {
            return;
        };
        view.queue
            .run_serialized(move || async move { self.session.did_open(params) })
            .await;
        self.diagnose_and_publish(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let Some(view) = self.session.view_for_uri(&uri) else {
            return;
        };
        view.queue
            .run_serialized(move || async move { self.session.did_change(params) })
            .await;
        self.diagnose_and_publish(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let Some(view) = self.session.view_for_uri(&uri) else {
            self.session.did_close(params);
            return;
        };
        view.queue
            .run_serialized(move || async move { self.session.did_close(params) })
            .await;
        self.diagnose_and_publish(&uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let new_settings: modlsp_conf::Settings =
            serde_json::from_value(params.settings).unwrap_or_default();
        let kind = self.session.apply_configuration(new_settings);

        if kind != crate::config::ConfigChangeKind::Unchanged {
            self.diagnose_all_views().await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        // Disk-backed files are re-read on demand through the VFS overlay
        // fall-through (modlsp-fs::WorkspaceFileSystem); a watched change
        // to a file with no open buffer needs the owning view's revision
        // bumped so the next snapshot re-reads it.
        for change in params.changes {
            let Some(url) = url::Url::parse(change.uri.as_str()).ok() else {
                continue;
            };
            let Some(path) = modlsp_fs::paths::url_to_path(&url) else {
                continue;
            };
            let settings = self.session.settings.lock().unwrap().clone();
            let view = self.session.views.view_for_file(&path, true, &settings);
            view.bump_file(&path);
        }
        self.diagnose_all_views().await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        self.session.did_change_workspace_folders(params);
        self.diagnose_all_views().await;
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> RpcResult<Option<serde_json::Value>> {
        let args = params.arguments.into_iter().next().unwrap_or(serde_json::Value::Null);
        match self.session.commands.execute(&params.command, args).await {
            Ok(value) => Ok(Some(value)),
            Err(crate::commands::CommandError::NotFound(_)) => Err(RpcError::method_not_found()),
            Err(err) => {
                tracing::warn!(%err, command = %params.command, "command execution failed");
                Err(RpcError::internal_error())
            }
        }
    }
}
