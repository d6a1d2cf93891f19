//! The closed extension-command registry (spec §4.5.5, §6.3): every command
//! is addressable by a stable dotted string id, is exactly one of
//! synchronous query / asynchronous job / edit-producing action, and an id
//! outside the closed set is a method-not-found error rather than a panic.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// What shape of response a command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Returns a JSON result directly.
    Query,
    /// Drives `$/progress` (`begin`, zero or more `report`, exactly one
    /// `end`) and then completes.
    Job,
    /// Produces a `WorkspaceEdit` the client is asked to apply.
    Edit,
}

/// The full, closed command surface (spec §6.3), in declared order.
pub const KNOWN_COMMANDS: &[(&str, CommandKind)] = &[
    ("tidy", CommandKind::Job),
    ("run_tests", CommandKind::Job),
    ("go_get_package", CommandKind::Job),
    ("vulncheck", CommandKind::Job),
    ("run_govulncheck", CommandKind::Job),
    ("fetch_vulncheck_result", CommandKind::Query),
    ("add_import", CommandKind::Edit),
    ("apply_fix", CommandKind::Edit),
    ("change_signature", CommandKind::Edit),
    ("extract_to_new_file", CommandKind::Edit),
    ("mem_stats", CommandKind::Query),
    ("workspace_stats", CommandKind::Query),
    ("start_debugging", CommandKind::Job),
    ("start_profile", CommandKind::Job),
    ("stop_profile", CommandKind::Job),
    ("packages", CommandKind::Query),
    ("modules", CommandKind::Query),
    ("package_symbols", CommandKind::Query),
    ("modify_tags", CommandKind::Edit),
    ("add_test", CommandKind::Edit),
    ("assembly", CommandKind::Query),
    ("free_symbols", CommandKind::Query),
    ("doc", CommandKind::Query),
    ("regenerate_cgo", CommandKind::Job),
    ("toggle_gc_details", CommandKind::Query),
    ("list_known_packages", CommandKind::Query),
    ("list_imports", CommandKind::Query),
    ("gc_details", CommandKind::Query),
    ("maybe_prompt_for_telemetry", CommandKind::Query),
    ("add_telemetry_counters", CommandKind::Query),
    ("diagnose_files", CommandKind::Job),
    ("views", CommandKind::Query),
    ("scan_imports", CommandKind::Job),
    ("run_go_work_command", CommandKind::Job),
    ("client_open_url", CommandKind::Query),
];

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    NotFound(String),
    #[error("command {0:?} was cancelled")]
    Cancelled(String),
    #[error("command {id:?} failed: {message}")]
    Failed { id: String, message: String },
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, CommandError>> + Send>>;
type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Maps command ids to their declared kind and an installed handler.
///
/// Handlers are installed by the binary at startup, once the collaborators
/// (process runner, build-info loader, formatter, ...) they close over are
/// available; the registry itself only enforces the closed id set and kind
/// bookkeeping.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Handler>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind_of(id: &str) -> Option<CommandKind> {
        KNOWN_COMMANDS
            .iter()
            .find(|(known_id, _)| *known_id == id)
            .map(|(_, kind)| *kind)
    }

    /// Installs `handler` for `id`. Panics on an id outside the closed set
    /// or a double registration -- both are programmer errors caught at
    /// startup, not runtime conditions to recover from.
    pub fn register<F, Fut>(&mut self, id: &'static str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CommandError>> + Send + 'static,
    {
        assert!(
            Self::kind_of(id).is_some(),
            "{id:?} is not in the closed command surface"
        );
        let previous = self.handlers.insert(id, Arc::new(move |args| Box::pin(handler(args))));
        assert!(previous.is_none(), "command {id:?} registered twice");
    }

    /// Executes `id` with `args`, returning a method-not-found-shaped error
    /// for anything outside the closed set or not yet installed.
    pub async fn execute(&self, id: &str, args: Value) -> Result<Value, CommandError> {
        let handler = self
            .handlers
            .get(id)
            .cloned()
            .ok_or_else(|| CommandError::NotFound(id.to_string()))?;
        handler(args).await
    }
}
