//! Wires the view registry, session state, and `tower-lsp-server` transport
//! together behind one `run()` the binary crate calls.

pub mod cache;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod queue;
pub mod registry;
pub mod server;
pub mod session;
pub mod telemetry;

use std::sync::Arc;
use std::sync::OnceLock;

use anyhow::Result;
use camino::Utf8PathBuf;
use tower_lsp_server::Client;
use tower_lsp_server::LspService;
use tower_lsp_server::Server;

use crate::server::Backend;
use crate::session::Session;

/// Blocks on a current-thread runtime, serving the protocol over stdio
/// until the client disconnects.
pub fn run() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let project_root = workspace_root()?;
    let session = Arc::new(Session::new(&project_root));

    // The `LspLayer` needs a `Client` to forward log messages through, but
    // `tower-lsp-server` only hands one over once the service is built --
    // this cell lets the logging layer start before that and pick the
    // client up as soon as it exists.
    let client_cell: Arc<OnceLock<Client>> = Arc::new(OnceLock::new());
    let _guard = crate::logging::init_tracing({
        let client_cell = Arc::clone(&client_cell);
        move |message_type, message| {
            if let Some(client) = client_cell.get() {
                let client = client.clone();
                tokio::spawn(async move {
                    client.log_message(message_type, message).await;
                });
            }
        }
    })?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(move |client| {
        let _ = client_cell.set(client.clone());
        Backend::new(client, Arc::clone(&session))
    })
    .finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

fn workspace_root() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| anyhow::anyhow!("workspace root {path:?} is not valid UTF-8"))
}
