#![allow(dead_code)]

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tempfile::TempDir;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tower_lsp_server::LspService;
use tower_lsp_server::Server;

use modlsp_session::server::Backend;
use modlsp_session::session::Session;

/// In-process LSP test client backed by `tokio::io::duplex`, running the real
/// `Backend` in a background task on the same runtime.
pub struct TestClient {
    write: tokio::io::DuplexStream,
    read: BufReader<tokio::io::DuplexStream>,
    _server: tokio::task::JoinHandle<()>,
    _root: TempDir,
    next_id: AtomicI64,
}

impl TestClient {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let project_root = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 tempdir");
        let session = Arc::new(Session::new(&project_root));

        let (client_write, server_read) = tokio::io::duplex(65536);
        let (server_write, client_read) = tokio::io::duplex(65536);

        let (service, socket) = LspService::build(move |client| Backend::new(client, Arc::clone(&session))).finish();
        let server_handle = tokio::spawn(async move {
            Server::new(server_read, server_write, socket).serve(service).await;
        });

        Self {
            write: client_write,
            read: BufReader::new(client_read),
            _server: server_handle,
            _root: root,
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn send(&mut self, msg: serde_json::Value) {
        let json = serde_json::to_string(&msg).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", json.len());
        self.write.write_all(header.as_bytes()).await.unwrap();
        self.write.write_all(json.as_bytes()).await.unwrap();
        self.write.flush().await.unwrap();
    }

    pub async fn recv(&mut self) -> serde_json::Value {
        let mut content_length: usize = 0;
        loop {
            let mut line = String::new();
            self.read.read_line(&mut line).await.unwrap();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            if let Some(len_str) = line.strip_prefix("Content-Length: ") {
                content_length = len_str.trim().parse().unwrap();
            }
        }
        let mut body = vec![0u8; content_length];
        self.read.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Receive messages, discarding everything except the first matching
    /// request id -- log messages and unrelated notifications are skipped.
    pub async fn recv_response(&mut self, id: i64) -> serde_json::Value {
        loop {
            let msg = self.recv().await;
            if msg.get("id") == Some(&serde_json::json!(id)) && msg.get("method").is_none() {
                return msg;
            }
        }
    }

    pub async fn initialize(&mut self) -> serde_json::Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "capabilities": {},
                "processId": null,
                "rootUri": null
            }
        }))
        .await;
        let response = self.recv_response(id).await;

        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }))
        .await;

        response["result"].clone()
    }

    pub async fn did_open(&mut self, uri: &str, language_id: &str, version: i32, text: &str) {
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": version,
                    "text": text
                }
            }
        }))
        .await;
    }

    pub async fn did_change(&mut self, uri: &str, version: i32, text: &str) {
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didChange",
            "params": {
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }]
            }
        }))
        .await;
    }

    pub async fn did_close(&mut self, uri: &str) {
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didClose",
            "params": { "textDocument": { "uri": uri } }
        }))
        .await;
    }

    pub async fn execute_command(&mut self, command: &str, args: Vec<serde_json::Value>) -> serde_json::Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "workspace/executeCommand",
            "params": { "command": command, "arguments": args }
        }))
        .await;
        self.recv_response(id).await
    }

    pub async fn shutdown(&mut self) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "shutdown",
            "params": null
        }))
        .await;
        let _ = self.recv_response(id).await;
    }
}

#[allow(dead_code)]
pub fn file_uri(path: &str) -> String {
    format!("file://{path}")
}
