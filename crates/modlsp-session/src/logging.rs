//! Bridges `tracing` events to LSP `window/logMessage` notifications.
//!
//! `LspLayer` forwards ERROR/WARN/INFO/DEBUG events to the client; TRACE
//! stays server-side, mirroring how verbose the LSP 3.17 `LogMessage`
//! surface is meant to be used for.

use std::sync::Arc;

use tower_lsp_server::ls_types::MessageType;
use tracing::field::Visit;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

pub struct LspLayer {
    send_message: Arc<dyn Fn(MessageType, String) + Send + Sync>,
}

impl LspLayer {
    pub fn new<F>(send_message: F) -> Self
    where
        F: Fn(MessageType, String) + Send + Sync + 'static,
    {
        Self {
            send_message: Arc::new(send_message),
        }
    }
}

struct MessageVisitor {
    message: Option<String>,
}

impl MessageVisitor {
    fn new() -> Self {
        Self { message: None }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }
}

impl<S> Layer<S> for LspLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();

        let message_type = match *metadata.level() {
            Level::ERROR => MessageType::ERROR,
            Level::WARN => MessageType::WARNING,
            Level::INFO => MessageType::INFO,
            Level::DEBUG => MessageType::LOG,
            // too verbose for the client; kept in the file log only.
            Level::TRACE => return,
        };

        let mut visitor = MessageVisitor::new();
        event.record(&mut visitor);

        if let Some(message) = visitor.message {
            (self.send_message)(message_type, message);
        }
    }
}

/// Sets up the dual-layer subscriber: a daily-rotating file layer under the
/// per-user log directory, and an `LspLayer` forwarding INFO+ to the client.
/// Returns the `WorkerGuard` that must be kept alive for the file layer to
/// flush.
pub fn init_tracing<F>(send_message: F) -> anyhow::Result<WorkerGuard>
where
    F: Fn(MessageType, String) + Send + Sync + 'static,
{
    let log_dir = modlsp_conf::log_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir.as_std_path(), "modlsp.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    let lsp_layer =
        LspLayer::new(send_message).with_filter(tracing_subscriber::filter::LevelFilter::INFO);

    Registry::default().with(file_layer).with(lsp_layer).init();

    Ok(guard)
}
