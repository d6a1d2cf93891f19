//! Trait boundaries for the processes outside this crate's control (spec
//! §6.4): build-info extraction, formatting, running arbitrary external
//! commands, disk-change delivery, and telemetry. Each trait is the seam the
//! Package Pipeline, Session Dispatcher, and File Source call through; this
//! crate owns no process spawning or network I/O itself.

mod build_info;
mod format;
mod process;
mod telemetry;
mod watch;

pub use build_info::BuildInfoCollaborator;
pub use build_info::PackageRecord;
pub use format::FormatError;
pub use format::Formatter;
pub use format::IdentityFormatter;
pub use process::ProcessCommand;
pub use process::ProcessOutput;
pub use process::ProcessRunner;
pub use telemetry::now_epoch;
pub use telemetry::NoopTelemetryStore;
pub use telemetry::TelemetryDecision;
pub use telemetry::TelemetryPromptState;
pub use telemetry::TelemetryState;
pub use telemetry::TelemetryStore;
pub use watch::DiskWatcher;
pub use watch::WatchEvent;
pub use watch::WatchEventKind;
