//! The process-runner collaborator (spec §6.4): arbitrary external commands
//! with a captured environment, working directory, and overlay file map,
//! cancellable through the same [`modlsp_source::CancellationToken`] the
//! Session Dispatcher threads through every request.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use modlsp_source::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
    pub env: BTreeMap<String, String>,
    /// In-memory overlay contents the runner should make visible at the
    /// given paths instead of whatever is on disk, mirroring the view's
    /// open-file overlay set.
    pub overlays: BTreeMap<Utf8PathBuf, Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn process: {0}")]
    Spawn(String),
    #[error("cancelled")]
    Cancelled,
}

pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command: ProcessCommand,
        cancellation: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError>;
}
