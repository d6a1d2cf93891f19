//! File-backed [`modlsp_collab::TelemetryStore`] (spec §6.5): persists
//! increment-only counters and the prompt-state line under the per-user
//! config directory, in the same best-effort, never-panic style as
//! [`crate::cache`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use modlsp_collab::TelemetryPromptState;
use modlsp_collab::TelemetryStore;

/// `counters.json` plus `prompt_state` under `root`. Both are safe to
/// delete -- on a missing or unparsable file this starts from zero/`None`
/// rather than erroring.
pub struct FileTelemetryStore {
    root: Utf8PathBuf,
    counters: Mutex<BTreeMap<String, u64>>,
}

impl FileTelemetryStore {
    #[must_use]
    pub fn open(root: Utf8PathBuf) -> Self {
        let _ = std::fs::create_dir_all(root.as_std_path());
        let counters = std::fs::read_to_string(root.join("counters.json").as_std_path())
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            root,
            counters: Mutex::new(counters),
        }
    }

    fn flush_counters(&self, counters: &BTreeMap<String, u64>) {
        let Ok(text) = serde_json::to_string(counters) else {
            return;
        };
        if let Err(err) = std::fs::write(self.root.join("counters.json").as_std_path(), text) {
            tracing::warn!(%err, "failed to persist telemetry counters");
        }
    }

    fn prompt_state_path(&self) -> Utf8PathBuf {
        self.root.join("prompt_state")
    }
}

impl TelemetryStore for FileTelemetryStore {
    fn increment(&self, counter: &str) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(counter.to_string()).or_insert(0) += 1;
        self.flush_counters(&counters);
    }

    fn load_prompt_state(&self) -> Option<TelemetryPromptState> {
        let line = std::fs::read_to_string(self.prompt_state_path().as_std_path()).ok()?;
        let now = modlsp_collab::now_epoch();
        Some(TelemetryPromptState::parse(line.trim(), now, fresh_sample_token()))
    }

    fn save_prompt_state(&self, state: TelemetryPromptState) {
        if let Err(err) = std::fs::write(self.prompt_state_path().as_std_path(), state.to_line()) {
            tracing::warn!(%err, "failed to persist telemetry prompt state");
        }
    }
}

/// A per-process sample token in `0..1000`, used only when a stored prompt
/// state is missing or unparsable and a fresh one must be minted.
fn fresh_sample_token() -> u32 {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed) % 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let store = FileTelemetryStore::open(root.clone());
        store.increment("diagnose.run");
        store.increment("diagnose.run");

        let reopened = FileTelemetryStore::open(root);
        assert_eq!(*reopened.counters.lock().unwrap().get("diagnose.run").unwrap(), 2);
    }

    #[test]
    fn prompt_state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = FileTelemetryStore::open(root);

        assert!(store.load_prompt_state().is_none());

        let state = TelemetryPromptState::parse("pending 0 1000 5", 9999, 1);
        store.save_prompt_state(state);

        let reloaded = store.load_prompt_state().unwrap();
        assert_eq!(reloaded.state, state.state);
        assert_eq!(reloaded.attempts, state.attempts);
    }
}
