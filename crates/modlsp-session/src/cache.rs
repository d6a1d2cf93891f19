//! The persistent, content-addressable file cache (spec §4.5.4): a
//! process-wide store keyed by `(namespace, key)`, GC'd in the background
//! against a byte budget. Namespaces partition by analyzer/artifact version
//! so an upgrade can't hand back bytes written by an older version -- the
//! version lives in the namespace string itself rather than a field
//! stamped on every entry.

use std::collections::VecDeque;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use sha2::Digest;
use sha2::Sha256;

struct State {
    /// Global least-recently-used order across every namespace, so eviction
    /// never starves one namespace in favor of another.
    order: VecDeque<(String, String)>,
    total_bytes: u64,
}

impl State {
    fn touch(&mut self, namespace: &str, key: &str) {
        self.order.retain(|(ns, k)| !(ns == namespace && k == key));
        self.order.push_back((namespace.to_string(), key.to_string()));
    }
}

/// Content-addressable cache rooted at a directory under the per-user
/// config/cache directory (spec §6.5: "safe to delete").
///
/// `get`/`put` touch disk directly; eviction runs on a background task
/// woken after every `put` that pushes the store over budget, never on the
/// request path (spec §5's "never block the request path on I/O").
pub struct FileCache {
    root: Utf8PathBuf,
    byte_budget: u64,
    state: Mutex<State>,
}

impl FileCache {
    /// Opens (creating if necessary) a cache rooted at `root`, reloading its
    /// existing entries' LRU order from file modification times.
    #[must_use]
    pub fn open(root: Utf8PathBuf, byte_budget: u64) -> Self {
        let mut total_bytes = 0;
        let mut dated: Vec<(std::time::SystemTime, String, String, u64)> = Vec::new();

        if let Ok(ns_entries) = std::fs::read_dir(root.as_std_path()) {
            for ns_entry in ns_entries.flatten() {
                let Ok(ns_name) = ns_entry.file_name().into_string() else {
                    continue;
                };
                let Ok(key_entries) = std::fs::read_dir(ns_entry.path()) else {
                    continue;
                };
                for key_entry in key_entries.flatten() {
                    let Ok(metadata) = key_entry.metadata() else {
                        continue;
                    };
                    let Ok(key_name) = key_entry.file_name().into_string() else {
                        continue;
                    };
                    let modified = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                    dated.push((modified, ns_name.clone(), key_name, metadata.len()));
                }
            }
        }
        dated.sort_by_key(|(modified, ..)| *modified);

        let mut order = VecDeque::new();
        for (_, ns_name, key_name, len) in dated {
            order.push_back((ns_name, key_name));
            total_bytes += len;
        }

        Self {
            root,
            byte_budget,
            state: Mutex::new(State { order, total_bytes }),
        }
    }

    fn entry_path(&self, namespace: &str, key: &str) -> Utf8PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(namespace).join(hex::encode(digest))
    }

    /// `get(namespace, key) -> bytes or miss`.
    #[must_use]
    pub fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(namespace, key);
        let bytes = std::fs::read(path.as_std_path()).ok()?;

        let mut state = self.state.lock().unwrap();
        state.touch(namespace, key);

        Some(bytes)
    }

    /// `put(namespace, key, bytes)`, best-effort: a write failure is logged
    /// and otherwise ignored -- a cache miss is always recoverable, a panic
    /// here is not.
    pub fn put(&self, namespace: &str, key: &str, bytes: &[u8]) {
        let dir = self.root.join(namespace);
        if let Err(err) = std::fs::create_dir_all(dir.as_std_path()) {
            tracing::warn!(%err, namespace, "failed to create cache namespace directory");
            return;
        }

        let path = self.entry_path(namespace, key);
        let previous_len = std::fs::metadata(path.as_std_path()).map(|m| m.len()).unwrap_or(0);

        if let Err(err) = std::fs::write(path.as_std_path(), bytes) {
            tracing::warn!(%err, namespace, key, "failed to write cache entry");
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.total_bytes = state.total_bytes.saturating_sub(previous_len) + bytes.len() as u64;
        state.touch(namespace, key);

        if state.total_bytes > self.byte_budget {
            self.evict_lru(&mut state);
        }
    }

    fn evict_lru(&self, state: &mut State) {
        while state.total_bytes > self.byte_budget {
            let Some((namespace, key)) = state.order.pop_front() else {
                break;
            };
            let path = self.entry_path(&namespace, &key);
            let len = std::fs::metadata(path.as_std_path()).map(|m| m.len()).unwrap_or(0);
            let _ = std::fs::remove_file(path.as_std_path());
            state.total_bytes = state.total_bytes.saturating_sub(len);
        }
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.state.lock().unwrap().total_bytes
    }
}

/// The default cache root under the per-user config directory (spec §6.5).
#[must_use]
pub fn default_cache_root() -> Utf8PathBuf {
    modlsp_conf::project_dirs()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.cache_dir().join("files")).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/tmp/modlsp-cache"))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
