//! The disk-watcher collaborator (spec §6.4): delivers `{uri, kind}` events
//! to the File Source. A thin interface over whatever actually detects
//! changes -- a local `notify`-backed watcher when running over stdio, or
//! events forwarded by a daemon-hosting client over a non-`file:` transport
//! (spec §6.1).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub uri: String,
    pub kind: WatchEventKind,
}

pub trait DiskWatcher: Send + Sync {
    /// Drain whatever events have arrived since the last call. Non-blocking;
    /// returns an empty vector when nothing new has happened.
    fn poll(&self) -> Vec<WatchEvent>;
}
