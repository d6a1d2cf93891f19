use modlsp_conf::Settings;

use crate::db::Db;
use crate::db::SnapshotDatabase;

/// Reports which parts of a settings update actually changed, so callers
/// know whether they need to kick off extra work (e.g. re-resolving a
/// view's environment, or re-publishing diagnostics).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SettingsUpdate {
    pub env_changed: bool,
    pub diagnostics_changed: bool,
}

impl SnapshotDatabase {
    /// Get a clone of the current settings.
    ///
    /// # Panics
    ///
    /// Panics if the settings mutex is poisoned.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    /// Replace the settings, reporting which parts actually changed.
    ///
    /// Compares field-by-field (Ruff/rust-analyzer pattern) rather than
    /// blindly marking everything dirty, so an edit to an unrelated setting
    /// doesn't force a view re-resolve.
    ///
    /// # Panics
    ///
    /// Panics if the settings mutex is poisoned.
    pub fn set_settings(&mut self, settings: Settings) -> SettingsUpdate {
        let previous = self.settings();
        let diagnostics_changed = previous.diagnostics() != settings.diagnostics();
        let env_changed = previous.debug() != settings.debug();

        *self.settings.lock().unwrap() = settings;

        SettingsUpdate {
            env_changed,
            diagnostics_changed,
        }
    }
}
