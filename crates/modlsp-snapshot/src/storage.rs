//! Safe handling of [`StorageHandle`](salsa::StorageHandle) for mutations
//! that need to temporarily take ownership of a [`SnapshotDatabase`]'s salsa
//! storage (setting inputs) and hand it back afterward.
//!
//! `modlsp-session` holds one [`SafeStorageHandle`] per live view; request
//! handlers clone a read-only database for the current snapshot via
//! [`SafeStorageHandle::clone_for_read`], while the single task allowed to
//! apply edits takes the handle via [`SafeStorageHandle::take_guarded`].

use salsa::StorageHandle;

use crate::db::SnapshotDatabase;

/// Safe wrapper for [`StorageHandle`] that prevents misuse through type
/// safety.
///
/// This enum ensures a database handle can only be in one of two valid
/// states, making invalid concurrent-mutation states unrepresentable.
///
/// ## Panic behavior
///
/// Methods here panic when the state machine's invariants are violated.
/// These panics represent programming bugs, not runtime errors to recover
/// from -- similar to how `RefCell::borrow_mut()` panics on a double borrow.
pub enum SafeStorageHandle {
    /// Handle is available for use.
    Available(StorageHandle<SnapshotDatabase>),
    /// Handle has been taken for mutation -- no handle available.
    TakenForMutation,
}

impl SafeStorageHandle {
    #[must_use]
    pub fn new(handle: StorageHandle<SnapshotDatabase>) -> Self {
        Self::Available(handle)
    }

    /// Take the handle for mutation, leaving the enum in `TakenForMutation`.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been taken for mutation.
    pub fn take_for_mutation(&mut self) -> StorageHandle<SnapshotDatabase> {
        match std::mem::replace(self, Self::TakenForMutation) {
            Self::Available(handle) => handle,
            Self::TakenForMutation => panic!(
                "database handle already taken for mutation; do not call multiple mutation \
                 operations concurrently and make sure every mutation restores the handle"
            ),
        }
    }

    /// Restore the handle after mutation, returning to `Available`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is not currently taken for mutation.
    pub fn restore_from_mutation(&mut self, handle: StorageHandle<SnapshotDatabase>) {
        match self {
            Self::TakenForMutation => *self = Self::Available(handle),
            Self::Available(_) => panic!(
                "cannot restore database handle; it was not taken for mutation"
            ),
        }
    }

    /// Clone the handle for read-only operations.
    ///
    /// # Panics
    ///
    /// Panics if the handle is currently taken for mutation.
    pub fn clone_for_read(&self) -> StorageHandle<SnapshotDatabase> {
        match self {
            Self::Available(handle) => handle.clone(),
            Self::TakenForMutation => panic!(
                "cannot read database handle; it is currently taken for mutation"
            ),
        }
    }

    /// Take the handle for mutation with automatic restoration via guard.
    pub fn take_guarded(&mut self) -> StorageHandleGuard<'_> {
        StorageHandleGuard::new(self)
    }
}

enum GuardState {
    Active {
        handle: StorageHandle<SnapshotDatabase>,
    },
    Consumed,
    Restored,
}

/// RAII guard for safe [`StorageHandle`] management during mutations.
///
/// Ensures the handle is always restored even if the mutation panics.
///
/// ## State machine
/// - `Active` -> `Consumed` via [`StorageHandleGuard::handle`]
/// - `Consumed` -> `Restored` via [`StorageHandleGuard::restore`]
#[must_use = "dropping a StorageHandleGuard immediately defeats the purpose"]
pub struct StorageHandleGuard<'a> {
    safe_handle: &'a mut SafeStorageHandle,
    state: GuardState,
}

impl<'a> StorageHandleGuard<'a> {
    pub fn new(safe_handle: &'a mut SafeStorageHandle) -> Self {
        let handle = safe_handle.take_for_mutation();
        Self {
            safe_handle,
            state: GuardState::Active { handle },
        }
    }

    /// Consume the guard's handle for mutation operations.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been consumed or restored.
    pub fn handle(&mut self) -> StorageHandle<SnapshotDatabase> {
        match std::mem::replace(&mut self.state, GuardState::Consumed) {
            GuardState::Active { handle } => handle,
            GuardState::Consumed => {
                panic!("StorageHandle already consumed from this guard")
            }
            GuardState::Restored => {
                panic!("cannot consume handle; guard has already been restored")
            }
        }
    }

    /// Restore the handle, consuming the guard.
    ///
    /// # Panics
    ///
    /// Panics if the handle hasn't been consumed yet, or was already
    /// restored.
    pub fn restore(mut self, handle: StorageHandle<SnapshotDatabase>) {
        match self.state {
            GuardState::Consumed => {
                self.safe_handle.restore_from_mutation(handle);
                self.state = GuardState::Restored;
            }
            GuardState::Active { .. } => {
                panic!("cannot restore handle; call guard.handle() first")
            }
            GuardState::Restored => panic!("handle has already been restored"),
        }
    }
}

impl Drop for StorageHandleGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        match &self.state {
            GuardState::Active { .. } => panic!(
                "StorageHandleGuard dropped without using the handle; call guard.handle()"
            ),
            GuardState::Consumed => panic!(
                "StorageHandleGuard dropped without restoring the handle; call guard.restore(..)"
            ),
            GuardState::Restored => {}
        }
    }
}
