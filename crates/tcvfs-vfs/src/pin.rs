//! Pin-state access on top of the journal.

use tcvfs_core::journal::normalize_path;
use tcvfs_core::{JournalError, PinState, SyncJournal};
use tracing::debug;

/// Pin-state directives of one sync root.
pub struct PinStates<'a> {
    journal: &'a dyn SyncJournal,
}

impl<'a> PinStates<'a> {
    pub fn new(journal: &'a dyn SyncJournal) -> Self {
        PinStates { journal }
    }

    /// Discard explicit pins on `path` and below, then store `state` on
    /// `path` unless it is `Inherited`. Both steps form one journal write.
    pub fn set(&self, path: &str, state: PinState) -> Result<(), JournalError> {
        let path = normalize_path(path);
        debug!(path = %path, state = %state, "setting pin state");
        self.journal.write_pin_states(&mut |pins| {
            pins.wipe_for_path_and_below(&path);
            if state != PinState::Inherited {
                pins.set_for_path(&path, state);
            }
        })
    }

    /// Pin state of `path` or its nearest explicitly pinned ancestor.
    pub fn effective(&self, path: &str) -> Result<Option<PinState>, JournalError> {
        self.journal.effective_pin_state(&normalize_path(path))
    }

    /// Pin state that applies to the whole subtree at `path`, which is the
    /// effective state of `path` itself.
    pub fn effective_for_subtree(&self, path: &str) -> Result<Option<PinState>, JournalError> {
        self.journal
            .effective_pin_state_recursive(&normalize_path(path))
    }
}
