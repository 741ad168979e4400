//! The per-sync-root virtualization controller.
//!
//! A [`Vfs`] wraps one backend and is bound to a sync root by
//! [`Vfs::start`], which consumes it and yields a [`StartedVfs`]. Pin-state
//! and availability queries only exist on the started controller, so they
//! cannot be issued before setup, and a controller cannot be started twice.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tcvfs_core::{AvailabilityResult, Mode, PinState, SyncJournal, VfsResult};
use tracing::info;

use crate::availability::availability_in_db;
use crate::backend::off::VfsOff;
use crate::pin::PinStates;

/// Everything a backend needs to serve one sync root.
#[derive(Clone)]
pub struct VfsSetupParams {
    /// Local directory that is synchronized
    pub filesystem_path: PathBuf,
    /// Remote folder the sync root mirrors
    pub remote_path: String,
    /// Name shown by the platform shell
    pub display_name: String,
    pub provider_name: String,
    pub provider_version: String,
    /// Journal shared with the rest of the sync engine
    pub journal: Arc<dyn SyncJournal>,
}

impl fmt::Debug for VfsSetupParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfsSetupParams")
            .field("filesystem_path", &self.filesystem_path)
            .field("remote_path", &self.remote_path)
            .field("display_name", &self.display_name)
            .field("provider_name", &self.provider_name)
            .field("provider_version", &self.provider_version)
            .finish_non_exhaustive()
    }
}

/// A file to be represented by (or turned into) a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderItem {
    /// Path relative to the sync root, `/`-separated
    pub path: String,
    /// Size of the remote content in bytes
    pub size: u64,
    /// Remote content identity, e.g. `blake3:{hex}`
    pub content_id: String,
}

/// Platform-specific placeholder management.
pub trait VfsBackend: Send + Sync {
    fn mode(&self) -> Mode;

    /// Suffix appended to dehydrated placeholder names (empty if none)
    fn file_suffix(&self) -> &str {
        ""
    }

    /// Backend-specific startup, run once before any query.
    fn start(&mut self, params: &VfsSetupParams) -> VfsResult<()>;

    /// Whether pin-state actions ("always keep on this device", "free up
    /// space") should be offered to the user.
    fn socket_api_pin_state_actions_shown(&self) -> bool;

    /// Whether a hydration is currently in progress.
    fn is_hydrating(&self) -> bool {
        false
    }

    /// Whether the file at `path` is a dehydrated placeholder of this backend.
    fn is_dehydrated_placeholder(&self, path: &Path) -> bool;

    fn create_placeholder(&self, params: &VfsSetupParams, item: &PlaceholderItem) -> VfsResult<()>;

    /// Replace the hydrated file for `item` with a placeholder.
    fn dehydrate_placeholder(
        &self,
        params: &VfsSetupParams,
        item: &PlaceholderItem,
    ) -> VfsResult<()>;
}

/// Controller that has not been started yet.
pub struct Vfs {
    backend: Box<dyn VfsBackend>,
}

impl Vfs {
    pub fn new(backend: Box<dyn VfsBackend>) -> Self {
        Vfs { backend }
    }

    /// The built-in controller for [`Mode::Off`].
    pub fn off() -> Self {
        Vfs::new(Box::new(VfsOff))
    }

    pub fn mode(&self) -> Mode {
        self.backend.mode()
    }

    pub fn file_suffix(&self) -> &str {
        self.backend.file_suffix()
    }

    /// Bind the controller to a sync root and run backend startup.
    ///
    /// On failure the controller is dropped; obtain a new one to retry.
    pub fn start(mut self, params: VfsSetupParams) -> VfsResult<StartedVfs> {
        self.backend.start(&params)?;
        info!(
            mode = %self.backend.mode(),
            root = %params.filesystem_path.display(),
            "vfs started"
        );
        Ok(StartedVfs {
            backend: self.backend,
            params,
        })
    }
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs").field("mode", &self.mode()).finish()
    }
}

/// Controller bound to a sync root.
pub struct StartedVfs {
    backend: Box<dyn VfsBackend>,
    params: VfsSetupParams,
}

impl StartedVfs {
    pub fn mode(&self) -> Mode {
        self.backend.mode()
    }

    pub fn file_suffix(&self) -> &str {
        self.backend.file_suffix()
    }

    pub fn params(&self) -> &VfsSetupParams {
        &self.params
    }

    fn pins(&self) -> PinStates<'_> {
        PinStates::new(&*self.params.journal)
    }

    /// Set the pin state of `folder_path`, discarding every explicit pin
    /// below it. `Inherited` only clears.
    pub fn set_pin_state(&self, folder_path: &str, state: PinState) -> VfsResult<()> {
        self.pins().set(folder_path, state)?;
        Ok(())
    }

    /// Effective pin state of `folder_path`; `None` if no ancestor has one.
    pub fn pin_state(&self, folder_path: &str) -> VfsResult<Option<PinState>> {
        Ok(self.pins().effective(folder_path)?)
    }

    /// Availability of the subtree at `folder_path`.
    pub fn availability(&self, folder_path: &str) -> AvailabilityResult {
        availability_in_db(&*self.params.journal, folder_path)
    }

    pub fn socket_api_pin_state_actions_shown(&self) -> bool {
        self.backend.socket_api_pin_state_actions_shown()
    }

    pub fn is_hydrating(&self) -> bool {
        self.backend.is_hydrating()
    }

    pub fn is_dehydrated_placeholder(&self, path: &Path) -> bool {
        self.backend.is_dehydrated_placeholder(path)
    }

    pub fn create_placeholder(&self, item: &PlaceholderItem) -> VfsResult<()> {
        self.backend.create_placeholder(&self.params, item)
    }

    pub fn dehydrate_placeholder(&self, item: &PlaceholderItem) -> VfsResult<()> {
        self.backend.dehydrate_placeholder(&self.params, item)
    }
}

impl fmt::Debug for StartedVfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedVfs")
            .field("mode", &self.mode())
            .field("params", &self.params)
            .finish()
    }
}
