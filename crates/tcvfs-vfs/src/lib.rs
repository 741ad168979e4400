//! tcvfs-vfs: virtual file support for a sync root.
//!
//! Picks a virtualization [`Mode`], checks that it can run on this machine
//! and on the chosen sync root, and builds the per-root [`Vfs`] controller
//! that answers pin-state and availability queries.
//!
//! ```text
//! best_available_vfs_mode() ──► check_feasibility(mode, root)
//!        │                              │ ok
//!        ▼                              ▼
//! create_vfs_from_plugin(mode) ──► Vfs ──start(params)──► StartedVfs
//! ```

pub mod availability;
pub mod backend;
pub mod controller;
pub mod factory;
pub mod feasibility;
pub mod pin;
pub mod registry;

use std::path::Path;

pub use availability::{availability_in_db, classify};
pub use controller::{PlaceholderItem, StartedVfs, Vfs, VfsBackend, VfsSetupParams};
pub use factory::CreateError;
pub use feasibility::{check_feasibility, check_feasibility_with, FeasibilityError, VolumeProbe};
pub use pin::PinStates;
pub use registry::{
    LoadError, Plugin, PluginFactory, PluginLoader, PluginMetadata, PluginUnavailable,
    VfsRegistry,
};
pub use tcvfs_core::Mode;

/// Whether the backend for `mode` is usable in this process.
pub fn is_vfs_plugin_available(mode: Mode) -> bool {
    VfsRegistry::global().is_available(mode)
}

/// The most preferred usable mode; never fails, `Off` at worst.
pub fn best_available_vfs_mode() -> Mode {
    VfsRegistry::global().best_available_mode()
}

/// Controller for `mode`, or `None` if its backend cannot be used.
pub fn create_vfs_from_plugin(mode: Mode) -> Option<Vfs> {
    VfsRegistry::global().create(mode)
}

/// Check whether the best available mode can be enabled on `root`.
///
/// Returns the mode that was checked.
pub fn check_availability(root: &Path) -> Result<Mode, FeasibilityError> {
    let mode = best_available_vfs_mode();
    check_feasibility(mode, root)?;
    Ok(mode)
}
