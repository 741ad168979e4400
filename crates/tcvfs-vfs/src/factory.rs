//! Construction of controllers for a requested mode.

use tcvfs_core::Mode;
use thiserror::Error;
use tracing::{error, info};

use crate::controller::Vfs;
use crate::registry::{plugin_name, VfsRegistry, VFS_PLUGIN_TYPE};

/// Why no controller could be built for a mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("plugin for mode {0} is not available")]
    Unavailable(Mode),

    #[error("could not load plugin {file}: {reason}")]
    Load { file: String, reason: String },

    #[error("plugin {0} does not provide a plugin factory")]
    NotAFactory(String),

    #[error("plugin {0} did not create a vfs instance")]
    NoInstance(String),

    #[error("vfs instance has wrong mode: expected {expected}, got {actual}")]
    WrongMode { expected: Mode, actual: Mode },
}

impl VfsRegistry {
    /// Controller for `mode`, or `None` with the reason logged.
    pub fn create(&self, mode: Mode) -> Option<Vfs> {
        match self.try_create(mode) {
            Ok(vfs) => {
                info!(mode = %mode, "created vfs instance");
                Some(vfs)
            }
            Err(e) => {
                error!(mode = %mode, "could not create vfs: {e}");
                None
            }
        }
    }

    pub fn try_create(&self, mode: Mode) -> Result<Vfs, CreateError> {
        let Some(name) = plugin_name(mode) else {
            return Ok(Vfs::off());
        };

        if !self.is_available(mode) {
            return Err(CreateError::Unavailable(mode));
        }

        let plugin = self
            .loader()
            .resolve(VFS_PLUGIN_TYPE, name)
            .ok_or(CreateError::Unavailable(mode))?;
        let file = plugin.file_name();

        let factory = plugin
            .instance()
            .map_err(|e| CreateError::Load {
                file: file.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| CreateError::NotAFactory(file.clone()))?;

        let backend = factory
            .create()
            .ok_or_else(|| CreateError::NoInstance(file.clone()))?;

        if backend.mode() != mode {
            return Err(CreateError::WrongMode {
                expected: mode,
                actual: backend.mode(),
            });
        }

        Ok(Vfs::new(backend))
    }
}
