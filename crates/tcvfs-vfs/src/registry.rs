//! Backend capability registry: which virtualization modes can be used here.
//!
//! Each mode other than [`Mode::Off`] is served by a plugin. A plugin is
//! usable only if it exists, declares the plugin-factory IID, declares type
//! `"vfs"`, declares exactly the running application's version, and actually
//! loads. Backends ship together with the application, so there is no
//! version range.
//!
//! Plugin artifacts cannot change while the process runs, so each mode is
//! probed at most once per registry and the answer is kept.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tcvfs_core::Mode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::backend::BuiltinPlugins;
use crate::controller::VfsBackend;

/// Interface identifier every backend plugin must declare.
pub const PLUGIN_IID: &str = "io.tummycrypt.tcvfs.PluginFactory";

/// Component type declared by virtualization plugins.
pub const VFS_PLUGIN_TYPE: &str = "vfs";

/// Version of the running application; plugins must declare exactly this.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata a plugin declares, readable without loading it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    #[serde(rename = "IID", default)]
    pub iid: String,
    #[serde(rename = "MetaData", default)]
    pub meta: PluginMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub version: String,
}

impl PluginMetadata {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Capability of a loaded plugin to construct backends.
pub trait PluginFactory: Send + Sync {
    /// Construct a fresh backend, or `None` if the plugin cannot.
    fn create(&self) -> Option<Box<dyn VfsBackend>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

/// A resolved plugin artifact.
pub trait Plugin: Send + Sync {
    /// Artifact name used in diagnostics.
    fn file_name(&self) -> String;

    /// Declared metadata; `None` if the artifact declares none.
    fn metadata(&self) -> Option<PluginMetadata>;

    /// Load the artifact, resolving its dependencies.
    fn load(&self) -> Result<(), LoadError>;

    /// Load the artifact and obtain its factory; `Ok(None)` if the loaded
    /// object is not a [`PluginFactory`].
    fn instance(&self) -> Result<Option<Arc<dyn PluginFactory>>, LoadError>;
}

/// Finds plugin artifacts by component kind and name.
pub trait PluginLoader: Send + Sync {
    fn resolve(&self, kind: &str, name: &str) -> Option<Arc<dyn Plugin>>;
}

/// Plugin name serving `mode`; `None` for modes without a plugin.
pub fn plugin_name(mode: Mode) -> Option<&'static str> {
    match mode {
        Mode::Off => None,
        Mode::WithSuffix => Some("suffix"),
        Mode::WindowsCfApi => Some("win"),
    }
}

/// Conventional artifact name for a plugin, e.g. `tcvfs_vfs_suffix`.
pub fn plugin_file_name(kind: &str, name: &str) -> String {
    format!("tcvfs_{kind}_{name}")
}

/// Why a mode's plugin cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginUnavailable {
    #[error("mode {0} has no plugin")]
    NoPlugin(Mode),

    #[error("plugin doesn't exist: {0}")]
    NotFound(String),

    #[error("plugin {file} has wrong IID: {found:?}")]
    WrongIid { file: String, found: String },

    #[error("plugin {file} has wrong type: {found:?}")]
    WrongType { file: String, found: String },

    #[error("plugin {file} has wrong version: {found:?} (expected {expected:?})")]
    WrongVersion {
        file: String,
        found: String,
        expected: String,
    },

    #[error("plugin {file} failed to load: {reason}")]
    LoadFailed { file: String, reason: String },
}

impl PluginUnavailable {
    fn log(&self, mode: Mode) {
        match self {
            PluginUnavailable::NoPlugin(_) | PluginUnavailable::NotFound(_) => {
                debug!(mode = %mode, "{self}")
            }
            _ => warn!(mode = %mode, "{self}"),
        }
    }
}

pub struct VfsRegistry {
    loader: Box<dyn PluginLoader>,
    app_version: String,
    availability: Mutex<HashMap<Mode, bool>>,
}

impl VfsRegistry {
    pub fn new(loader: impl PluginLoader + 'static, app_version: impl Into<String>) -> Self {
        VfsRegistry {
            loader: Box::new(loader),
            app_version: app_version.into(),
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over the backends compiled into this build.
    pub fn builtin() -> Self {
        VfsRegistry::new(BuiltinPlugins::default(), APP_VERSION)
    }

    /// Process-wide registry over the built-in backends.
    pub fn global() -> &'static VfsRegistry {
        static GLOBAL: OnceLock<VfsRegistry> = OnceLock::new();
        GLOBAL.get_or_init(VfsRegistry::builtin)
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub(crate) fn loader(&self) -> &dyn PluginLoader {
        &*self.loader
    }

    /// Whether `mode` can be used. Cached for the registry's lifetime.
    pub fn is_available(&self, mode: Mode) -> bool {
        if mode == Mode::Off {
            return true;
        }

        let mut cache = self
            .availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(&available) = cache.get(&mode) {
            return available;
        }

        let available = match self.probe(mode) {
            Ok(()) => true,
            Err(reason) => {
                reason.log(mode);
                false
            }
        };
        cache.insert(mode, available);
        available
    }

    /// Run every plugin check for `mode`, bypassing the cache.
    pub fn probe(&self, mode: Mode) -> Result<(), PluginUnavailable> {
        let name = plugin_name(mode).ok_or(PluginUnavailable::NoPlugin(mode))?;
        let plugin = self
            .loader
            .resolve(VFS_PLUGIN_TYPE, name)
            .ok_or_else(|| PluginUnavailable::NotFound(plugin_file_name(VFS_PLUGIN_TYPE, name)))?;
        let file = plugin.file_name();

        let metadata = plugin
            .metadata()
            .ok_or_else(|| PluginUnavailable::NotFound(file.clone()))?;
        if metadata.iid.is_empty() {
            return Err(PluginUnavailable::NotFound(file));
        }
        if metadata.iid != PLUGIN_IID {
            return Err(PluginUnavailable::WrongIid {
                file,
                found: metadata.iid,
            });
        }
        if metadata.meta.kind != VFS_PLUGIN_TYPE {
            return Err(PluginUnavailable::WrongType {
                file,
                found: metadata.meta.kind,
            });
        }
        if metadata.meta.version != self.app_version {
            return Err(PluginUnavailable::WrongVersion {
                file,
                found: metadata.meta.version,
                expected: self.app_version.clone(),
            });
        }

        // Metadata can be present while dependencies fail to resolve.
        plugin
            .load()
            .map_err(|e| PluginUnavailable::LoadFailed {
                file,
                reason: e.to_string(),
            })
    }

    /// The most preferred available mode; `Off` if no plugin is usable.
    pub fn best_available_mode(&self) -> Mode {
        Mode::PREFERENCE
            .into_iter()
            .find(|&mode| self.is_available(mode))
            .unwrap_or(Mode::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_names() {
        assert_eq!(plugin_name(Mode::Off), None);
        assert_eq!(plugin_name(Mode::WithSuffix), Some("suffix"));
        assert_eq!(plugin_name(Mode::WindowsCfApi), Some("win"));
        assert_eq!(plugin_file_name("vfs", "suffix"), "tcvfs_vfs_suffix");
    }

    #[test]
    fn metadata_from_json() {
        let json = r#"{"IID": "io.tummycrypt.tcvfs.PluginFactory", "MetaData": {"type": "vfs", "version": "1.2.3"}}"#;
        let meta = PluginMetadata::from_json(json).unwrap();
        assert_eq!(meta.iid, PLUGIN_IID);
        assert_eq!(meta.meta.kind, "vfs");
        assert_eq!(meta.meta.version, "1.2.3");
    }

    #[test]
    fn metadata_fields_default_to_empty() {
        let meta = PluginMetadata::from_json(r#"{"IID": "x"}"#).unwrap();
        assert_eq!(meta.meta, PluginMeta::default());
    }

    #[test]
    fn off_needs_no_plugin() {
        let registry = VfsRegistry::builtin();
        assert!(registry.is_available(Mode::Off));
        assert_eq!(registry.probe(Mode::Off), Err(PluginUnavailable::NoPlugin(Mode::Off)));
    }

    #[test]
    fn builtin_suffix_backend_is_available() {
        let registry = VfsRegistry::builtin();
        assert_eq!(registry.probe(Mode::WithSuffix), Ok(()));
        assert!(registry.is_available(Mode::WithSuffix));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn builtin_best_mode_without_cfapi() {
        let registry = VfsRegistry::builtin();
        assert!(!registry.is_available(Mode::WindowsCfApi));
        assert_eq!(registry.best_available_mode(), Mode::WithSuffix);
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn builtin_best_mode_with_cfapi() {
        let registry = VfsRegistry::builtin();
        assert_eq!(registry.best_available_mode(), Mode::WindowsCfApi);
    }

    #[test]
    fn global_registry_is_shared() {
        assert!(std::ptr::eq(VfsRegistry::global(), VfsRegistry::global()));
    }
}
