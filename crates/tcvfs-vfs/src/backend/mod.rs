//! Backends compiled into this build, exposed through the plugin interface.

use std::sync::Arc;

use tracing::debug;

use crate::controller::VfsBackend;
use crate::registry::{
    plugin_file_name, LoadError, Plugin, PluginFactory, PluginLoader, PluginMetadata,
};

#[cfg(target_os = "windows")]
pub mod cfapi;
pub mod off;
pub mod suffix;

/// Metadata every built-in backend declares.
const BUILTIN_METADATA: &str = concat!(
    r#"{"IID": "io.tummycrypt.tcvfs.PluginFactory", "MetaData": {"type": "vfs", "version": ""#,
    env!("CARGO_PKG_VERSION"),
    r#""}}"#
);

type Constructor = fn() -> Box<dyn VfsBackend>;

struct FnFactory(Constructor);

impl PluginFactory for FnFactory {
    fn create(&self) -> Option<Box<dyn VfsBackend>> {
        Some((self.0)())
    }
}

/// A backend linked into the binary.
pub struct BuiltinPlugin {
    kind: &'static str,
    name: &'static str,
    metadata: &'static str,
    constructor: Constructor,
}

impl Plugin for BuiltinPlugin {
    fn file_name(&self) -> String {
        plugin_file_name(self.kind, self.name)
    }

    fn metadata(&self) -> Option<PluginMetadata> {
        match PluginMetadata::from_json(self.metadata) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!(plugin = %self.file_name(), "unreadable plugin metadata: {e}");
                None
            }
        }
    }

    fn load(&self) -> Result<(), LoadError> {
        Ok(())
    }

    fn instance(&self) -> Result<Option<Arc<dyn PluginFactory>>, LoadError> {
        self.load()?;
        Ok(Some(Arc::new(FnFactory(self.constructor))))
    }
}

/// Loader over the backends available on this platform.
pub struct BuiltinPlugins {
    plugins: Vec<Arc<BuiltinPlugin>>,
}

impl Default for BuiltinPlugins {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut plugins = vec![Arc::new(BuiltinPlugin {
            kind: "vfs",
            name: "suffix",
            metadata: BUILTIN_METADATA,
            constructor: suffix::SuffixVfs::boxed,
        })];

        #[cfg(target_os = "windows")]
        plugins.push(Arc::new(BuiltinPlugin {
            kind: "vfs",
            name: "win",
            metadata: BUILTIN_METADATA,
            constructor: cfapi::CfApiVfs::boxed,
        }));

        BuiltinPlugins { plugins }
    }
}

impl BuiltinPlugins {
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name)
    }
}

impl PluginLoader for BuiltinPlugins {
    fn resolve(&self, kind: &str, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|p| p.kind == kind && p.name == name)
            .map(|p| Arc::clone(p) as Arc<dyn Plugin>)
    }
}
