//! Backend registry and factory behavior against scripted plugins.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tcvfs_core::{Mode, VfsResult};
use tcvfs_vfs::registry::{PluginMeta, APP_VERSION, PLUGIN_IID};
use tcvfs_vfs::{
    CreateError, LoadError, PlaceholderItem, Plugin, PluginFactory, PluginLoader, PluginMetadata,
    PluginUnavailable, VfsBackend, VfsRegistry, VfsSetupParams,
};

const VERSION: &str = "3.1.4";

struct FakeBackend(Mode);

impl VfsBackend for FakeBackend {
    fn mode(&self) -> Mode {
        self.0
    }
    fn start(&mut self, _params: &VfsSetupParams) -> VfsResult<()> {
        Ok(())
    }
    fn socket_api_pin_state_actions_shown(&self) -> bool {
        true
    }
    fn is_dehydrated_placeholder(&self, _path: &Path) -> bool {
        false
    }
    fn create_placeholder(&self, _: &VfsSetupParams, _: &PlaceholderItem) -> VfsResult<()> {
        Ok(())
    }
    fn dehydrate_placeholder(&self, _: &VfsSetupParams, _: &PlaceholderItem) -> VfsResult<()> {
        Ok(())
    }
}

struct FakeFactory(Option<Mode>);

impl PluginFactory for FakeFactory {
    fn create(&self) -> Option<Box<dyn VfsBackend>> {
        self.0.map(|mode| Box::new(FakeBackend(mode)) as Box<dyn VfsBackend>)
    }
}

#[derive(Clone)]
struct FakePlugin {
    name: String,
    metadata: Option<PluginMetadata>,
    load_error: Option<String>,
    /// `None`: loaded object is not a factory
    factory: Option<Option<Mode>>,
    loads: Arc<AtomicUsize>,
}

impl FakePlugin {
    fn good(name: &str, mode: Mode) -> Self {
        FakePlugin {
            name: name.into(),
            metadata: Some(metadata(PLUGIN_IID, "vfs", VERSION)),
            load_error: None,
            factory: Some(Some(mode)),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Plugin for FakePlugin {
    fn file_name(&self) -> String {
        format!("fake_vfs_{}", self.name)
    }

    fn metadata(&self) -> Option<PluginMetadata> {
        self.metadata.clone()
    }

    fn load(&self) -> Result<(), LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.load_error {
            Some(reason) => Err(LoadError(reason.clone())),
            None => Ok(()),
        }
    }

    fn instance(&self) -> Result<Option<Arc<dyn PluginFactory>>, LoadError> {
        self.load()?;
        Ok(self
            .factory
            .map(|mode| Arc::new(FakeFactory(mode)) as Arc<dyn PluginFactory>))
    }
}

#[derive(Default)]
struct FakeLoader {
    plugins: HashMap<String, FakePlugin>,
}

impl FakeLoader {
    fn with(mut self, plugin: FakePlugin) -> Self {
        self.plugins.insert(plugin.name.clone(), plugin);
        self
    }
}

impl PluginLoader for FakeLoader {
    fn resolve(&self, kind: &str, name: &str) -> Option<Arc<dyn Plugin>> {
        if kind != "vfs" {
            return None;
        }
        self.plugins
            .get(name)
            .map(|p| Arc::new(p.clone()) as Arc<dyn Plugin>)
    }
}

fn metadata(iid: &str, kind: &str, version: &str) -> PluginMetadata {
    PluginMetadata {
        iid: iid.into(),
        meta: PluginMeta {
            kind: kind.into(),
            version: version.into(),
        },
    }
}

fn registry(loader: FakeLoader) -> VfsRegistry {
    VfsRegistry::new(loader, VERSION)
}

#[test]
fn matching_plugin_is_available() {
    let reg = registry(FakeLoader::default().with(FakePlugin::good("suffix", Mode::WithSuffix)));
    assert_eq!(reg.probe(Mode::WithSuffix), Ok(()));
    assert!(reg.is_available(Mode::WithSuffix));
}

#[test]
fn missing_plugin_is_unavailable() {
    let reg = registry(FakeLoader::default());
    assert!(matches!(
        reg.probe(Mode::WithSuffix),
        Err(PluginUnavailable::NotFound(_))
    ));
    assert!(!reg.is_available(Mode::WithSuffix));
}

#[test]
fn plugin_without_metadata_is_unavailable() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.metadata = None;
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.probe(Mode::WithSuffix),
        Err(PluginUnavailable::NotFound(_))
    ));
}

#[test]
fn wrong_iid_is_unavailable() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.metadata = Some(metadata("org.other.Factory", "vfs", VERSION));
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.probe(Mode::WithSuffix),
        Err(PluginUnavailable::WrongIid { ref found, .. }) if found == "org.other.Factory"
    ));
    assert!(!reg.is_available(Mode::WithSuffix));
}

#[test]
fn wrong_type_is_unavailable() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.metadata = Some(metadata(PLUGIN_IID, "sync", VERSION));
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.probe(Mode::WithSuffix),
        Err(PluginUnavailable::WrongType { .. })
    ));
}

#[test]
fn version_must_match_exactly() {
    for version in ["3.1.5", "3.1", "3.1.4-rc1", ""] {
        let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
        plugin.metadata = Some(metadata(PLUGIN_IID, "vfs", version));
        let reg = registry(FakeLoader::default().with(plugin));
        assert!(
            matches!(reg.probe(Mode::WithSuffix), Err(PluginUnavailable::WrongVersion { .. })),
            "version {version:?} accepted"
        );
        assert!(!reg.is_available(Mode::WithSuffix));
    }
}

#[test]
fn metadata_checks_run_before_load() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.metadata = Some(metadata(PLUGIN_IID, "vfs", "0.0.0"));
    let loads = Arc::clone(&plugin.loads);
    let reg = registry(FakeLoader::default().with(plugin));

    assert!(!reg.is_available(Mode::WithSuffix));
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn load_failure_after_good_metadata_is_unavailable() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.load_error = Some("libcloud.so: cannot open shared object file".into());
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.probe(Mode::WithSuffix),
        Err(PluginUnavailable::LoadFailed { .. })
    ));
    assert!(!reg.is_available(Mode::WithSuffix));
}

#[test]
fn availability_is_probed_once() {
    let plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    let loads = Arc::clone(&plugin.loads);
    let reg = registry(FakeLoader::default().with(plugin));

    for _ in 0..5 {
        assert!(reg.is_available(Mode::WithSuffix));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn unavailability_is_cached_too() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.load_error = Some("boom".into());
    let loads = Arc::clone(&plugin.loads);
    let reg = registry(FakeLoader::default().with(plugin));

    assert!(!reg.is_available(Mode::WithSuffix));
    assert!(!reg.is_available(Mode::WithSuffix));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn best_mode_follows_preference() {
    let reg = registry(FakeLoader::default());
    assert_eq!(reg.best_available_mode(), Mode::Off);

    let reg = registry(FakeLoader::default().with(FakePlugin::good("suffix", Mode::WithSuffix)));
    assert_eq!(reg.best_available_mode(), Mode::WithSuffix);

    let reg = registry(
        FakeLoader::default()
            .with(FakePlugin::good("suffix", Mode::WithSuffix))
            .with(FakePlugin::good("win", Mode::WindowsCfApi)),
    );
    assert_eq!(reg.best_available_mode(), Mode::WindowsCfApi);
}

#[test]
fn best_mode_skips_broken_preferred_backend() {
    let mut win = FakePlugin::good("win", Mode::WindowsCfApi);
    win.metadata = Some(metadata(PLUGIN_IID, "vfs", "9.9.9"));
    let reg = registry(
        FakeLoader::default()
            .with(win)
            .with(FakePlugin::good("suffix", Mode::WithSuffix)),
    );
    assert_eq!(reg.best_available_mode(), Mode::WithSuffix);
}

#[test]
fn create_off_needs_no_plugin() {
    let reg = registry(FakeLoader::default());
    let vfs = reg.create(Mode::Off).unwrap();
    assert_eq!(vfs.mode(), Mode::Off);
}

#[test]
fn create_builds_backend_for_mode() {
    let reg = registry(FakeLoader::default().with(FakePlugin::good("suffix", Mode::WithSuffix)));
    let vfs = reg.create(Mode::WithSuffix).unwrap();
    assert_eq!(vfs.mode(), Mode::WithSuffix);
}

#[test]
fn create_refuses_unavailable_mode() {
    let reg = registry(FakeLoader::default());
    assert_eq!(
        reg.try_create(Mode::WithSuffix).unwrap_err(),
        CreateError::Unavailable(Mode::WithSuffix)
    );
    assert!(reg.create(Mode::WithSuffix).is_none());
}

#[test]
fn create_fails_when_plugin_is_not_a_factory() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.factory = None;
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.try_create(Mode::WithSuffix),
        Err(CreateError::NotAFactory(_))
    ));
}

#[test]
fn create_fails_when_factory_yields_nothing() {
    let mut plugin = FakePlugin::good("suffix", Mode::WithSuffix);
    plugin.factory = Some(None);
    let reg = registry(FakeLoader::default().with(plugin));
    assert!(matches!(
        reg.try_create(Mode::WithSuffix),
        Err(CreateError::NoInstance(_))
    ));
}

#[test]
fn create_rejects_backend_of_wrong_mode() {
    let reg = registry(FakeLoader::default().with(FakePlugin::good("suffix", Mode::Off)));
    assert_eq!(
        reg.try_create(Mode::WithSuffix).unwrap_err(),
        CreateError::WrongMode {
            expected: Mode::WithSuffix,
            actual: Mode::Off,
        }
    );
}

#[test]
fn builtin_registry_uses_crate_version() {
    assert_eq!(VfsRegistry::builtin().app_version(), APP_VERSION);
}
