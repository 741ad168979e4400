//! Windows Cloud Files API backend.
//!
//! Placeholders are NTFS files carrying cloud attributes, so Explorer shows
//! their real size and status icons. Registering the sync root and serving
//! hydration callbacks belongs to the platform provider; this backend owns
//! the pre-flight checks and placeholder recognition.

use std::os::windows::fs::MetadataExt;
use std::path::Path;

use tcvfs_core::{Mode, VfsError, VfsResult};
use tracing::info;

use crate::controller::{PlaceholderItem, VfsBackend, VfsSetupParams};
use crate::feasibility::check_feasibility;

// winnt.h
const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
const FILE_ATTRIBUTE_RECALL_ON_OPEN: u32 = 0x0004_0000;
const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;

const DEHYDRATED_MASK: u32 =
    FILE_ATTRIBUTE_OFFLINE | FILE_ATTRIBUTE_RECALL_ON_OPEN | FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS;

#[derive(Debug, Default)]
pub struct CfApiVfs;

impl CfApiVfs {
    pub fn new() -> Self {
        CfApiVfs
    }

    pub(crate) fn boxed() -> Box<dyn VfsBackend> {
        Box::new(CfApiVfs::new())
    }
}

impl VfsBackend for CfApiVfs {
    fn mode(&self) -> Mode {
        Mode::WindowsCfApi
    }

    fn start(&mut self, params: &VfsSetupParams) -> VfsResult<()> {
        check_feasibility(Mode::WindowsCfApi, &params.filesystem_path)
            .map_err(|e| VfsError::Backend(e.to_string()))?;

        info!(
            root = %params.filesystem_path.display(),
            provider = %params.provider_name,
            version = %params.provider_version,
            display_name = %params.display_name,
            "Cloud Files sync root ready"
        );
        Ok(())
    }

    fn socket_api_pin_state_actions_shown(&self) -> bool {
        true
    }

    fn is_dehydrated_placeholder(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.file_attributes() & DEHYDRATED_MASK != 0)
            .unwrap_or(false)
    }

    fn create_placeholder(&self, _params: &VfsSetupParams, item: &PlaceholderItem) -> VfsResult<()> {
        Err(VfsError::Backend(format!(
            "Cloud Files placeholders are created by the platform provider: {}",
            item.path
        )))
    }

    fn dehydrate_placeholder(
        &self,
        _params: &VfsSetupParams,
        item: &PlaceholderItem,
    ) -> VfsResult<()> {
        Err(VfsError::Backend(format!(
            "Cloud Files dehydration is handled by the platform provider: {}",
            item.path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_files_are_not_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let vfs = CfApiVfs::new();
        assert!(!vfs.is_dehydrated_placeholder(&file));
        assert!(!vfs.is_dehydrated_placeholder(&tmp.path().join("missing")));
        assert_eq!(vfs.file_suffix(), "");
    }
}
