//! Backend for [`Mode::Off`]: files are always fully local and placeholder
//! operations have nothing to do.

use std::path::Path;

use tcvfs_core::{Mode, VfsResult};

use crate::controller::{PlaceholderItem, VfsBackend, VfsSetupParams};

#[derive(Debug, Default)]
pub struct VfsOff;

impl VfsBackend for VfsOff {
    fn mode(&self) -> Mode {
        Mode::Off
    }

    fn start(&mut self, _params: &VfsSetupParams) -> VfsResult<()> {
        Ok(())
    }

    fn socket_api_pin_state_actions_shown(&self) -> bool {
        false
    }

    fn is_dehydrated_placeholder(&self, _path: &Path) -> bool {
        false
    }

    fn create_placeholder(&self, _params: &VfsSetupParams, _item: &PlaceholderItem) -> VfsResult<()> {
        Ok(())
    }

    fn dehydrate_placeholder(
        &self,
        _params: &VfsSetupParams,
        _item: &PlaceholderItem,
    ) -> VfsResult<()> {
        Ok(())
    }
}
