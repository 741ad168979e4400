//! Pre-flight checks before virtualization is enabled on a sync root.
//!
//! Native placeholder APIs put requirements on the volume holding the sync
//! root. These checks run before any backend is started and never modify
//! anything.

use std::io;
use std::path::Path;

use tcvfs_core::Mode;
use thiserror::Error;

/// The only filesystem the Cloud Files API supports.
pub const CFAPI_FILESYSTEM: &str = "NTFS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeasibilityError {
    #[error("The virtual filesystem feature does not support a drive as sync root")]
    DriveRoot,

    #[error("The virtual filesystem feature requires a NTFS file system, {path} is using {filesystem}")]
    UnsupportedFilesystem { path: String, filesystem: String },

    #[error("The virtual filesystem feature is not supported on network drives")]
    NetworkDrive,

    #[error("Could not inspect the volume of {path}: {reason}")]
    Probe { path: String, reason: String },
}

/// Facts about the volume holding a path.
pub trait VolumeProbe {
    /// Whether `path` resolves to the root of a volume (e.g. `C:\`).
    fn is_volume_root(&self, path: &Path) -> bool;

    /// Name of the filesystem backing `path` (e.g. `NTFS`, `FAT32`).
    fn filesystem_name(&self, path: &Path) -> io::Result<String>;

    /// Whether the volume holding `path` is mounted over the network.
    fn is_network_drive(&self, path: &Path) -> bool;
}

/// Check that `mode` can be enabled on `root` using the facts from `probe`.
pub fn check_feasibility_with(
    probe: &dyn VolumeProbe,
    mode: Mode,
    root: &Path,
) -> Result<(), FeasibilityError> {
    match mode {
        Mode::Off | Mode::WithSuffix => return Ok(()),
        Mode::WindowsCfApi => {}
    }

    if probe.is_volume_root(root) {
        return Err(FeasibilityError::DriveRoot);
    }

    let filesystem = probe
        .filesystem_name(root)
        .map_err(|e| FeasibilityError::Probe {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
    if filesystem != CFAPI_FILESYSTEM {
        return Err(FeasibilityError::UnsupportedFilesystem {
            path: root.display().to_string(),
            filesystem,
        });
    }

    if probe.is_network_drive(root) {
        return Err(FeasibilityError::NetworkDrive);
    }

    Ok(())
}

/// Check that `mode` can be enabled on `root` on this machine.
///
/// Platforms without a native placeholder backend have nothing to check.
pub fn check_feasibility(mode: Mode, root: &Path) -> Result<(), FeasibilityError> {
    #[cfg(target_os = "windows")]
    {
        check_feasibility_with(&windows_probe::WindowsVolumeProbe, mode, root)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = (mode, root);
        Ok(())
    }
}

#[cfg(target_os = "windows")]
pub use windows_probe::WindowsVolumeProbe;

#[cfg(target_os = "windows")]
mod windows_probe {
    use std::io;
    use std::path::Path;

    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Storage::FileSystem::{
        GetDriveTypeW, GetVolumeInformationW, GetVolumePathNameW,
    };

    use super::VolumeProbe;

    // winbase.h
    const DRIVE_REMOTE: u32 = 4;
    const MAX_PATH: usize = 260;

    /// Volume facts from the Win32 volume management API.
    pub struct WindowsVolumeProbe;

    /// NUL-terminated mount point (e.g. `C:\`) of the volume holding `path`.
    fn volume_path_name(path: &Path) -> io::Result<Vec<u16>> {
        let mut buf = vec![0u16; MAX_PATH + 1];
        let name = HSTRING::from(path.as_os_str());
        unsafe { GetVolumePathNameW(&name, &mut buf) }?;
        Ok(buf)
    }

    fn utf16_until_nul(buf: &[u16]) -> String {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }

    impl VolumeProbe for WindowsVolumeProbe {
        fn is_volume_root(&self, path: &Path) -> bool {
            let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            canonical.parent().is_none()
        }

        fn filesystem_name(&self, path: &Path) -> io::Result<String> {
            let root = volume_path_name(path)?;
            let mut fs_name = vec![0u16; MAX_PATH + 1];
            unsafe {
                GetVolumeInformationW(
                    PCWSTR(root.as_ptr()),
                    None,
                    None,
                    None,
                    None,
                    Some(&mut fs_name),
                )
            }?;
            Ok(utf16_until_nul(&fs_name))
        }

        fn is_network_drive(&self, path: &Path) -> bool {
            match volume_path_name(path) {
                Ok(root) => unsafe { GetDriveTypeW(PCWSTR(root.as_ptr())) == DRIVE_REMOTE },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "volume lookup failed: {e}");
                    false
                }
            }
        }
    }
}
