use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::Mode;

/// Top-level configuration (loaded from tcvfs.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TcvfsConfig {
    pub vfs: VfsConfig,
    pub journal: JournalConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Virtualization mode: "off", "suffix" or "wincfapi" (unset = no mode selected)
    pub mode: Option<String>,
    /// Local directory that is synchronized
    pub sync_root: PathBuf,
    /// Remote folder the sync root mirrors
    pub remote_path: String,
    /// Name shown by the platform shell for the sync root
    pub display_name: String,
    /// Provider name registered with native placeholder APIs
    pub provider_name: String,
}

impl VfsConfig {
    /// Parsed mode. Unknown strings are reported and treated as unset.
    pub fn mode(&self) -> Option<Mode> {
        let raw = self.mode.as_deref()?;
        let mode = Mode::from_config_str(raw);
        if mode.is_none() {
            tracing::warn!(mode = %raw, "unrecognized vfs mode in config");
        }
        mode
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// JSON journal path (pin states + item records)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            mode: None,
            sync_root: PathBuf::from("~/tcvfs"),
            remote_path: "/".into(),
            display_name: "tcvfs".into(),
            provider_name: "tcvfs".into(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/tcvfs/journal.json"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
