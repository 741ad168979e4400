use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtualization mode of a sync root.
///
/// The strings returned by [`Mode::as_str`] are written to config files and
/// must never change once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// No virtualization: every file is kept locally
    Off,
    /// Placeholders are suffix-renamed stub files (`name.tc`)
    WithSuffix,
    /// Placeholders are managed by the Windows Cloud Files API
    WindowsCfApi,
}

impl Mode {
    /// Modes eligible for automatic selection, most preferred first.
    pub const PREFERENCE: [Mode; 2] = [Mode::WindowsCfApi, Mode::WithSuffix];

    /// Every mode, in declaration order.
    pub const ALL: [Mode; 3] = [Mode::Off, Mode::WithSuffix, Mode::WindowsCfApi];

    /// Stable config identifier for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::WithSuffix => "suffix",
            Mode::WindowsCfApi => "wincfapi",
        }
    }

    /// Parse a config identifier. Unknown strings yield `None`, never a default.
    pub fn from_config_str(s: &str) -> Option<Mode> {
        match s {
            "off" => Some(Mode::Off),
            "suffix" => Some(Mode::WithSuffix),
            "wincfapi" => Some(Mode::WindowsCfApi),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pin directive stored per path in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinState {
    /// No explicit directive; resolved from the nearest ancestor
    Inherited,
    /// Content must stay hydrated
    AlwaysLocal,
    /// Content must stay dehydrated
    OnlineOnly,
}

impl PinState {
    pub fn as_str(self) -> &'static str {
        match self {
            PinState::Inherited => "inherited",
            PinState::AlwaysLocal => "always-local",
            PinState::OnlineOnly => "online-only",
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of item recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    /// Regular file with local content (hydrated)
    File,
    /// Placeholder without local content (dehydrated)
    VirtualFile,
    Directory,
}

/// Whether a subtree contains hydrated and/or dehydrated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationFacts {
    pub has_hydrated: bool,
    pub has_dehydrated: bool,
}

/// User-facing availability of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VfsItemAvailability {
    /// Everything is hydrated, without an always-local pin
    AllHydrated,
    /// Everything is dehydrated, without an online-only pin
    AllDehydrated,
    /// Hydrated and dehydrated files both exist below the path
    Mixed,
    /// Everything is dehydrated because the subtree is pinned online-only
    OnlineOnly,
    /// Everything is hydrated because the subtree is pinned always-local
    AlwaysLocal,
}

impl fmt::Display for VfsItemAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VfsItemAvailability::AllHydrated => "all hydrated",
            VfsItemAvailability::AllDehydrated => "all dehydrated",
            VfsItemAvailability::Mixed => "mixed",
            VfsItemAvailability::OnlineOnly => "online only",
            VfsItemAvailability::AlwaysLocal => "always local",
        };
        f.write_str(s)
    }
}

/// Why an availability query could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AvailabilityError {
    /// The journal could not report hydration facts
    #[error("journal error while reading hydration state")]
    DbError,
    /// Nothing at or below the path is tracked
    #[error("no such item")]
    NoSuchItem,
}

pub type AvailabilityResult = Result<VfsItemAvailability, AvailabilityError>;
