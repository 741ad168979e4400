//! Portable backend: dehydrated files are small `.tc` stub files next to
//! where the real file would be.
//!
//! Stub format (UTF-8, Unix newlines, `version` first, remaining keys sorted):
//! ```text
//! version https://tummycrypt.io/tcvfs/v1
//! oid blake3:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e239
//! origin /Documents/report.pdf
//! size 94371840
//! ```
//!
//! Unknown keys are ignored so newer writers stay readable.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use tcvfs_core::journal::checked_path;
use tcvfs_core::{Mode, VfsError, VfsResult};
use tracing::debug;

use crate::controller::{PlaceholderItem, VfsBackend, VfsSetupParams};

/// Version string for all stubs
pub const STUB_VERSION: &str = "https://tummycrypt.io/tcvfs/v1";

/// Suffix appended to the real file name
pub const STUB_SUFFIX: &str = ".tc";

/// Stubs larger than this are not stubs.
const MAX_STUB_LEN: u64 = 2048;

/// Metadata stored in a stub file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubMeta {
    /// Content identity, e.g. `blake3:{hex}`
    pub oid: String,
    /// Remote path of the file
    pub origin: String,
    /// True file size in bytes
    pub size: u64,
}

impl StubMeta {
    pub fn parse(content: &str) -> Result<Self> {
        let mut oid = None;
        let mut origin = None;
        let mut size = None;
        let mut found_version = false;

        for (lineno, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(' ')
                .with_context(|| format!("line {}: no space separator: {:?}", lineno + 1, line))?;

            match key {
                "version" => {
                    if lineno != 0 {
                        anyhow::bail!("version must be the first line");
                    }
                    if value != STUB_VERSION {
                        anyhow::bail!("unsupported stub version: {}", value);
                    }
                    found_version = true;
                }
                "oid" => oid = Some(value.to_string()),
                "origin" => origin = Some(value.to_string()),
                "size" => {
                    size = Some(
                        value
                            .parse::<u64>()
                            .with_context(|| format!("invalid size: {}", value))?,
                    );
                }
                _ => {}
            }
        }

        anyhow::ensure!(found_version, "missing version line");

        Ok(StubMeta {
            oid: oid.context("missing oid field")?,
            origin: origin.context("missing origin field")?,
            size: size.context("missing size field")?,
        })
    }

    pub fn to_stub_string(&self) -> String {
        format!(
            "version {STUB_VERSION}\noid {}\norigin {}\nsize {}\n",
            self.oid, self.origin, self.size
        )
    }

    fn for_item(params: &VfsSetupParams, item: &PlaceholderItem) -> Self {
        StubMeta {
            oid: item.content_id.clone(),
            origin: format!("{}/{}", params.remote_path.trim_end_matches('/'), item.path),
            size: item.size,
        }
    }
}

/// Real path of `rel` under the sync root. Paths that would leave the root
/// are refused.
fn local_path(root: &Path, rel: &str) -> VfsResult<PathBuf> {
    let rel = checked_path(rel).map_err(|e| VfsError::Backend(e.to_string()))?;
    Ok(rel
        .split('/')
        .filter(|seg| !seg.is_empty())
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg)))
}

/// Stub path for a real path: `main.go` → `main.go.tc`
pub fn stub_path(real: &Path) -> PathBuf {
    let mut s = real.as_os_str().to_os_string();
    s.push(STUB_SUFFIX);
    PathBuf::from(s)
}

/// Read the stub at `path`; `None` if it is not a readable stub.
pub fn read_stub(path: &Path) -> Option<StubMeta> {
    if !path.to_str()?.ends_with(STUB_SUFFIX) {
        return None;
    }
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() || meta.len() > MAX_STUB_LEN {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    StubMeta::parse(&content).ok()
}

#[derive(Debug, Default)]
pub struct SuffixVfs;

impl SuffixVfs {
    pub fn new() -> Self {
        SuffixVfs
    }

    pub(crate) fn boxed() -> Box<dyn VfsBackend> {
        Box::new(SuffixVfs::new())
    }

    fn write_stub(params: &VfsSetupParams, item: &PlaceholderItem) -> VfsResult<PathBuf> {
        let real = local_path(&params.filesystem_path, &item.path)?;
        let stub = stub_path(&real);
        if let Some(parent) = stub.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a half-written stub is never observed.
        let tmp = stub.with_extension("tc.tmp");
        fs::write(&tmp, StubMeta::for_item(params, item).to_stub_string())?;
        fs::rename(&tmp, &stub)?;
        Ok(stub)
    }
}

impl VfsBackend for SuffixVfs {
    fn mode(&self) -> Mode {
        Mode::WithSuffix
    }

    fn file_suffix(&self) -> &str {
        STUB_SUFFIX
    }

    fn start(&mut self, params: &VfsSetupParams) -> VfsResult<()> {
        if !params.filesystem_path.is_dir() {
            return Err(VfsError::Backend(format!(
                "sync root is not a directory: {}",
                params.filesystem_path.display()
            )));
        }
        Ok(())
    }

    fn socket_api_pin_state_actions_shown(&self) -> bool {
        true
    }

    fn is_dehydrated_placeholder(&self, path: &Path) -> bool {
        read_stub(path).is_some()
    }

    fn create_placeholder(&self, params: &VfsSetupParams, item: &PlaceholderItem) -> VfsResult<()> {
        let stub = Self::write_stub(params, item)?;
        debug!(path = %item.path, stub = %stub.display(), "created placeholder");
        Ok(())
    }

    fn dehydrate_placeholder(
        &self,
        params: &VfsSetupParams,
        item: &PlaceholderItem,
    ) -> VfsResult<()> {
        let real = local_path(&params.filesystem_path, &item.path)?;
        if !real.is_file() {
            return Err(VfsError::Backend(format!(
                "cannot dehydrate {}: not a hydrated file",
                item.path
            )));
        }

        Self::write_stub(params, item)?;
        fs::remove_file(&real)?;
        debug!(path = %item.path, "dehydrated placeholder");
        Ok(())
    }
}
