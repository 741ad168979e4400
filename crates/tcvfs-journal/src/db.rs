//! Journal database: explicit pin states and per-item hydration records.
//!
//! The whole journal lives in memory behind an `RwLock` and is flushed to a
//! JSON file atomically (write temp file, then rename). An in-memory journal
//! without a backing file is available for tests and ephemeral roots.
//!
//! Pin-state batches passed to [`SyncJournal::write_pin_states`] run under a
//! single write lock, so concurrent readers never observe a subtree whose
//! pins were wiped but whose new pin is not yet stored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tcvfs_core::journal::{checked_path, is_at_or_below, normalize_path, parent_path};
use tcvfs_core::{HydrationFacts, ItemType, JournalError, PinState, PinStateWriter, SyncJournal};

/// A tracked item below the sync root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_type: ItemType,
    /// Size of the remote content in bytes
    pub size: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JournalData {
    #[serde(default)]
    pin_states: BTreeMap<String, PinState>,
    #[serde(default)]
    items: BTreeMap<String, ItemRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    data: JournalData,
    dirty: bool,
    closed: bool,
}

pub struct JournalDb {
    /// JSON file backing this journal (`None` = in-memory only)
    db_path: Option<PathBuf>,
    inner: RwLock<Inner>,
}

impl JournalDb {
    /// Load or create a journal at the given path.
    /// If the file doesn't exist, starts with an empty journal.
    pub fn open(db_path: &Path) -> Result<Self> {
        let data = if db_path.exists() {
            let content = std::fs::read_to_string(db_path)
                .with_context(|| format!("reading journal: {}", db_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing journal: {}", db_path.display()))?
        } else {
            JournalData::default()
        };

        Ok(JournalDb {
            db_path: Some(db_path.to_path_buf()),
            inner: RwLock::new(Inner {
                data,
                ..Inner::default()
            }),
        })
    }

    /// A journal that is never persisted.
    pub fn in_memory() -> Self {
        JournalDb {
            db_path: None,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Record (or replace) an item at `path`. Paths that leave the sync root
    /// are refused with [`JournalError::InvalidPath`].
    pub fn record_item(&self, path: &str, item_type: ItemType, size: u64) -> Result<(), JournalError> {
        let key = checked_path(path)?;
        let mut inner = self.write()?;
        inner
            .data
            .items
            .insert(key, ItemRecord { item_type, size });
        inner.dirty = true;
        Ok(())
    }

    /// Forget the item at `path`. Items below it are kept.
    pub fn remove_item(&self, path: &str) -> Result<(), JournalError> {
        let mut inner = self.write()?;
        if inner.data.items.remove(&normalize_path(path)).is_some() {
            inner.dirty = true;
        }
        Ok(())
    }

    pub fn item(&self, path: &str) -> Result<Option<ItemRecord>, JournalError> {
        Ok(self.read()?.data.items.get(&normalize_path(path)).cloned())
    }

    /// The pin state stored on exactly `path`, ignoring ancestors.
    pub fn explicit_pin_state(&self, path: &str) -> Result<Option<PinState>, JournalError> {
        Ok(self.read()?.data.pin_states.get(&normalize_path(path)).copied())
    }

    /// Number of tracked items
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.data.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush dirty changes to disk using an atomic write (write then rename).
    pub fn flush(&self) -> Result<()> {
        let Some(db_path) = self.db_path.as_deref() else {
            return Ok(());
        };
        let mut inner = self.write()?;
        if !inner.dirty {
            return Ok(());
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating journal dir: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&inner.data).context("serializing journal")?;

        let tmp_path = db_path.with_extension("tmp");
        std::fs::write(&tmp_path, &json)
            .with_context(|| format!("writing journal temp: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, db_path)
            .with_context(|| format!("renaming journal: {}", db_path.display()))?;

        inner.dirty = false;
        Ok(())
    }

    /// Flush and refuse every later query with [`JournalError::Closed`].
    pub fn close(&self) -> Result<()> {
        self.flush()?;
        self.write()?.closed = true;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, JournalError> {
        let guard = self.inner.read().map_err(|_| JournalError::Poisoned)?;
        if guard.closed {
            return Err(JournalError::Closed);
        }
        Ok(guard)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, JournalError> {
        let guard = self.inner.write().map_err(|_| JournalError::Poisoned)?;
        if guard.closed {
            return Err(JournalError::Closed);
        }
        Ok(guard)
    }
}

impl Drop for JournalDb {
    fn drop(&mut self) {
        let dirty = self.inner.read().map(|i| i.dirty && !i.closed).unwrap_or(false);
        if dirty {
            if let Err(e) = self.flush() {
                tracing::warn!("failed to flush journal on drop: {e}");
            }
        }
    }
}

struct PinTable<'a> {
    pins: &'a mut BTreeMap<String, PinState>,
}

impl PinStateWriter for PinTable<'_> {
    fn wipe_for_path_and_below(&mut self, path: &str) {
        let path = normalize_path(path);
        self.pins.retain(|key, _| !is_at_or_below(key, &path));
    }

    fn set_for_path(&mut self, path: &str, state: PinState) {
        self.pins.insert(normalize_path(path), state);
    }
}

fn effective_in(pins: &BTreeMap<String, PinState>, path: &str) -> Option<PinState> {
    let mut cur = Some(path);
    while let Some(p) = cur {
        if let Some(state) = pins.get(p) {
            return Some(*state);
        }
        cur = parent_path(p);
    }
    None
}

impl SyncJournal for JournalDb {
    fn write_pin_states(
        &self,
        f: &mut dyn FnMut(&mut dyn PinStateWriter),
    ) -> Result<(), JournalError> {
        let mut inner = self.write()?;
        f(&mut PinTable {
            pins: &mut inner.data.pin_states,
        });
        inner.dirty = true;
        Ok(())
    }

    fn effective_pin_state(&self, path: &str) -> Result<Option<PinState>, JournalError> {
        let inner = self.read()?;
        Ok(effective_in(&inner.data.pin_states, &normalize_path(path)))
    }

    fn effective_pin_state_recursive(
        &self,
        path: &str,
    ) -> Result<Option<PinState>, JournalError> {
        // Pins below `path` are not merged into the subtree directive.
        let inner = self.read()?;
        Ok(effective_in(&inner.data.pin_states, &normalize_path(path)))
    }

    fn hydration_facts(&self, path: &str) -> Result<HydrationFacts, JournalError> {
        let path = normalize_path(path);
        let inner = self.read()?;
        let mut facts = HydrationFacts::default();
        for (key, record) in &inner.data.items {
            if !is_at_or_below(key, &path) {
                continue;
            }
            match record.item_type {
                ItemType::File => facts.has_hydrated = true,
                ItemType::VirtualFile => facts.has_dehydrated = true,
                ItemType::Directory => {}
            }
            if facts.has_hydrated && facts.has_dehydrated {
                break;
            }
        }
        Ok(facts)
    }
}
