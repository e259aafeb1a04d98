// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! ConfigStore: atomic persistence of the small opaque blobs kept per DC.
//!
//! Two blobs are persisted for every datacenter: [`DcConfigBlob`] (address
//! lists, auth keys, salts, versioning) and [`RotationCursor`] (the current
//! address/port rotation position). Neither the caller nor the store itself
//! interprets the blob contents beyond the fields needed to serialize them;
//! the store's only job is making writes durable and atomic, so a crash
//! mid-write never leaves a half-written file behind. [`FileConfigStore`]
//! does this the way `rustgram-file-loader-utils::atomic_write` persists
//! downloaded files: write to a temp file in the same directory, flush, then
//! `rename` over the target.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A persisted server salt: `{ valid_since, valid_until, salt }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSalt {
    /// Start of the salt's validity window (server time, seconds).
    pub valid_since: i32,
    /// End of the salt's validity window (exclusive).
    pub valid_until: i32,
    /// The salt value itself.
    pub salt: i64,
}

/// A persisted auth key: the raw key bytes and the 64-bit key id derived
/// from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAuthKey {
    /// Key id (low 64 bits of `sha1(auth_key)`).
    pub id: i64,
    /// Raw 2048-bit key.
    pub key: Vec<u8>,
}

/// The four address lists a DC's connectivity is rotated across.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLists {
    /// IPv4 addresses for ordinary traffic.
    pub ipv4: Vec<String>,
    /// IPv6 addresses for ordinary traffic.
    pub ipv6: Vec<String>,
    /// IPv4 addresses for media/download traffic.
    pub ipv4_download: Vec<String>,
    /// IPv6 addresses for media/download traffic.
    pub ipv6_download: Vec<String>,
}

/// Everything persisted about one datacenter, opaque to everyone but the
/// code that reads and writes it.
///
/// Written atomically by [`ConfigStore::save_dc`]; never partially visible
/// to a reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcConfigBlob {
    /// Version tag of the `config` TL object this blob was last built from.
    pub config_version_tag: i32,
    /// The datacenter this blob belongs to.
    pub dc_id: i32,
    /// Last `config.this_dc_api_port`-style init version seen, non-media.
    pub last_init_version: i32,
    /// Last init version seen for the media connection.
    pub last_init_media_version: i32,
    /// Address lists this DC can be reached at.
    pub addresses: AddressLists,
    /// Whether this DC is a CDN edge (no authorization required).
    pub is_cdn: bool,
    /// The permanent, user-bound auth key, once established.
    pub perm_auth_key: Option<PersistedAuthKey>,
    /// The PFS temporary auth key currently bound to the permanent one.
    pub temp_auth_key: Option<PersistedAuthKey>,
    /// Whether the permanent key has completed `auth.bindTempAuthKey`.
    pub authorized: bool,
    /// Known-good server salts, ordered by `valid_since`.
    pub salts: Vec<PersistedSalt>,
}

/// The address/port rotation cursors for one DC's four address lists, plus
/// their default-port indices. Nine `i32`s: `(addr_idx, port_idx)` for each
/// of `ipv4`/`ipv6`/`ipv4_download`/`ipv6_download`, plus a flags word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCursor {
    pub ipv4_addr_idx: i32,
    pub ipv4_port_idx: i32,
    pub ipv6_addr_idx: i32,
    pub ipv6_port_idx: i32,
    pub ipv4_download_addr_idx: i32,
    pub ipv4_download_port_idx: i32,
    pub ipv6_download_addr_idx: i32,
    pub ipv6_download_port_idx: i32,
    /// Bit flags reserved for future rotation state (e.g. "used temp list").
    pub flags: i32,
}

/// Atomic read/write access to the two per-DC blobs.
///
/// Implementations must guarantee that a reader never observes a partially
/// written blob, even if the process is killed mid-write.
pub trait ConfigStore: Send + Sync {
    /// Loads the config blob for `dc_id`, or `None` if never written.
    fn load_dc(&self, dc_id: i32) -> Result<Option<DcConfigBlob>>;

    /// Atomically overwrites the config blob for `dc_id`.
    fn save_dc(&self, dc_id: i32, blob: &DcConfigBlob) -> Result<()>;

    /// Loads the rotation cursor for `dc_id`, or `None` if never written.
    fn load_rotation_cursor(&self, dc_id: i32) -> Result<Option<RotationCursor>>;

    /// Atomically overwrites the rotation cursor for `dc_id`.
    fn save_rotation_cursor(&self, dc_id: i32, cursor: &RotationCursor) -> Result<()>;
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ConfigError::invalid_config("config store path has no parent directory"))?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer(&mut temp, value)
        .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|e| ConfigError::IoError(e.error))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::IoError(e)),
    }
}

/// A [`ConfigStore`] backed by one JSON file per blob under a base
/// directory, written with temp-file-then-rename atomicity.
///
/// # Examples
///
/// ```no_run
/// use rustgram_config::{ConfigStore, DcConfigBlob, FileConfigStore};
///
/// let store = FileConfigStore::new("/tmp/rustgram-config");
/// let blob = DcConfigBlob { dc_id: 2, ..Default::default() };
/// store.save_dc(2, &blob).unwrap();
/// assert_eq!(store.load_dc(2).unwrap(), Some(blob));
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    base_dir: PathBuf,
}

impl FileConfigStore {
    /// Creates a store rooted at `base_dir`. The directory is created lazily
    /// on first write, not at construction time.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn dc_path(&self, dc_id: i32) -> PathBuf {
        self.base_dir.join(format!("dc{dc_id}.json"))
    }

    fn cursor_path(&self, dc_id: i32) -> PathBuf {
        self.base_dir.join(format!("dc{dc_id}.cursor.json"))
    }
}

impl ConfigStore for FileConfigStore {
    fn load_dc(&self, dc_id: i32) -> Result<Option<DcConfigBlob>> {
        read_json(&self.dc_path(dc_id))
    }

    fn save_dc(&self, dc_id: i32, blob: &DcConfigBlob) -> Result<()> {
        atomic_write_json(&self.dc_path(dc_id), blob)
    }

    fn load_rotation_cursor(&self, dc_id: i32) -> Result<Option<RotationCursor>> {
        read_json(&self.cursor_path(dc_id))
    }

    fn save_rotation_cursor(&self, dc_id: i32, cursor: &RotationCursor) -> Result<()> {
        atomic_write_json(&self.cursor_path(dc_id), cursor)
    }
}

/// An in-memory [`ConfigStore`], for tests and for hosts that don't want
/// cross-restart persistence.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    dcs: Mutex<HashMap<i32, DcConfigBlob>>,
    cursors: Mutex<HashMap<i32, RotationCursor>>,
}

impl MemoryConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_dc(&self, dc_id: i32) -> Result<Option<DcConfigBlob>> {
        Ok(self.dcs.lock().unwrap_or_else(|e| e.into_inner()).get(&dc_id).cloned())
    }

    fn save_dc(&self, dc_id: i32, blob: &DcConfigBlob) -> Result<()> {
        self.dcs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dc_id, blob.clone());
        Ok(())
    }

    fn load_rotation_cursor(&self, dc_id: i32) -> Result<Option<RotationCursor>> {
        Ok(self
            .cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&dc_id)
            .copied())
    }

    fn save_rotation_cursor(&self, dc_id: i32, cursor: &RotationCursor) -> Result<()> {
        self.cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dc_id, *cursor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn memory_store_round_trips_dc_blob() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.load_dc(2).unwrap(), None);

        let blob = DcConfigBlob {
            config_version_tag: 7,
            dc_id: 2,
            is_cdn: false,
            authorized: true,
            salts: vec![PersistedSalt {
                valid_since: 100,
                valid_until: 400,
                salt: -1,
            }],
            ..Default::default()
        };
        store.save_dc(2, &blob).unwrap();
        assert_eq!(store.load_dc(2).unwrap(), Some(blob));
    }

    #[test]
    fn memory_store_round_trips_rotation_cursor() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.load_rotation_cursor(4).unwrap(), None);

        let cursor = RotationCursor {
            ipv4_addr_idx: 1,
            ipv4_port_idx: 2,
            ..Default::default()
        };
        store.save_rotation_cursor(4, &cursor).unwrap();
        assert_eq!(store.load_rotation_cursor(4).unwrap(), Some(cursor));
    }

    #[test]
    fn file_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());

        let blob = DcConfigBlob {
            dc_id: 5,
            perm_auth_key: Some(PersistedAuthKey {
                id: 42,
                key: vec![1, 2, 3],
            }),
            ..Default::default()
        };
        store.save_dc(5, &blob).unwrap();

        // A second handle to the same directory sees the write.
        let reopened = FileConfigStore::new(dir.path());
        assert_eq!(reopened.load_dc(5).unwrap(), Some(blob));
    }

    #[test]
    fn file_store_missing_blob_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        assert_eq!(store.load_dc(99).unwrap(), None);
        assert_eq!(store.load_rotation_cursor(99).unwrap(), None);
    }

    #[test]
    fn save_never_leaves_a_partial_file_visible() {
        // A corrupt pre-existing temp file in the target directory must not
        // affect reads of the real blob path.
        let dir = tempfile::tempdir().unwrap();
        let mut stray = fs::File::create(dir.path().join("stray.tmp")).unwrap();
        stray.write_all(b"not json").unwrap();

        let store = FileConfigStore::new(dir.path());
        store.save_dc(2, &DcConfigBlob::default()).unwrap();
        assert_eq!(store.load_dc(2).unwrap(), Some(DcConfigBlob::default()));
    }
}
