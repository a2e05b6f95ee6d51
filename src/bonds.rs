use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::bt::BdAddr;

const BONDS_FILE_NAME: &str = "bonds.json";

/// Errors returned by the bond store.
#[derive(Debug, Error)]
pub enum BondStoreError {
    #[error("failed to access bond store")]
    Io { source: std::io::Error },
    #[error("bond store contents are invalid")]
    Parse { source: serde_json::Error },
}

/// A remembered peer and when it last connected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct BondRecord {
    address: BdAddr,
    /// Unix timestamp in seconds.
    connected_at: i64,
}

impl BondRecord {
    fn now(address: BdAddr) -> Self {
        Self {
            address,
            connected_at: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    #[must_use]
    pub fn address(&self) -> BdAddr {
        self.address
    }

    #[must_use]
    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct Bonds {
    #[serde(default)]
    ble_hid: Option<BondRecord>,
    #[serde(default)]
    classic: Option<BondRecord>,
}

#[derive(Debug)]
struct BondFile {
    path: Option<PathBuf>,
    bonds: Bonds,
}

/// Last bonded peers, shared between coordinator sessions.
#[derive(Debug, Clone)]
pub struct BondStore {
    inner: Arc<Mutex<BondFile>>,
}

impl BondStore {
    /// Loads the store from `path`, or from the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, BondStoreError> {
        let path = path.map_or_else(default_bonds_path, Path::to_path_buf);
        Self::load_from_path(path)
    }

    /// Loads the store from `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from_path(path: PathBuf) -> Result<Self, BondStoreError> {
        let bonds = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| BondStoreError::Io { source })?;
            serde_json::from_str(&raw).map_err(|source| BondStoreError::Parse { source })?
        } else {
            Bonds::default()
        };
        debug!(path = %path.display(), ?bonds, "bond store loaded");
        Ok(Self::from_file(BondFile {
            path: Some(path),
            bonds,
        }))
    }

    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_file(BondFile {
            path: None,
            bonds: Bonds::default(),
        })
    }

    #[must_use]
    pub fn last_classic_peer(&self) -> Option<BdAddr> {
        self.lock().bonds.classic.map(|record| record.address)
    }

    #[must_use]
    pub fn last_ble_hid_peer(&self) -> Option<BdAddr> {
        self.lock().bonds.ble_hid.map(|record| record.address)
    }

    /// Remembers the AVRCP peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record_classic(&self, address: BdAddr) -> Result<(), BondStoreError> {
        let mut file = self.lock();
        file.bonds.classic = Some(BondRecord::now(address));
        file.save()
    }

    /// Remembers the BLE HID peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn record_ble_hid(&self, address: BdAddr) -> Result<(), BondStoreError> {
        let mut file = self.lock();
        file.bonds.ble_hid = Some(BondRecord::now(address));
        file.save()
    }

    fn from_file(file: BondFile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BondFile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BondFile {
    fn save(&self) -> Result<(), BondStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BondStoreError::Io { source })?;
        }
        let serialised = serde_json::to_string_pretty(&self.bonds)
            .map_err(|source| BondStoreError::Parse { source })?;
        fs::write(path, serialised).map_err(|source| BondStoreError::Io { source })
    }
}

fn default_bonds_path() -> PathBuf {
    let Some(project_dirs) = ProjectDirs::from("dev", "KnobLink", "knob-link") else {
        return std::env::temp_dir()
            .join("knob-link")
            .join(BONDS_FILE_NAME);
    };
    project_dirs.data_local_dir().join(BONDS_FILE_NAME)
}
