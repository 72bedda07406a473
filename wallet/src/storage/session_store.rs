use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{WalletError, WalletResult};
use crate::storage::WalletPaths;

/// Storage key under which the last connected address is kept.
pub const SESSION_ADDRESS_KEY: &str = "stellar_publicKey";

/// Persistence for the last connected address.
///
/// Absent key means no prior session. Implementations hold a single value;
/// the browser build maps it onto `localStorage`.
pub trait SessionStore {
    fn load(&self) -> WalletResult<Option<String>>;
    fn save(&self, address: &str) -> WalletResult<()>;
    fn clear(&self) -> WalletResult<()>;
}

/// In-process store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    value: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            value: Arc::new(Mutex::new(Some(address.into()))),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> WalletResult<Option<String>> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, address: &str) -> WalletResult<()> {
        *self.value.lock() = Some(address.to_string());
        Ok(())
    }

    fn clear(&self) -> WalletResult<()> {
        *self.value.lock() = None;
        Ok(())
    }
}

/// JSON key/value file, written atomically.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn from_paths(paths: &WalletPaths) -> Self {
        Self::new(paths.session_file())
    }

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> WalletResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            WalletError::StorageError(format!("Session file is corrupt: {}", e))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> WalletResult<()> {
        let serialized = serde_json::to_vec_pretty(entries)?;
        write_atomic(&self.path, &serialized)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> WalletResult<Option<String>> {
        Ok(self.read_entries()?.remove(SESSION_ADDRESS_KEY))
    }

    fn save(&self, address: &str) -> WalletResult<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(SESSION_ADDRESS_KEY.to_string(), address.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> WalletResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        // A corrupt file is replaced rather than blocking disconnect.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(SESSION_ADDRESS_KEY);
        self.write_entries(&entries)
    }
}

/// Write through a sibling temp file and rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> WalletResult<()> {
    let tmp_path = path.with_extension("new");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}
