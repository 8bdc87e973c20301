use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Error, Result};

/// Key-value store holding announcement watermarks.
pub trait WatermarkStore {
    fn get(&self, key: &str) -> Result<Option<u64>>;

    fn set(&self, key: &str, value: u64) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Best-effort durability trigger, run once a cycle is done.
    fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// Watermarks persisted as a TOML table in `<state_dir>/watermarks.toml`.
pub struct FileWatermarkStore {
    state_dir: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn state_file(&self) -> PathBuf {
        self.state_dir.join("watermarks.toml")
    }

    fn load(&self) -> Result<BTreeMap<String, u64>> {
        let path = self.state_file();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::State(format!("failed to read {}: {e}", path.display())))?;
        // Corrupted state is an error, never a reset to zero.
        toml::from_str(&content)
            .map_err(|e| Error::State(format!("corrupted state file {}: {e}", path.display())))
    }

    fn save(&self, table: &BTreeMap<String, u64>) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir)
            .map_err(|e| Error::State(format!("failed to create state dir: {e}")))?;

        let content = toml::to_string_pretty(table)
            .map_err(|e| Error::State(format!("failed to serialize watermarks: {e}")))?;

        let tmp = self.state_dir.join("watermarks.toml.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| Error::State(format!("failed to write state file: {e}")))?;
        std::fs::rename(&tmp, self.state_file())
            .map_err(|e| Error::State(format!("failed to replace state file: {e}")))?;

        Ok(())
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn get(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.load()?.get(key).copied())
    }

    fn set(&self, key: &str, value: u64) -> Result<()> {
        let mut table = self.load()?;
        table.insert(key.to_string(), value);
        self.save(&table)
    }

    fn persist(&self) -> Result<()> {
        let path = self.state_file();
        if !path.exists() {
            return Ok(());
        }
        File::open(&path)
            .and_then(|f| f.sync_all())
            .map_err(|e| Error::State(format!("failed to sync {}: {e}", path.display())))?;
        sync_dir(&self.state_dir);
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!("failed to sync state dir {}: {e}", dir.display());
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Read the watermark under `key`, initializing it to 0 when absent.
pub fn load_or_init<S: WatermarkStore + ?Sized>(store: &S, key: &str) -> Result<u64> {
    if !store.exists(key)? {
        store.set(key, 0)?;
        return Ok(0);
    }
    Ok(store.get(key)?.unwrap_or(0))
}
