//! Persisted boolean preferences keyed by string (expansion memory).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{InspectorError, Result};

/// Opaque key-value store for fold state that outlives the process
pub trait PrefsStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&mut self, key: &str, value: bool);
    /// Drop every key starting with `prefix`
    fn remove_prefix(&mut self, prefix: &str);
    /// Persist pending changes
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory store; state is lost on exit
#[derive(Default, Debug)]
pub struct MemoryPrefs {
    values: HashMap<String, bool>,
}

impl PrefsStore for MemoryPrefs {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), value);
    }

    fn remove_prefix(&mut self, prefix: &str) {
        self.values.retain(|k, _| !k.starts_with(prefix));
    }
}

/// JSON-file backed store. Loaded eagerly; written by [`JsonPrefs::flush`].
#[derive(Debug)]
pub struct JsonPrefs {
    path: PathBuf,
    values: BTreeMap<String, bool>,
    dirty: bool,
}

impl JsonPrefs {
    /// `~/.gantry/prefs.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gantry").join("prefs.json"))
    }

    /// Open the store at the default location
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().ok_or(InspectorError::NoHomeDirectory)?;
        Ok(Self::open(path))
    }

    /// Open the store at `path`; a missing or unreadable file yields an empty store
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, bool>>(&content) {
                Ok(values) => {
                    info!("Loaded {} inspector prefs from {:?}", values.len(), path);
                    values
                }
                Err(e) => {
                    warn!("Failed to parse prefs file {:?}: {}. Starting empty.", path, e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, values, dirty: false }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes to disk
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)?;
        self.dirty = false;
        Ok(())
    }
}

impl PrefsStore for JsonPrefs {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        if self.values.insert(key.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn remove_prefix(&mut self, prefix: &str) {
        let before = self.values.len();
        self.values.retain(|k, _| !k.starts_with(prefix));
        if self.values.len() != before {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<()> {
        JsonPrefs::flush(self)
    }
}
