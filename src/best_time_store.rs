use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{BEST_TIME_KEY, BEST_TIME_STORE_VERSION};

/// Where a session reads its best time at startup and writes new records.
/// Implementations must not fail the caller; persistence is best-effort.
pub trait BestTimeStore {
    fn load(&self) -> Option<u64>;
    fn save(&mut self, best_ms: u64);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBestTimeStore {
    best_ms: Option<u64>,
    writes: usize,
}

impl MemoryBestTimeStore {
    pub fn with_best(best_ms: u64) -> Self {
        Self {
            best_ms: Some(best_ms),
            writes: 0,
        }
    }

    pub fn best_ms(&self) -> Option<u64> {
        self.best_ms
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl BestTimeStore for MemoryBestTimeStore {
    fn load(&self) -> Option<u64> {
        self.best_ms
    }

    fn save(&mut self, best_ms: u64) {
        self.best_ms = Some(best_ms);
        self.writes += 1;
    }
}

impl<S: BestTimeStore> BestTimeStore for Arc<Mutex<S>> {
    fn load(&self) -> Option<u64> {
        self.lock().unwrap_or_else(PoisonError::into_inner).load()
    }

    fn save(&mut self, best_ms: u64) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .save(best_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredBestTime {
    #[serde(rename = "bestMs", alias = "best_ms")]
    best_ms: u64,
    #[serde(rename = "updatedAt", alias = "updated_at", default)]
    updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
struct BestTimeFile<'a> {
    version: u8,
    entries: &'a BTreeMap<String, StoredBestTime>,
}

#[derive(Clone, Debug, Deserialize)]
struct BestTimeFileRaw {
    version: u8,
    entries: BTreeMap<String, serde_json::Value>,
}

/// JSON file holding best times under named keys. The file is read once on
/// construction; every new record rewrites it.
#[derive(Debug)]
pub struct FileBestTimeStore {
    file_path: PathBuf,
    key: String,
    entries: BTreeMap<String, StoredBestTime>,
}

impl FileBestTimeStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self::with_key(file_path, BEST_TIME_KEY)
    }

    pub fn with_key(file_path: PathBuf, key: &str) -> Self {
        let entries = load_entries(&file_path);
        Self {
            file_path,
            key: key.to_string(),
            entries,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write(&self) {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(error) = fs::create_dir_all(parent) {
                    tracing::warn!(
                        path = %parent.display(),
                        %error,
                        "best-time store: failed to create parent dir"
                    );
                    return;
                }
            }
        }

        let payload = BestTimeFile {
            version: BEST_TIME_STORE_VERSION,
            entries: &self.entries,
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    tracing::warn!(
                        path = %self.file_path.display(),
                        %error,
                        "best-time store: failed to write"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.file_path.display(),
                    %error,
                    "best-time store: failed to serialize payload"
                );
            }
        }
    }
}

impl BestTimeStore for FileBestTimeStore {
    fn load(&self) -> Option<u64> {
        self.entries.get(&self.key).map(|entry| entry.best_ms)
    }

    fn save(&mut self, best_ms: u64) {
        self.entries.insert(
            self.key.clone(),
            StoredBestTime {
                best_ms,
                updated_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            },
        );
        self.write();
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, StoredBestTime> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %error, "best-time store: failed to read");
            }
            return BTreeMap::new();
        }
    };

    // A bare number is the browser-storage format: milliseconds, 0 meaning unset.
    if let Ok(legacy) = text.trim().parse::<u64>() {
        let mut entries = BTreeMap::new();
        if legacy > 0 {
            entries.insert(
                BEST_TIME_KEY.to_string(),
                StoredBestTime {
                    best_ms: legacy,
                    updated_at: None,
                },
            );
        }
        return entries;
    }

    let parsed = match serde_json::from_str::<BestTimeFileRaw>(&text) {
        Ok(value) if value.version == BEST_TIME_STORE_VERSION => value,
        Ok(value) => {
            tracing::warn!(
                path = %path.display(),
                version = value.version,
                "best-time store: unsupported version"
            );
            return BTreeMap::new();
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "best-time store: failed to parse");
            return BTreeMap::new();
        }
    };

    let mut entries = BTreeMap::new();
    for (key, raw_value) in parsed.entries {
        match serde_json::from_value::<StoredBestTime>(raw_value) {
            Ok(entry) if entry.best_ms == 0 => {
                tracing::debug!(key = %key, "best-time store: zero entry treated as unset");
            }
            Ok(entry) => {
                entries.insert(key, entry);
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    key = %key,
                    %error,
                    "best-time store: skipping invalid entry"
                );
            }
        }
    }
    entries
}
