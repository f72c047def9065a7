use super::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, warn};

/// On-disk record for a single key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    key: String,
    value: String,
    written_at: DateTime<Utc>,
}

/// Persistent store backed by one file per key
///
/// Layout:
/// - `<root>/<origin>/ab/cd1234....json` - sha256 of the key, first 2 hex chars = subdir
///
/// Each origin gets its own directory, so two origins never see each other's keys.
/// The key itself is kept inside the record so [`KeyValueStore::keys`] can list it.
pub struct FilesystemStore {
    origin_dir: PathBuf,
}

impl FilesystemStore {
    /// Open (creating if needed) the store for `origin` under `root`
    pub fn new<P: AsRef<Path>>(root: P, origin: &str) -> Result<Self, StoreError> {
        let origin_dir = root.as_ref().join(origin);
        fs::create_dir_all(&origin_dir).map_err(|e| {
            StoreError::Unavailable(format!(
                "cannot create store directory {}: {}",
                origin_dir.display(),
                e
            ))
        })?;

        debug!(origin_dir = %origin_dir.display(), "opened filesystem store");
        Ok(Self { origin_dir })
    }

    pub fn origin_dir(&self) -> &Path {
        &self.origin_dir
    }

    /// Time the value under `key` was last written
    pub fn written_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read_record(key)?.map(|record| record.written_at))
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let hex_id = hex::encode(Sha256::digest(key.as_bytes()));
        let (prefix, suffix) = hex_id.split_at(2);
        self.origin_dir.join(prefix).join(format!("{}.json", suffix))
    }

    fn read_record(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let path = self.key_to_path(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<StoredValue>(&data) {
            Ok(record) if record.key == key => Ok(Some(record)),
            Ok(_) => Ok(None),
            Err(e) => {
                // Damaged record: drop it so the key reads as absent
                warn!(path = %path.display(), error = %e, "discarding unreadable store record");
                match fs::remove_file(&path) {
                    Ok(()) => Ok(None),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        if !self.origin_dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store directory missing: {}",
                self.origin_dir.display()
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for FilesystemStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_root()?;
        Ok(self.read_record(key)?.map(|record| record.value))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_root()?;
        let path = self.key_to_path(key);

        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Unavailable(format!("invalid path {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let record = StoredValue {
            key: key.to_string(),
            value: value.to_string(),
            written_at: Utc::now(),
        };
        let data = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        // Write atomically (temp file, then rename)
        // PID + thread ID keeps concurrent writers apart
        let temp_path = parent.join(format!(
            "{}.tmp.{}.{:?}",
            hex::encode(Sha256::digest(key.as_bytes())),
            std::process::id(),
            thread::current().id()
        ));

        let result = fs::File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.ensure_root()?;
        match fs::remove_file(self.key_to_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_root()?;
        let mut keys = Vec::new();

        for shard in fs::read_dir(&self.origin_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }

            for entry in fs::read_dir(shard.path())? {
                let path = entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }

                let Ok(data) = fs::read_to_string(&path) else {
                    continue;
                };
                if let Ok(record) = serde_json::from_str::<StoredValue>(&data) {
                    keys.push(record.key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
