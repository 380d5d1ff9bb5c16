use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Durable key-value contract consumed by the history store. Values are
/// opaque serialized blobs; callers own the (de)serialization.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError>;
}

/// Directory holding ironlog's durable files.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    Ok(dirs::data_dir().ok_or(StorageError::NoDataDir)?.join("ironlog"))
}

/// File-backed store keeping one JSON file per key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(default_data_dir()?)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        Ok(fs::write(self.path_for(key), blob)?)
    }
}

/// Ephemeral store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .map
            .lock()
            .expect("memory store lock poisoned")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.map
            .lock()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Dates cross the storage boundary as an explicit tagged wrapper
/// (`{"$type": "datetime", "value": <RFC 3339>}`) and are revived to native
/// datetimes on read, so round-trips are exact no matter what the storage
/// medium natively supports.
pub mod tagged_date {
    use chrono::{DateTime, Local};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const KIND: &str = "datetime";

    #[derive(Serialize, Deserialize)]
    struct Tagged {
        #[serde(rename = "$type")]
        kind: String,
        value: String,
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Local>, ser: S) -> Result<S::Ok, S::Error> {
        Tagged {
            kind: KIND.to_string(),
            value: date.to_rfc3339(),
        }
        .serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Local>, D::Error> {
        let tagged = Tagged::deserialize(de)?;
        if tagged.kind != KIND {
            return Err(D::Error::custom(format!(
                "expected a {KIND} wrapper, got {}",
                tagged.kind
            )));
        }
        DateTime::parse_from_rfc3339(&tagged.value)
            .map(|date| date.with_timezone(&Local))
            .map_err(D::Error::custom)
    }
}
