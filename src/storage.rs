//! Persistent key/value settings.
//!
//! The device object keeps its name and instance number across restarts
//! through a [`KeyValueStore`]. Values are raw octets; callers own the
//! encoding of each key.

use std::collections::HashMap;
use std::sync::RwLock;

use log::trace;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("value for {key} is {len} octets, limit is {limit}")]
    TooLarge {
        key: &'static str,
        len: usize,
        limit: usize,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Well-known keys
pub mod keys {
    /// Device instance number, 4 octets big-endian
    pub const DEVICE_INSTANCE: &str = "device.instance";
    /// Device object name, a character set octet followed by the text
    pub const DEVICE_NAME: &str = "device.name";
}

/// Non-volatile settings
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &'static str) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &'static str, value: &[u8]) -> Result<()>;
}

/// In-memory store; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<&'static str, Vec<u8>>>,
    limit: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values longer than `limit` octets
    pub fn with_limit(limit: usize) -> Self {
        Self {
            values: RwLock::default(),
            limit: Some(limit),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &'static str) -> Result<Option<Vec<u8>>> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &'static str, value: &[u8]) -> Result<()> {
        if let Some(limit) = self.limit {
            if value.len() > limit {
                return Err(StorageError::TooLarge {
                    key,
                    len: value.len(),
                    limit,
                });
            }
        }
        trace!("store {key} = {}", crate::util::hex_dump(value));
        self.values
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?
            .insert(key, value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get(keys::DEVICE_NAME), Ok(None));
        store.set(keys::DEVICE_NAME, b"abc").unwrap();
        assert_eq!(store.get(keys::DEVICE_NAME), Ok(Some(b"abc".to_vec())));
        assert_eq!(store.get(keys::DEVICE_INSTANCE), Ok(None));
    }

    #[test]
    fn test_limit() {
        let store = MemoryKeyValueStore::with_limit(2);
        assert_eq!(
            store.set(keys::DEVICE_NAME, b"abc"),
            Err(StorageError::TooLarge {
                key: keys::DEVICE_NAME,
                len: 3,
                limit: 2
            })
        );
        assert!(store.set(keys::DEVICE_NAME, b"ab").is_ok());
    }
}
