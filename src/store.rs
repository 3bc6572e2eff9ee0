//! Per-device, task-keyed result storage.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::error::StoreError;
use crate::task::TaskResult;

/// Mapping from device name to result key to [`TaskResult`].
///
/// Device workers write concurrently during a dispatch, each only under its
/// own device's entry; consumers read after the dispatcher's `run` has
/// returned. A key exists only once its task completed for that device, so a
/// read of an absent key fails with [`StoreError`] instead of handing back
/// stale or empty data.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: RwLock<HashMap<String, IndexMap<String, TaskResult>>>,
}

impl ResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result` for `device` under `key`, replacing any previous run's
    /// entry for the same pair.
    pub fn put(&self, device: &str, key: &str, result: TaskResult) {
        self.write()
            .entry(device.to_string())
            .or_default()
            .insert(key.to_string(), result);
    }

    /// Fetch the result for `(device, key)`.
    ///
    /// Fails loudly when the pair was never populated; callers must not
    /// treat a missing key as an empty result.
    pub fn get(&self, device: &str, key: &str) -> Result<TaskResult, StoreError> {
        let map = self.read();
        let entries = map.get(device).ok_or_else(|| StoreError::DeviceNotFound {
            device: device.to_string(),
        })?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound {
                device: device.to_string(),
                key: key.to_string(),
            })
    }

    /// Check whether `(device, key)` has been populated.
    pub fn has_key(&self, device: &str, key: &str) -> bool {
        self.read()
            .get(device)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Names of devices with at least one recorded result.
    pub fn devices(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Result keys recorded for `device`, in completion order.
    pub fn keys(&self, device: &str) -> Vec<String> {
        self.read()
            .get(device)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, IndexMap<String, TaskResult>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, IndexMap<String, TaskResult>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
