//! In-memory `KeyValueStore` with fault injection

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use fieldsync_core::KeyValueStore;
use fieldsync_domain::{FieldSyncError, Result as DomainResult};

#[derive(Default)]
pub struct InMemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStore {
    /// Seed a raw value, bypassing any encoding (e.g. to simulate corruption).
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        self.raw(key).map(|raw| serde_json::from_str(&raw).unwrap())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FieldSyncError::Storage(format!("write to {key} rejected")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> DomainResult<()> {
        let mut values = self.values.lock().unwrap();
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
