//! In-process object store.
//!
//! Backs the engine's test suites: it records every mutating call and can
//! be told to fail specific keys.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::{write_local_atomically, ObjectStore, ObjectSummary};
use crate::error::{io_err, StoreError};
use crate::hasher::hash_bytes;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    objects: RefCell<BTreeMap<String, StoredObject>>,
    failing_keys: RefCell<BTreeSet<String>>,
    failing_prefixes: RefCell<BTreeSet<String>>,
    report_etags: bool,
    mutations: Cell<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory://bucket")
    }
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RefCell::new(BTreeMap::new()),
            failing_keys: RefCell::new(BTreeSet::new()),
            failing_prefixes: RefCell::new(BTreeSet::new()),
            report_etags: true,
            mutations: Cell::new(0),
        }
    }

    /// Behave like a backend that exposes no ETag (e.g. a plain filesystem).
    pub fn without_etags(mut self) -> Self {
        self.report_etags = false;
        self
    }

    /// Seed an object without counting it as a mutation.
    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects.borrow_mut().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    /// Seed a zero-byte folder marker.
    pub fn insert_marker(&self, key: &str) {
        let mut key = key.to_string();
        if !key.ends_with('/') {
            key.push('/');
        }
        self.insert(&key, b"");
    }

    /// Make `put`, `get` and `delete` on `key` fail.
    pub fn fail_on(&self, key: &str) {
        self.failing_keys.borrow_mut().insert(key.to_string());
    }

    /// Make `list` and `head` under `prefix` fail.
    pub fn fail_listing(&self, prefix: &str) {
        self.failing_prefixes.borrow_mut().insert(prefix.to_string());
    }

    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(key).map(|o| o.data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.borrow().get(key).map(|o| o.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }

    /// Number of successful or attempted `put`/`get`/`delete` calls.
    pub fn mutation_count(&self) -> usize {
        self.mutations.get()
    }

    fn check_key(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_keys.borrow().contains(key) {
            return Err(StoreError::Backend(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn check_listing(&self, key: &str) -> Result<(), StoreError> {
        if self
            .failing_prefixes
            .borrow()
            .iter()
            .any(|p| key.starts_with(p.as_str()))
        {
            return Err(StoreError::Backend(format!("access denied listing {key}")));
        }
        Ok(())
    }

    fn summary(&self, key: &str, obj: &StoredObject) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            etag: self
                .report_etags
                .then(|| format!("\"{}\"", hash_bytes(&obj.data))),
            size: obj.data.len() as u64,
        }
    }

    fn bump(&self) {
        self.mutations.set(self.mutations.get() + 1);
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        self.check_listing(prefix)?;
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, o)| self.summary(k, o))
            .collect())
    }

    fn head(&self, key: &str) -> Result<Option<ObjectSummary>, StoreError> {
        self.check_listing(key)?;
        Ok(self.objects.borrow().get(key).map(|o| self.summary(key, o)))
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.contents(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    fn put(&self, local: &Path, key: &str, content_type: &str) -> Result<(), StoreError> {
        self.bump();
        self.check_key(key)?;
        let data = std::fs::read(local).map_err(|e| io_err(local, e))?;
        self.objects.borrow_mut().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str, local: &Path) -> Result<(), StoreError> {
        self.bump();
        self.check_key(key)?;
        let data = self.read(key)?;
        write_local_atomically(local, &data)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.bump();
        self.check_key(key)?;
        self.objects.borrow_mut().remove(key);
        Ok(())
    }
}
