// Response cache stores

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Keyed response store. The request builder only ever calls `remove_all`;
/// transports use `get`/`put` for GET responses.
pub trait CacheStore: Send + Sync {
    /// Identifier of the store, e.g. the resource URL it belongs to
    fn id(&self) -> &str;
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value);
    fn remove(&self, key: &str);
    fn remove_all(&self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process cache, one per resource
#[derive(Debug)]
pub struct MemoryCache {
    id: String,
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheStore for MemoryCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn remove_all(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
