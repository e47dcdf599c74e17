// Process-wide key/value preferences (sidebar section state and the like)

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::filters::options::slugify;

const CATEGORY_PREFIX: &str = "category-";

/// Key/value store shared by all handlers. Writes are last-writer-wins.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    values: RwLock<HashMap<String, Value>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        // A poisoned lock still holds usable data
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) -> Option<Value> {
        tracing::debug!("Preference set: {} = {}", key, value);
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }

    /// Key under which a sidebar section remembers whether it is open.
    pub fn category_key(title: &str) -> String {
        format!("{}{}", CATEGORY_PREFIX, slugify(title))
    }

    /// Stored open state of a section, or `default` when unset or not a bool.
    pub fn is_category_open(&self, title: &str, default: bool) -> bool {
        self.get(&Self::category_key(title))
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }
}
