use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::store::{Condition, Query, RecordStore, StoreError};

// Same cap as the HTTP store so tests exercise chunk splitting.
const MAX_KEYS_PER_BATCH: usize = 10;

/// In-memory `RecordStore` for tests. Create-if-absent is atomic under one
/// lock, which gives it the same single-winner semantics the real store
/// enforces through its unique-key constraint.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    failing_creates: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent create in `collection` fail, for exercising
    /// rollback paths.
    pub fn fail_creates_in(&self, collection: &str) {
        self.failing_creates
            .lock()
            .unwrap()
            .insert(collection.to_string());
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

fn field_str<'a>(document: &'a Value, field: &str) -> Option<&'a str> {
    document.get(field).and_then(|v| v.as_str())
}

fn matches(document: &Value, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| match condition {
        Condition::Eq(field, value) => field_str(document, field) == Some(value.as_str()),
        Condition::In(field, values) => field_str(document, field)
            .map(|v| values.iter().any(|candidate| candidate == v))
            .unwrap_or(false),
    })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn create(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError> {
        if self.failing_creates.lock().unwrap().contains(collection) {
            return Err(StoreError::Backend(format!(
                "injected create failure for {}",
                collection
            )));
        }

        let mut document = document;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("key".to_string(), Value::String(key.to_string()));
        }

        let mut collections = self.collections.lock().unwrap();
        let records = collections.entry(collection.to_string()).or_default();
        if records.contains_key(key) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(key.to_string(), document);

        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, patch: Value) -> Result<Value, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(key))
            .ok_or(StoreError::NotFound)?;

        if let (Some(fields), Some(updates)) = (record.as_object_mut(), patch.as_object()) {
            for (field, value) in updates {
                fields.insert(field.clone(), value.clone());
            }
        }

        Ok(record.clone())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(records) = collections.get_mut(collection) {
            records.remove(key);
        }

        Ok(())
    }

    async fn get_many(&self, collection: &str, keys: &[String]) -> Result<Vec<Value>, StoreError> {
        if keys.len() > MAX_KEYS_PER_BATCH {
            return Err(StoreError::Backend(format!(
                "batched read exceeds {} keys",
                MAX_KEYS_PER_BATCH
            )));
        }

        let collections = self.collections.lock().unwrap();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(keys
            .iter()
            .filter_map(|key| records.get(key))
            .cloned()
            .collect())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        for condition in &query.conditions {
            if let Condition::In(field, values) = condition {
                if values.len() > MAX_KEYS_PER_BATCH {
                    return Err(StoreError::Backend(format!(
                        "membership filter on {} exceeds {} values",
                        field, MAX_KEYS_PER_BATCH
                    )));
                }
            }
        }

        let collections = self.collections.lock().unwrap();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Value> = records
            .values()
            .filter(|document| matches(document, &query.conditions))
            .cloned()
            .collect();

        if let Some(field) = query.order_by {
            rows.sort_by(|a, b| {
                field_str(a, field)
                    .unwrap_or("")
                    .cmp(field_str(b, field).unwrap_or(""))
            });
        }

        Ok(rows)
    }

    fn max_keys_per_batch(&self) -> usize {
        MAX_KEYS_PER_BATCH
    }
}
