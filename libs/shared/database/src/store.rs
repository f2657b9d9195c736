use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record already exists")]
    AlreadyExists,

    #[error("record not found")]
    NotFound,

    #[error("store request failed: {0}")]
    Backend(String),
}

/// A filter condition on a record field.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(&'static str, String),
    In(&'static str, Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order_by: Option<&'static str>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq(field, value.into()));
        self
    }

    pub fn filter_in(mut self, field: &'static str, values: Vec<String>) -> Self {
        self.conditions.push(Condition::In(field, values));
        self
    }

    pub fn order_asc(mut self, field: &'static str) -> Self {
        self.order_by = Some(field);
        self
    }
}

/// Keyed record store. Collections hold JSON documents addressed by an
/// opaque string key; membership filters and batched reads are capped at
/// `max_keys_per_batch` values per call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read. `Ok(None)` when the key is absent.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Atomic create-if-absent. Fails with `StoreError::AlreadyExists` when
    /// the key is already taken, including when a concurrent writer wins.
    async fn create(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError>;

    /// Partial update of an existing record; returns the updated document.
    async fn update(&self, collection: &str, key: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Batched multi-key read; at most `max_keys_per_batch` keys per call.
    async fn get_many(&self, collection: &str, keys: &[String]) -> Result<Vec<Value>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Upper bound on keys per batched read and values per membership filter.
    fn max_keys_per_batch(&self) -> usize;
}
