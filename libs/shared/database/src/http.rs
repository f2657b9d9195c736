use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::store::{Condition, Query, RecordStore, StoreError};

/// Keys per batched read / values per membership filter the backing REST
/// interface accepts in one call.
const MAX_KEYS_PER_BATCH: usize = 10;

pub struct HttpStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            api_key: config.store_api_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        headers
    }

    async fn request_rows(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        representation: bool,
    ) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making store request to {}", url);

        let mut req = self.client.request(method, &url).headers(self.get_headers());

        if representation {
            req = req.header("Prefer", "return=representation");
        }
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status == StatusCode::CONFLICT {
                return Err(anyhow::Error::new(StoreError::AlreadyExists));
            }

            error!("Store API error ({}): {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let rows = response.json::<Vec<Value>>().await?;
        Ok(rows)
    }
}

fn map_request_error(error: anyhow::Error) -> StoreError {
    match error.downcast_ref::<StoreError>() {
        Some(StoreError::AlreadyExists) => StoreError::AlreadyExists,
        _ => StoreError::Backend(error.to_string()),
    }
}

fn in_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| urlencoding::encode(v).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn query_string(query: &Query, limit: usize) -> Result<String, StoreError> {
    let mut parts = Vec::new();

    for condition in &query.conditions {
        match condition {
            Condition::Eq(field, value) => {
                parts.push(format!("{}=eq.{}", field, urlencoding::encode(value)));
            }
            Condition::In(field, values) => {
                if values.len() > limit {
                    return Err(StoreError::Backend(format!(
                        "membership filter on {} exceeds {} values",
                        field, limit
                    )));
                }
                parts.push(format!("{}=in.({})", field, in_list(values)));
            }
        }
    }

    if let Some(field) = query.order_by {
        parts.push(format!("order={}.asc", field));
    }

    Ok(parts.join("&"))
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let path = format!("/rest/v1/{}?key=eq.{}", collection, urlencoding::encode(key));
        let rows = self
            .request_rows(Method::GET, &path, None, false)
            .await
            .map_err(map_request_error)?;

        Ok(rows.into_iter().next())
    }

    async fn create(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError> {
        let mut document = document;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("key".to_string(), Value::String(key.to_string()));
        }

        let path = format!("/rest/v1/{}", collection);
        self.request_rows(Method::POST, &path, Some(document), true)
            .await
            .map_err(map_request_error)?;

        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, patch: Value) -> Result<Value, StoreError> {
        let path = format!("/rest/v1/{}?key=eq.{}", collection, urlencoding::encode(key));
        let rows = self
            .request_rows(Method::PATCH, &path, Some(patch), true)
            .await
            .map_err(map_request_error)?;

        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let path = format!("/rest/v1/{}?key=eq.{}", collection, urlencoding::encode(key));
        self.request_rows(Method::DELETE, &path, None, false)
            .await
            .map_err(map_request_error)?;

        Ok(())
    }

    async fn get_many(&self, collection: &str, keys: &[String]) -> Result<Vec<Value>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        if keys.len() > MAX_KEYS_PER_BATCH {
            return Err(StoreError::Backend(format!(
                "batched read exceeds {} keys",
                MAX_KEYS_PER_BATCH
            )));
        }

        let path = format!("/rest/v1/{}?key=in.({})", collection, in_list(keys));
        self.request_rows(Method::GET, &path, None, false)
            .await
            .map_err(map_request_error)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let path = format!(
            "/rest/v1/{}?{}",
            collection,
            query_string(query, MAX_KEYS_PER_BATCH)?
        );
        self.request_rows(Method::GET, &path, None, false)
            .await
            .map_err(map_request_error)
    }

    fn max_keys_per_batch(&self) -> usize {
        MAX_KEYS_PER_BATCH
    }
}
