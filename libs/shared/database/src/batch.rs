use std::future::Future;

use futures::future::try_join_all;
use serde_json::Value;

use crate::store::StoreError;

/// Splits `items` into store-sized chunks, issues `fetch` for every chunk
/// concurrently, and merges the results. Chunks have no ordering requirement
/// between them.
pub async fn in_batches<'a, T, F, Fut>(
    items: &'a [T],
    limit: usize,
    fetch: F,
) -> Result<Vec<Value>, StoreError>
where
    F: Fn(&'a [T]) -> Fut,
    Fut: Future<Output = Result<Vec<Value>, StoreError>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let results = try_join_all(items.chunks(limit.max(1)).map(fetch)).await?;
    Ok(results.into_iter().flatten().collect())
}
