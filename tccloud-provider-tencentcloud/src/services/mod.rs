//! Typed wrappers over the vendor API actions, one module per service
//!
//! Every wrapper returns `Result<_, ApiError>`; classification of not-found
//! and retryable errors is left to the resource layer.

pub mod cbs;
pub mod cvm;
pub mod tcaplus;
pub mod tsf;
pub mod vpc;

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tccloud_core::waiter::{self, DEFAULT_POLL_INTERVAL, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};

use crate::error::ApiError;

/// Empty payload returned by mutating actions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ack {
    #[serde(default)]
    pub request_id: String,
}

/// `{Key, Value}` resource tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

pub fn tags_from_map(tags: &HashMap<String, String>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = tags
        .iter()
        .map(|(k, v)| Tag {
            key: k.clone(),
            value: v.clone(),
        })
        .collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags
}

pub fn tags_to_map(tags: &[Tag]) -> HashMap<String, String> {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

/// Upper bound on the pages one describe may walk
pub const MAX_PAGES: u64 = 1000;

/// Fetch every page of an offset/limit describe.
///
/// `fetch(offset, limit)` returns one page and the vendor's total count, if
/// reported. Paging stops on a short page, once the total is reached, or
/// after [`MAX_PAGES`] pages.
pub async fn paginate<T, F, Fut>(limit: u64, mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<u64>), ApiError>>,
{
    let mut items = Vec::new();
    let mut offset = 0;

    for _ in 0..MAX_PAGES {
        let (page, total) = fetch(offset, limit).await?;
        let count = page.len() as u64;
        items.extend(page);
        offset += count;

        if count < limit || total.is_some_and(|total| offset >= total) {
            return Ok(items);
        }
    }

    log::warn!("stopped paging after {} pages ({} items)", MAX_PAGES, items.len());
    Ok(items)
}

/// Run a read call, retrying transient vendor and network errors
pub async fn read_retry<T, F, Fut>(op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    waiter::retry(READ_RETRY_TIMEOUT, DEFAULT_POLL_INTERVAL, op, ApiError::is_retryable).await
}

/// Run a mutating call, retrying transient vendor and network errors
pub async fn write_retry<T, F, Fut>(op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    waiter::retry(WRITE_RETRY_TIMEOUT, DEFAULT_POLL_INTERVAL, op, ApiError::is_retryable).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_paginate_stops_on_short_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let items = paginate(2, move |offset, limit| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let all = [1, 2, 3];
                let page: Vec<i32> = all
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .copied()
                    .collect();
                Ok((page, None))
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_paginate_stops_at_total() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let items = paginate(2, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok((vec!["a", "b"], Some(2))) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paginate_stops_after_max_pages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let items = paginate(1, move |offset, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok((vec![offset], None)) }
        })
        .await
        .unwrap();

        assert_eq!(items.len() as u64, MAX_PAGES);
        assert_eq!(calls.load(Ordering::SeqCst) as u64, MAX_PAGES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_retry_recovers_from_transient_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = read_retry(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::vendor("RequestLimitExceeded", "slow down", "r"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_retry_surfaces_business_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let err = write_retry(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(ApiError::vendor("InvalidParameter", "bad", "r")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), Some("InvalidParameter"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tags_round_trip_sorted() {
        let mut map = HashMap::new();
        map.insert("team".to_string(), "infra".to_string());
        map.insert("env".to_string(), "prod".to_string());

        let tags = tags_from_map(&map);
        assert_eq!(tags[0].key, "env");
        assert_eq!(tags_to_map(&tags), map);
    }
}
