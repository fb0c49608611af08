// Scribe contracts: typed, per-collection upserts over a document store,
// and blob writes over a blob store.
//
// Every concrete store (Postgres, filesystem, in-memory test doubles) sits
// behind `DocumentStore` / `BlobStore`; the pipeline only sees `Scribe<D>`
// and `BlobScribe`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use grimoire_common::{Blob, Collection, Document, RetryPolicy};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outcome of a document upsert that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertResponse {
    pub status_code: u16,
    pub message: Option<String>,
}

impl UpsertResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            message: None,
        }
    }

    pub fn created() -> Self {
        Self {
            status_code: 201,
            message: None,
        }
    }

    pub fn rejected(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Throttling and server-side statuses worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.status_code == 408 || self.status_code == 429 || self.status_code >= 500
    }
}

/// Outcome of a blob write. `value` is the stored location; `None` means
/// the store refused the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobWriteResponse {
    pub value: Option<String>,
}

impl BlobWriteResponse {
    pub fn stored(location: impl Into<String>) -> Self {
        Self {
            value: Some(location.into()),
        }
    }

    pub fn refused() -> Self {
        Self { value: None }
    }

    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document at (collection, partition_key, id).
    async fn upsert_document(
        &self,
        collection: Collection,
        partition_key: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<UpsertResponse>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write (or overwrite) a blob.
    async fn write_blob(&self, blob: &Blob) -> Result<BlobWriteResponse>;
}

// ---------------------------------------------------------------------------
// Scribes
// ---------------------------------------------------------------------------

/// Typed upsert adapter for one collection. Stateless apart from the shared
/// store handle, so one instance can serve concurrent callers.
pub struct Scribe<D> {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    _doc: PhantomData<fn(&D)>,
}

impl<D: Document> Scribe<D> {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            _doc: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        D::COLLECTION
    }

    /// Upsert one document, retrying transport errors and retryable
    /// statuses per the policy. Non-retryable rejections come back as-is.
    pub async fn upsert(&self, item: &D) -> Result<UpsertResponse> {
        let body = serde_json::to_value(item)?;
        let id = item.id();
        let partition_key = item.partition_key();
        let operation = format!("upsert {}", D::COLLECTION);

        self.retry
            .run(
                &operation,
                || {
                    self.store
                        .upsert_document(D::COLLECTION, &partition_key, &id, &body)
                },
                |outcome| match outcome {
                    Ok(resp) => resp.is_retryable(),
                    Err(e) => e.is_transient(),
                },
            )
            .await
    }
}

impl<D> Clone for Scribe<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            retry: self.retry,
            _doc: PhantomData,
        }
    }
}

/// Blob write adapter with the same retry treatment as `Scribe`.
#[derive(Clone)]
pub struct BlobScribe {
    store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
}

impl BlobScribe {
    pub fn new(store: Arc<dyn BlobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn write(&self, blob: &Blob) -> Result<BlobWriteResponse> {
        let operation = format!("write {}/{}", blob.container, blob.name);
        self.retry
            .run(
                &operation,
                || self.store.write_blob(blob),
                |outcome| matches!(outcome, Err(e) if e.is_transient()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use grimoire_common::SetCodeIndex;
    use uuid::Uuid;

    use super::*;
    use crate::error::StoreError;

    /// Replays a fixed list of outcomes, recording what it was asked to write.
    struct ScriptedStore {
        outcomes: Mutex<Vec<Result<UpsertResponse>>>,
        calls: Mutex<Vec<(Collection, String, String, serde_json::Value)>>,
    }

    impl ScriptedStore {
        fn new(mut outcomes: Vec<Result<UpsertResponse>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        async fn upsert_document(
            &self,
            collection: Collection,
            partition_key: &str,
            id: &str,
            body: &serde_json::Value,
        ) -> Result<UpsertResponse> {
            self.calls.lock().unwrap().push((
                collection,
                partition_key.to_string(),
                id.to_string(),
                body.clone(),
            ));
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(UpsertResponse::ok()))
        }
    }

    fn index() -> SetCodeIndex {
        SetCodeIndex {
            set_code: "lea".into(),
            set_id: Uuid::nil(),
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn upsert_addresses_the_document_by_collection_partition_and_id() {
        let store = Arc::new(ScriptedStore::new(vec![]));
        let scribe: Scribe<SetCodeIndex> = Scribe::new(store.clone(), policy(1));

        let resp = scribe.upsert(&index()).await.unwrap();
        assert!(resp.is_success());

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Collection::SetCodeIndex);
        assert_eq!(calls[0].1, "lea");
        assert_eq!(calls[0].2, "lea");
        assert_eq!(calls[0].3["setId"], Uuid::nil().to_string());
    }

    #[tokio::test]
    async fn throttled_upsert_is_retried() {
        let store = Arc::new(ScriptedStore::new(vec![
            Ok(UpsertResponse::rejected(429, "slow down")),
            Ok(UpsertResponse::ok()),
        ]));
        let scribe: Scribe<SetCodeIndex> = Scribe::new(store.clone(), policy(3));

        let resp = scribe.upsert(&index()).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(store.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn conflict_is_returned_without_retry() {
        let store = Arc::new(ScriptedStore::new(vec![Ok(UpsertResponse::rejected(
            409, "conflict",
        ))]));
        let scribe: Scribe<SetCodeIndex> = Scribe::new(store.clone(), policy(3));

        let resp = scribe.upsert(&index()).await.unwrap();
        assert_eq!(resp.status_code, 409);
        assert!(!resp.is_success());
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_error_surfaces_after_retries() {
        let store = Arc::new(ScriptedStore::new(vec![
            Err(StoreError::Unavailable("down".into())),
            Err(StoreError::Unavailable("still down".into())),
        ]));
        let scribe: Scribe<SetCodeIndex> = Scribe::new(store.clone(), policy(2));

        let err = scribe.upsert(&index()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn response_classification() {
        assert!(UpsertResponse::created().is_success());
        assert!(UpsertResponse::rejected(503, "busy").is_retryable());
        assert!(!UpsertResponse::rejected(400, "bad").is_retryable());
        assert!(!BlobWriteResponse::refused().is_success());
    }
}
