// Postgres-backed document and blob stores.

use async_trait::async_trait;
use grimoire_common::{Blob, Collection};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::Result;
use crate::scribe::{BlobStore, BlobWriteResponse, DocumentStore, UpsertResponse};

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Map a rejected statement's SQLSTATE onto an HTTP-style status.
///
/// Class 23 (integrity) and 22 (bad data) are permanent for this document;
/// resource exhaustion, operator intervention and serialization failures
/// are worth retrying.
pub(crate) fn rejection_status(sqlstate: Option<&str>) -> u16 {
    match sqlstate.map(|code| code.get(..2).unwrap_or(code)) {
        Some("23") => 409,
        Some("22") => 400,
        Some("40") | Some("53") | Some("57") => 503,
        _ => 500,
    }
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn upsert_document(
        &self,
        collection: Collection,
        partition_key: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<UpsertResponse> {
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO documents (collection, partition_key, id, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, partition_key, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(collection.as_str())
        .bind(partition_key)
        .bind(id)
        .bind(body)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(true) => Ok(UpsertResponse::created()),
            Ok(false) => Ok(UpsertResponse::ok()),
            Err(sqlx::Error::Database(db)) => {
                let status = rejection_status(db.code().as_deref());
                debug!(%collection, id, status, error = %db, "Document rejected");
                Ok(UpsertResponse::rejected(status, db.message()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn write_blob(&self, blob: &Blob) -> Result<BlobWriteResponse> {
        let result = sqlx::query(
            r#"
            INSERT INTO blobs (container, name, content_type, size_bytes, bytes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (container, name)
            DO UPDATE SET content_type = EXCLUDED.content_type,
                          size_bytes = EXCLUDED.size_bytes,
                          bytes = EXCLUDED.bytes,
                          updated_at = now()
            "#,
        )
        .bind(blob.container.as_str())
        .bind(&blob.name)
        .bind(&blob.content_type)
        .bind(blob.bytes.len() as i64)
        .bind(blob.bytes.as_ref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(BlobWriteResponse::stored(format!(
                "{}/{}",
                blob.container, blob.name
            ))),
            Err(sqlx::Error::Database(db)) => {
                warn!(container = %blob.container, name = %blob.name, error = %db, "Blob rejected");
                Ok(BlobWriteResponse::refused())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_violations_are_conflicts() {
        assert_eq!(rejection_status(Some("23505")), 409);
        assert_eq!(rejection_status(Some("23502")), 409);
    }

    #[test]
    fn data_exceptions_are_bad_requests() {
        assert_eq!(rejection_status(Some("22P02")), 400);
    }

    #[test]
    fn resource_pressure_is_retryable() {
        assert!(UpsertResponse::rejected(rejection_status(Some("53300")), "").is_retryable());
        assert!(UpsertResponse::rejected(rejection_status(Some("40001")), "").is_retryable());
    }

    #[test]
    fn unknown_codes_fall_back_to_server_error() {
        assert_eq!(rejection_status(None), 500);
        assert_eq!(rejection_status(Some("XX000")), 500);
    }
}
