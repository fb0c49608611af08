pub mod error;
pub mod fs;
pub mod postgres;
pub mod run_log;
pub mod scribe;

pub use error::{Result, StoreError};
pub use fs::FsBlobStore;
pub use postgres::{migrate, PgBlobStore, PgDocumentStore};
pub use run_log::{IngestRunRecord, RunRecorder};
pub use scribe::{BlobScribe, BlobStore, BlobWriteResponse, DocumentStore, Scribe, UpsertResponse};
