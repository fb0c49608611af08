pub mod aggregators;
pub mod error;
pub mod infra;
pub mod ingestion;
pub mod mappers;
pub mod pipeline;
pub mod processors;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod writers;

pub use error::{IngestError, Result};
pub use ingestion::{Ingestion, SetFilter};
pub use pipeline::stats::IngestStats;
