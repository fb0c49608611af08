use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use grimoire_common::Config;
use grimoire_ingest::infra::HttpDownloader;
use grimoire_ingest::{IngestError, IngestStats, Ingestion, SetFilter};
use grimoire_store::{
    migrate, BlobStore, DocumentStore, FsBlobStore, IngestRunRecord, PgBlobStore, PgDocumentStore,
    RunRecorder,
};
use scryfall_client::ScryfallClient;

#[derive(Parser)]
#[command(name = "grimoire-ingest", about = "Ingest Scryfall sets and cards into the grimoire store")]
struct Cli {
    /// Only ingest these set codes (repeatable). Artist and trigram
    /// documents are left unchanged.
    #[arg(long = "set", value_name = "CODE")]
    sets: Vec<String>,

    /// Sets per batch; artists are flushed after every batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Skip card images and set icons
    #[arg(long)]
    no_images: bool,

    /// Don't write the card-name trigram index at the end of the run
    #[arg(long)]
    skip_trigrams: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("grimoire=info".parse()?)
        .add_directive("scryfall_client=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    info!("Grimoire ingest starting...");

    let mut config = Config::from_env()?;
    if let Some(batch_size) = cli.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be greater than zero");
        config.set_batch_size = batch_size;
    }
    if cli.no_images {
        config.download_images = false;
    }
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(config.card_concurrency.max(4) as u32 + 1)
        .connect(&config.database_url)
        .await?;
    migrate(&pool).await?;

    let documents: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let blobs: Arc<dyn BlobStore> = match &config.blob_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Writing blobs to filesystem");
            Arc::new(FsBlobStore::new(dir))
        }
        None => Arc::new(PgBlobStore::new(pool.clone())),
    };
    let downloader = Arc::new(HttpDownloader::new(config.retry));
    let source = ScryfallClient::with_base_url(&config.scryfall_base_url)
        .with_request_interval(config.scryfall_request_interval);

    let mut ingestion = Ingestion::new(&config, documents, blobs, downloader);
    if cli.skip_trigrams {
        ingestion = ingestion.skip_trigrams();
    }

    let cancel = ingestion.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current set");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let mut stats = IngestStats::default();
    let result = ingestion
        .run_into(&source, &SetFilter::codes(&cli.sets), &mut stats)
        .await;

    info!("{stats}");

    let record = IngestRunRecord {
        run_id,
        started_at,
        finished_at: Utc::now(),
        cancelled: matches!(result, Err(IngestError::Cancelled)),
        error: result.as_ref().err().map(|e| e.to_string()),
        stats: serde_json::to_value(&stats)?,
    };
    if let Err(e) = RunRecorder::new(pool).record(&record).await {
        warn!(error = %e, "Failed to save ingest run");
    }

    match result {
        Ok(()) | Err(IngestError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
