use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::GrimoireError;
use crate::retry::RetryPolicy;

pub const DEFAULT_SCRYFALL_BASE_URL: &str = "https://api.scryfall.com";
pub const DEFAULT_SET_BATCH_SIZE: usize = 50;

/// Ingestion configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    /// When set, blobs go to this directory instead of Postgres.
    pub blob_dir: Option<PathBuf>,

    // Source
    pub scryfall_base_url: String,
    pub scryfall_request_interval: Duration,

    // Pipeline
    pub set_batch_size: usize,
    pub card_concurrency: usize,
    pub download_images: bool,
    /// Image resolutions to store. Empty means every resolution the card exposes.
    pub image_sizes: Vec<String>,
    pub artist_cards_direct: bool,

    // Resilience
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, GrimoireError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GrimoireError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                GrimoireError::Config("DATABASE_URL environment variable is required".into())
            })?;

        let set_batch_size = parse_or(&lookup, "SET_BATCH_SIZE", DEFAULT_SET_BATCH_SIZE)?;
        if set_batch_size == 0 {
            return Err(GrimoireError::Validation(
                "SET_BATCH_SIZE must be greater than zero".into(),
            ));
        }

        let scryfall_base_url = lookup("SCRYFALL_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCRYFALL_BASE_URL.to_string());
        if !scryfall_base_url.starts_with("http://") && !scryfall_base_url.starts_with("https://") {
            return Err(GrimoireError::Validation(format!(
                "SCRYFALL_BASE_URL must be an http(s) URL, got {scryfall_base_url:?}"
            )));
        }

        let card_concurrency = parse_or(&lookup, "CARD_CONCURRENCY", 1usize)?.max(1);

        let image_sizes = lookup("IMAGE_SIZES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let retry = RetryPolicy::new(
            parse_or(&lookup, "RETRY_MAX_ATTEMPTS", 3u32)?,
            Duration::from_millis(parse_or(&lookup, "RETRY_BASE_DELAY_MS", 500u64)?),
        );

        Ok(Self {
            database_url,
            blob_dir: lookup("BLOB_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            scryfall_base_url,
            scryfall_request_interval: Duration::from_millis(parse_or(
                &lookup,
                "SCRYFALL_REQUEST_INTERVAL_MS",
                100u64,
            )?),
            set_batch_size,
            card_concurrency,
            download_images: parse_bool_or(&lookup, "DOWNLOAD_IMAGES", true)?,
            image_sizes,
            artist_cards_direct: parse_bool_or(&lookup, "ARTIST_CARDS_DIRECT", false)?,
            retry,
        })
    }

    /// Log the effective configuration with credentials masked.
    pub fn log_redacted(&self) {
        info!(
            database_url = %redact_url(&self.database_url),
            blob_dir = ?self.blob_dir,
            scryfall_base_url = %self.scryfall_base_url,
            request_interval_ms = self.scryfall_request_interval.as_millis() as u64,
            set_batch_size = self.set_batch_size,
            card_concurrency = self.card_concurrency,
            download_images = self.download_images,
            image_sizes = ?self.image_sizes,
            artist_cards_direct = self.artist_cards_direct,
            retry_max_attempts = self.retry.max_attempts,
            retry_base_delay_ms = self.retry.base_delay.as_millis() as u64,
            "Loaded config"
        );
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, GrimoireError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GrimoireError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, GrimoireError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(GrimoireError::Config(format!(
                "{key} must be a boolean, got {v:?}"
            ))),
        },
    }
}

/// Replace the password segment of a connection URL with `***`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, GrimoireError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/grimoire")]).unwrap();
        assert_eq!(config.set_batch_size, 50);
        assert_eq!(config.card_concurrency, 1);
        assert!(config.download_images);
        assert!(!config.artist_cards_direct);
        assert!(config.image_sizes.is_empty());
        assert!(config.blob_dir.is_none());
        assert_eq!(config.scryfall_base_url, DEFAULT_SCRYFALL_BASE_URL);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn missing_database_url_is_a_config_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("SET_BATCH_SIZE", "0")])
            .unwrap_err();
        assert!(matches!(err, GrimoireError::Validation(_)));
        assert!(err.to_string().contains("SET_BATCH_SIZE"));
    }

    #[test]
    fn base_url_must_be_http() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("SCRYFALL_BASE_URL", "api.scryfall.com")])
            .unwrap_err();
        assert!(matches!(err, GrimoireError::Validation(_)));

        let config = config_from(&[("DATABASE_URL", "postgres://x"), ("SCRYFALL_BASE_URL", "http://localhost:8080/")])
            .unwrap();
        assert_eq!(config.scryfall_base_url, "http://localhost:8080");
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        assert!(config_from(&[("DATABASE_URL", "postgres://x"), ("SET_BATCH_SIZE", "lots")]).is_err());
        assert!(config_from(&[("DATABASE_URL", "postgres://x"), ("DOWNLOAD_IMAGES", "maybe")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("SET_BATCH_SIZE", "10"),
            ("CARD_CONCURRENCY", "4"),
            ("DOWNLOAD_IMAGES", "false"),
            ("IMAGE_SIZES", "normal, PNG"),
            ("ARTIST_CARDS_DIRECT", "yes"),
            ("BLOB_DIR", "/var/lib/grimoire/blobs"),
            ("RETRY_MAX_ATTEMPTS", "5"),
        ])
        .unwrap();
        assert_eq!(config.set_batch_size, 10);
        assert_eq!(config.card_concurrency, 4);
        assert!(!config.download_images);
        assert_eq!(config.image_sizes, vec!["normal", "png"]);
        assert!(config.artist_cards_direct);
        assert_eq!(config.blob_dir, Some(PathBuf::from("/var/lib/grimoire/blobs")));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn redact_masks_password_only() {
        assert_eq!(
            redact_url("postgres://grimoire:hunter2@db:5432/cards"),
            "postgres://grimoire:***@db:5432/cards"
        );
        assert_eq!(redact_url("postgres://db/cards"), "postgres://db/cards");
    }
}
