use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::quota::{DEFAULT_DAILY_QUOTA_BYTES, DEFAULT_MAX_PNG_BYTES, DEFAULT_MAX_SVG_BYTES};
use crate::storage::GALLERY_DB_FILENAME;

/// Remote object storage settings. When absent, PNG bytes are written under
/// `data_dir/objects` and served by the gallery itself.
#[derive(Debug, Clone)]
pub struct RemoteObjectStoreConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub public_base_url: String,
    pub daily_quota_bytes: u64,
    pub max_svg_bytes: u64,
    pub max_png_bytes: u64,
    pub sqlite_busy_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub object_store: Option<RemoteObjectStoreConfig>,
    pub log_level: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8190,
            data_dir: PathBuf::from("data/gallery"),
            public_base_url: "http://127.0.0.1:8190".to_string(),
            daily_quota_bytes: DEFAULT_DAILY_QUOTA_BYTES,
            max_svg_bytes: DEFAULT_MAX_SVG_BYTES,
            max_png_bytes: DEFAULT_MAX_PNG_BYTES,
            sqlite_busy_timeout_ms: 5_000,
            request_timeout_secs: 30,
            object_store: None,
            log_level: "info".to_string(),
        }
    }
}

impl GalleryConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("GALLERY_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("GALLERY_PORT") {
            cfg.server_port = port.parse().context("GALLERY_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("GALLERY_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        cfg.public_base_url = match env::var("PUBLIC_BASE_URL") {
            Ok(url) => url.trim_end_matches('/').to_string(),
            Err(_) => format!("http://{}:{}", cfg.server_host, cfg.server_port),
        };
        if let Some(bytes) = parse_var("DAILY_QUOTA_BYTES")? {
            cfg.daily_quota_bytes = bytes;
        }
        if let Some(bytes) = parse_var("MAX_SVG_BYTES")? {
            cfg.max_svg_bytes = bytes;
        }
        if let Some(bytes) = parse_var("MAX_PNG_BYTES")? {
            cfg.max_png_bytes = bytes;
        }
        if let Some(ms) = parse_var("SQLITE_BUSY_TIMEOUT_MS")? {
            cfg.sqlite_busy_timeout_ms = ms;
        }
        if let Some(secs) = parse_var("REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout_secs = secs;
        }
        if let Ok(endpoint) = env::var("OBJECT_STORE_ENDPOINT") {
            let endpoint = endpoint.trim_end_matches('/').to_string();
            let public_url = env::var("OBJECT_STORE_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| endpoint.clone());
            cfg.object_store = Some(RemoteObjectStoreConfig {
                endpoint,
                token: env::var("OBJECT_STORE_TOKEN").ok(),
                public_url,
            });
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.daily_quota_bytes == 0 {
            anyhow::bail!("DAILY_QUOTA_BYTES must be greater than zero");
        }
        if self.max_svg_bytes == 0 || self.max_png_bytes == 0 {
            anyhow::bail!("MAX_SVG_BYTES and MAX_PNG_BYTES must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if let Some(remote) = &self.object_store {
            if !remote.endpoint.starts_with("http://") && !remote.endpoint.starts_with("https://") {
                anyhow::bail!("OBJECT_STORE_ENDPOINT must be an http(s) URL");
            }
        }

        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(GALLERY_DB_FILENAME)
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.data_dir.join("objects")
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.sqlite_busy_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{name} must be a non-negative integer, got {raw}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}
