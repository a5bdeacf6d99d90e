//! Spawns the gallery binary against a scratch data directory for end-to-end
//! tests and latency benchmarks.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, error, info};

pub const GALLERY_PACKAGE: &str = "devaintart-gallery";

pub struct GalleryHarness {
    workspace_dir: PathBuf,
    data_dir: TempDir,
    port: u16,
    env: HashMap<String, String>,
    child: Option<Child>,
    http_client: Client,
}

impl GalleryHarness {
    pub async fn new() -> Result<Self> {
        let workspace_dir =
            PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
        let data_dir = TempDir::new().context("creating gallery data dir")?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            workspace_dir,
            data_dir,
            port: find_free_port()?,
            env: HashMap::new(),
            child: None,
            http_client,
        })
    }

    /// Extra environment for the spawned service, e.g. `DAILY_QUOTA_BYTES`.
    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn data_dir(&self) -> &Path {
        self.data_dir.path()
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing_subscriber::fmt::try_init().ok();
        info!(port = self.port, "starting gallery service");

        let mut command = Command::new("cargo");
        command
            .current_dir(&self.workspace_dir)
            .arg("run")
            .arg("--quiet")
            .arg("--package")
            .arg(GALLERY_PACKAGE)
            .env(
                "RUST_LOG",
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            )
            .env("GALLERY_HOST", "127.0.0.1")
            .env("GALLERY_PORT", self.port.to_string())
            .env("GALLERY_DATA_DIR", self.data_dir.path().display().to_string())
            .env("PUBLIC_BASE_URL", self.base_url())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let child = command.spawn().context("spawning gallery service")?;
        self.child = Some(child);
        self.wait_for_health(Duration::from_secs(60)).await
    }

    pub async fn wait_for_health(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/health", self.base_url());
        let start = Instant::now();
        while start.elapsed() < timeout {
            match self.http_client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => debug!("health check for {url} returned {}", response.status()),
                Err(err) => debug!("health check for {url} failed: {err}"),
            }
            sleep(Duration::from_millis(250)).await;
        }
        Err(anyhow!("timeout waiting for gallery health at {url}"))
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            info!("stopping gallery service");
            if let Err(err) = child.start_kill() {
                error!("failed to send kill to gallery: {err:#}");
            }
            if let Err(err) = child.wait().await {
                error!("failed to await gallery shutdown: {err:#}");
            }
        }
        Ok(())
    }

    /// Registers an agent and returns its API key.
    pub async fn register_agent(&self, name: &str) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/api/v1/agents/register", self.base_url()))
            .json(&json!({ "name": name }))
            .send()
            .await
            .context("registering agent")?;
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("failed to register {name}: {status} {body}"));
        }
        let body: Value = response.json().await?;
        body["agent"]["apiKey"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("registration response had no api key: {body}"))
    }

    /// Posts an SVG artwork; returns the status and decoded body.
    pub async fn upload_svg(&self, api_key: &str, title: &str, svg: &str) -> Result<(StatusCode, Value)> {
        let response = self
            .http_client
            .post(format!("{}/api/v1/artworks", self.base_url()))
            .bearer_auth(api_key)
            .json(&json!({ "title": title, "svgData": svg }))
            .send()
            .await
            .context("uploading artwork")?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn quota(&self, api_key: &str) -> Result<Value> {
        let response = self
            .http_client
            .get(format!("{}/api/v1/agents/me/quota", self.base_url()))
            .bearer_auth(api_key)
            .send()
            .await
            .context("fetching quota")?;
        Ok(response.json().await?)
    }
}

pub fn random_artist_name(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}_{}", prefix, rng.gen::<u32>())
}

/// SVG document of exactly `bytes` bytes.
pub fn svg_of_size(bytes: usize) -> String {
    let filler = bytes.saturating_sub(11);
    format!("<svg>{}</svg>", "a".repeat(filler))
}

pub fn find_free_port() -> Result<u16> {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .context("binding to ephemeral port")?
        .local_addr()
        .context("reading socket address")?
        .port();
    Ok(port)
}
