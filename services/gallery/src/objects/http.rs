use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use tracing::{debug, warn};

use super::{public_url, validate_key, ObjectStore, ObjectStoreError};

/// Client for an S3/R2-compatible gateway that accepts `PUT` and `DELETE` on
/// `{endpoint}/{key}` with a bearer token.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    public_base: String,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        public_base: impl Into<String>,
    ) -> Result<Self, ObjectStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            public_base: public_base.into(),
        })
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, public_url(&self.endpoint, key));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError> {
        validate_key(key)?;
        let size = bytes.len();
        let response = self
            .request(reqwest::Method::PUT, key)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(key, status = status.as_u16(), "object upload rejected");
            return Err(ObjectStoreError::UnexpectedStatus {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }

        debug!(key, size, "uploaded object");
        Ok(public_url(&self.public_base, key))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let response = self.request(reqwest::Method::DELETE, key).send().await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(key, status = status.as_u16(), "deleted object");
            return Ok(());
        }
        Err(ObjectStoreError::UnexpectedStatus {
            status: status.as_u16(),
            key: key.to_string(),
        })
    }
}
