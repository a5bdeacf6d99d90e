//! Storage for binary artwork payloads.
//!
//! SVG documents live in the database; PNG bytes go through an
//! [`ObjectStore`] and the artwork row keeps the key and public URL.
pub mod error;
pub mod http;
pub mod local;

use async_trait::async_trait;

pub use error::ObjectStoreError;
pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, ObjectStoreError>;

    /// Removes `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

pub fn artwork_object_key(artist_id: &str, artwork_id: &str) -> String {
    format!("artworks/{artist_id}/{artwork_id}.png")
}

pub(crate) fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

pub(crate) fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let bad_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if key.is_empty() || bad_segment || key.contains('\\') {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
