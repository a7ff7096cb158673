pub mod memory;
pub mod pinata;

pub use memory::MemoryContentStore;
pub use pinata::PinataClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Validation(String),

    #[error("Pinata API credentials not configured - set PINATA_API_KEY and PINATA_API_SECRET")]
    MissingCredentials,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("Pinata API error: {reason} - {details}")]
    Api { reason: String, details: String },

    #[error("Pinata API error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ContentError::Decode(err.to_string())
        } else {
            ContentError::Transport(err.to_string())
        }
    }
}

/// Pin acknowledgement; field names follow the pinning service's response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinReceipt {
    #[serde(rename = "IpfsHash")]
    pub cid: String,
    #[serde(rename = "PinSize", default)]
    pub pin_size: u64,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: String,
}

/// Content-addressed storage for certificate artifacts.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload `bytes` under `file_name`; `metadata` is attached as key/values.
    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        metadata: &BTreeMap<String, Value>,
    ) -> Result<PinReceipt, ContentError>;

    async fn pin_json(&self, value: &Value, name: &str) -> Result<PinReceipt, ContentError>;

    /// Public retrieval URL for `cid`.
    fn content_url(&self, cid: &str) -> String;

    /// Pins a small probe document to confirm credentials and reachability.
    async fn check_connection(&self) -> Result<(), ContentError> {
        let probe = serde_json::json!({
            "test": "connection",
            "timestamp": chrono::Utc::now().timestamp(),
        });
        self.pin_json(&probe, "connection-test").await.map(|_| ())
    }
}

/// Shared precondition check run before any upload leaves the process.
pub(crate) fn validate_upload(bytes: &[u8], file_name: &str) -> Result<(), ContentError> {
    if bytes.is_empty() {
        return Err(ContentError::Validation("file data is empty".into()));
    }
    if file_name.trim().is_empty() {
        return Err(ContentError::Validation("file name is required".into()));
    }
    Ok(())
}
