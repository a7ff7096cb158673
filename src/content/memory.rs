//! In-process content store. The CID is derived from the SHA-256 of the
//! stored bytes, so identical uploads share an identifier.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{ContentError, ContentStore, PinReceipt, validate_upload};
use crate::hashing;

const CID_PREFIX: &str = "bafkrei";

pub struct MemoryContentStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    gateway_url: String,
    uploads: AtomicUsize,
    unavailable: AtomicBool,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new("memory://ipfs/")
    }
}

impl MemoryContentStore {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            gateway_url: gateway_url.into(),
            uploads: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Reject every subsequent call with a transport error.
    pub fn set_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    /// Number of successful pins, duplicates included.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub async fn get(&self, cid: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(cid).cloned()
    }

    async fn store(&self, bytes: Vec<u8>) -> Result<PinReceipt, ContentError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ContentError::Transport("content store unavailable".into()));
        }
        let digest = hashing::file_digest(&bytes);
        let cid = format!("{CID_PREFIX}{}", &digest[..52]);
        let pin_size = bytes.len() as u64;
        self.objects.write().await.insert(cid.clone(), bytes);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(PinReceipt {
            cid,
            pin_size,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        _metadata: &BTreeMap<String, Value>,
    ) -> Result<PinReceipt, ContentError> {
        validate_upload(bytes, file_name)?;
        self.store(bytes.to_vec()).await
    }

    async fn pin_json(&self, value: &Value, _name: &str) -> Result<PinReceipt, ContentError> {
        let bytes = serde_json::to_vec(value).map_err(|e| ContentError::Decode(e.to_string()))?;
        self.store(bytes).await
    }

    fn content_url(&self, cid: &str) -> String {
        format!("{}{}", self.gateway_url, cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_bytes_share_a_cid() {
        let store = MemoryContentStore::default();
        let a = store.upload(b"cert", "a.pdf", &BTreeMap::new()).await.unwrap();
        let b = store.upload(b"cert", "b.pdf", &BTreeMap::new()).await.unwrap();
        assert_eq!(a.cid, b.cid);
        assert!(a.cid.starts_with(CID_PREFIX));
        assert_eq!(store.upload_count(), 2);
        assert_eq!(store.get(&a.cid).await.as_deref(), Some(&b"cert"[..]));
        assert_eq!(store.content_url(&a.cid), format!("memory://ipfs/{}", a.cid));
    }

    #[tokio::test]
    async fn unavailable_store_rejects_uploads() {
        let store = MemoryContentStore::default();
        store.set_unavailable(true);
        let err = store.upload(b"cert", "a.pdf", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, ContentError::Transport(_)));
        assert_eq!(store.upload_count(), 0);
        assert!(store.check_connection().await.is_err());
    }
}
