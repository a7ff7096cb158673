//! Pinata pinning client (`pinFileToIPFS` / `pinJSONToIPFS`).

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{ContentError, ContentStore, PinReceipt, validate_upload};
use crate::config::ContentConfig;

#[derive(Debug, Deserialize)]
struct PinataErrorBody {
    error: PinataErrorDetail,
}

#[derive(Debug, Deserialize)]
struct PinataErrorDetail {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    details: String,
}

struct Credentials {
    key: String,
    secret: String,
}

pub struct PinataClient {
    http: reqwest::Client,
    api_url: String,
    gateway_url: String,
    credentials: Option<Credentials>,
}

impl PinataClient {
    pub fn new(config: &ContentConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ContentError::Transport(format!("failed to build HTTP client: {e}")))?;

        let credentials = if config.has_credentials() {
            Some(Credentials {
                key: config.api_key.clone().unwrap_or_default(),
                secret: config.api_secret.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.clone(),
            credentials,
        })
    }

    fn credentials(&self) -> Result<&Credentials, ContentError> {
        self.credentials.as_ref().ok_or(ContentError::MissingCredentials)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<PinReceipt, ContentError> {
        let creds = self.credentials()?;
        let response = request
            .header("pinata_api_key", &creds.key)
            .header("pinata_secret_api_key", &creds.secret)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<PinataErrorBody>(&body) {
                Ok(err) => ContentError::Api {
                    reason: err.error.reason,
                    details: err.error.details,
                },
                Err(_) => ContentError::Http {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| ContentError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for PinataClient {
    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        metadata: &BTreeMap<String, Value>,
    ) -> Result<PinReceipt, ContentError> {
        self.credentials()?;
        validate_upload(bytes, file_name)?;

        let pinata_metadata = json!({ "name": file_name, "keyvalues": metadata });
        let pinata_options = json!({ "cidVersion": 1 });
        let form = Form::new()
            .part("file", Part::bytes(bytes.to_vec()).file_name(file_name.to_string()))
            .text("pinataMetadata", pinata_metadata.to_string())
            .text("pinataOptions", pinata_options.to_string());

        debug!("uploading {} ({} bytes) to {}", file_name, bytes.len(), self.api_url);
        let request = self
            .http
            .post(format!("{}/pinning/pinFileToIPFS", self.api_url))
            .multipart(form);
        let receipt = self.send(request).await?;
        info!("pinned {} as {}", file_name, receipt.cid);
        Ok(receipt)
    }

    async fn pin_json(&self, value: &Value, name: &str) -> Result<PinReceipt, ContentError> {
        let body = json!({
            "pinataContent": value,
            "pinataMetadata": { "name": name },
            "pinataOptions": { "cidVersion": 1 },
        });
        let request = self
            .http
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .json(&body);
        self.send(request).await
    }

    fn content_url(&self, cid: &str) -> String {
        format!("{}{}", self.gateway_url, cid)
    }
}
