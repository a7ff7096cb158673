//! JSON-RPC 2.0 transport to an Ethereum-compatible node.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::error::{LedgerError, LedgerResult};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Parameters of `eth_sendTransaction`; every quantity is 0x-hex.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    pub gas: String,
    pub gas_price: String,
    pub nonce: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Mined block number, if the node has assigned one.
    pub fn mined_block(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .and_then(|b| parse_quantity_u64(b).ok())
    }

    pub fn gas_used(&self) -> Option<u64> {
        self.gas_used
            .as_deref()
            .and_then(|g| parse_quantity_u64(g).ok())
    }
}

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> LedgerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> LedgerResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!("rpc -> {} (id {})", method, request.id);

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("{method}: HTTP {status}")));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))
    }

    pub async fn block_number(&self) -> LedgerResult<u64> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        parse_quantity_u64(&hex)
    }

    pub async fn gas_price(&self) -> LedgerResult<u128> {
        let hex: String = self.call("eth_gasPrice", vec![]).await?;
        parse_quantity(&hex)
    }

    pub async fn nonce(&self, address: &str) -> LedgerResult<u64> {
        let hex: String = self
            .call("eth_getTransactionCount", vec![json!(address), json!("latest")])
            .await?;
        parse_quantity_u64(&hex)
    }

    pub async fn send_transaction(&self, tx: &TransactionRequest) -> LedgerResult<String> {
        let params = vec![serde_json::to_value(tx).map_err(|e| LedgerError::Decode(e.to_string()))?];
        self.call("eth_sendTransaction", params).await
    }

    pub async fn receipt(&self, tx_hash: &str) -> LedgerResult<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", vec![json!(tx_hash)]).await
    }

    /// Read-only contract call; returns the decoded return bytes.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> LedgerResult<Vec<u8>> {
        let params = vec![
            json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
            json!("latest"),
        ];
        let hex_result: String = self.call("eth_call", params).await?;
        decode_hex_data(&hex_result)
    }
}

pub fn parse_quantity(s: &str) -> LedgerResult<u128> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| LedgerError::Decode(format!("bad quantity {s:?}: {e}")))
}

pub fn parse_quantity_u64(s: &str) -> LedgerResult<u64> {
    u64::try_from(parse_quantity(s)?).map_err(|_| LedgerError::Decode(format!("quantity {s:?} exceeds u64")))
}

pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

fn decode_hex_data(s: &str) -> LedgerResult<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("bad hex data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RpcClient {
        RpcClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(to_quantity(200_000), "0x30d40");
        assert!(parse_quantity("0xzz").is_err());
        assert_eq!(parse_quantity_u64("0xffffffffffffffff").unwrap(), u64::MAX);
        assert!(matches!(
            parse_quantity_u64("0x10000000000000000"),
            Err(LedgerError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn oversized_block_number_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x1000000000000000000"
            })))
            .mount(&server)
            .await;

        let err = client(&server).block_number().await.unwrap_err();
        assert!(matches!(err, LedgerError::Decode(_)));
    }

    #[tokio::test]
    async fn block_number_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"jsonrpc": "2.0", "method": "eth_blockNumber"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x2a"
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).block_number().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn rpc_error_object_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "unknown account"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).gas_price().await.unwrap_err();
        match err {
            LedgerError::Rpc { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "unknown account");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_receipt_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": null
            })))
            .mount(&server)
            .await;

        assert!(client(&server).receipt("0xabc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server).block_number().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
