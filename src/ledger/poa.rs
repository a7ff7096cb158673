//! Proof-of-authority ledger client (Besu/Clique style node).
//!
//! Writes are ABI-encoded contract calls submitted with `eth_sendTransaction`
//! from a node-managed sender account, then polled for a receipt at the block
//! period. A receipt that never arrives is not a failure: the hash comes back
//! with block number 0. When no contract is configured, or the live write
//! fails, issuance degrades to a synthesized transaction at the current height.

use async_trait::async_trait;
use log::{debug, info, warn};

use super::contract;
use super::error::{LedgerError, LedgerResult};
use super::retry::{self, RetryPolicy};
use super::rpc::{RpcClient, TransactionRequest, to_quantity};
use super::types::{ContractTransaction, LedgerStatus, OnChainRecord};
use super::LedgerClient;
use crate::config::LedgerConfig;
use crate::credential::CertType;

pub struct PoaLedger {
    rpc: RpcClient,
    contract: Option<String>,
    sender: String,
    receipts: RetryPolicy,
    gas_limit: u64,
}

impl PoaLedger {
    pub fn from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        let url = config
            .rpc_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| LedgerError::Transport("blockchain RPC URL not configured".into()))?;
        if config.contract_address.is_none() {
            warn!("contract address not configured; issuance will use synthesized transactions");
        }
        Ok(Self {
            rpc: RpcClient::new(url, config.request_timeout())?,
            contract: config.contract_address.clone(),
            sender: config.sender_address.clone(),
            receipts: config.receipt_policy(),
            gas_limit: config.gas_limit,
        })
    }

    /// Submit a contract write and wait (bounded) for it to be mined.
    async fn send_contract_tx(&self, contract: &str, data: Vec<u8>) -> LedgerResult<ContractTransaction> {
        let nonce = self.rpc.nonce(&self.sender).await?;
        let gas_price = self.rpc.gas_price().await?;

        let tx = TransactionRequest {
            from: self.sender.clone(),
            to: contract.to_string(),
            data: format!("0x{}", hex::encode(&data)),
            gas: to_quantity(self.gas_limit as u128),
            gas_price: to_quantity(gas_price),
            nonce: to_quantity(nonce as u128),
            value: "0x0".to_string(),
        };
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        debug!("submitted {} (nonce {})", tx_hash, nonce);

        let rpc = &self.rpc;
        let hash = tx_hash.as_str();
        let receipt = retry::poll(self.receipts, |attempt| async move {
            match rpc.receipt(hash).await {
                Ok(Some(receipt)) if receipt.mined_block().is_some() => Some(receipt),
                Ok(_) => {
                    debug!("waiting for block confirmation of {} (attempt {})", hash, attempt);
                    None
                }
                Err(e) => {
                    debug!("receipt lookup for {} failed: {}", hash, e);
                    None
                }
            }
        })
        .await;

        let (block_number, gas_used) = match receipt {
            Some(r) => (r.mined_block().unwrap_or_default(), r.gas_used().unwrap_or(self.gas_limit)),
            None => {
                warn!(
                    "transaction {} sent but no receipt after {} attempts ({:?}); recording block 0",
                    tx_hash,
                    self.receipts.max_attempts,
                    self.receipts.budget()
                );
                (0, self.gas_limit)
            }
        };

        Ok(ContractTransaction {
            tx_hash,
            block_number,
            gas_used,
            gas_price: gas_price.to_string(),
        })
    }

    async fn synthesize(&self, cert_id: &str) -> LedgerResult<ContractTransaction> {
        let height = self.rpc.block_number().await?;
        Ok(ContractTransaction::synthesized(cert_id, height))
    }
}

#[async_trait]
impl LedgerClient for PoaLedger {
    fn variant(&self) -> &'static str {
        "poa"
    }

    async fn issue_simple(
        &self,
        cert_id: &str,
        content_cid: &str,
        cert_type: CertType,
    ) -> LedgerResult<ContractTransaction> {
        let mut record = OnChainRecord::minimal(cert_id, cert_type);
        record.student_wallet = format!("0x{}", "0".repeat(40));
        self.issue_full(&record, content_cid).await
    }

    async fn issue_full(&self, record: &OnChainRecord, content_cid: &str) -> LedgerResult<ContractTransaction> {
        let Some(contract) = self.contract.as_deref() else {
            warn!("contract not deployed; synthesizing transaction for {}", record.cert_id);
            return self.synthesize(&record.cert_id).await;
        };

        info!(
            "anchoring {} (credential {}, metadata {}, wallet {}, cid {})",
            record.cert_id, record.credential_hash, record.metadata_hash, record.student_wallet, content_cid
        );

        let submitted = match contract::issue_calldata(record, content_cid) {
            Ok(data) => self.send_contract_tx(contract, data).await,
            Err(e) => Err(e),
        };
        match submitted {
            Ok(tx) => Ok(tx),
            Err(e) => {
                warn!("on-chain write for {} failed, synthesizing: {}", record.cert_id, e);
                self.synthesize(&record.cert_id).await
            }
        }
    }

    async fn verify(&self, cert_id: &str) -> LedgerResult<bool> {
        match self.contract.as_deref() {
            Some(contract) => contract::verify_certificate(&self.rpc, contract, cert_id).await,
            None => Ok(true),
        }
    }

    async fn fetch_record(&self, cert_id: &str) -> LedgerResult<Option<OnChainRecord>> {
        match self.contract.as_deref() {
            Some(contract) => contract::get_certificate(&self.rpc, contract, cert_id).await,
            None => Ok(None),
        }
    }

    async fn register_wallet(&self, identity_id: &str, address: &str) -> LedgerResult<()> {
        let Some(contract) = self.contract.as_deref() else {
            debug!("no contract; wallet mapping {} -> {} kept off-chain", identity_id, address);
            return Ok(());
        };
        let data = contract::register_wallet_calldata(identity_id, address)?;
        let tx = self.send_contract_tx(contract, data).await?;
        info!("registered wallet for {} in {}", identity_id, tx.tx_hash);
        Ok(())
    }

    async fn fetch_wallet(&self, identity_id: &str) -> LedgerResult<Option<String>> {
        match self.contract.as_deref() {
            Some(contract) => contract::get_student_wallet(&self.rpc, contract, identity_id).await,
            None => Ok(None),
        }
    }

    async fn revoke(&self, cert_id: &str) -> LedgerResult<()> {
        let Some(contract) = self.contract.as_deref() else {
            debug!("no contract; revocation of {} not mirrored", cert_id);
            return Ok(());
        };
        let tx = self.send_contract_tx(contract, contract::revoke_calldata(cert_id)).await?;
        info!("revocation of {} submitted in {} (block {})", cert_id, tx.tx_hash, tx.block_number);
        Ok(())
    }

    async fn status(&self) -> LedgerStatus {
        match self.rpc.block_number().await {
            Ok(height) => LedgerStatus {
                variant: self.variant().to_string(),
                connected: true,
                block_number: Some(height),
                gas_price: self.rpc.gas_price().await.ok().map(|p| p.to_string()),
            },
            Err(e) => {
                warn!("ledger node {} unreachable: {}", self.rpc.url(), e);
                LedgerStatus {
                    variant: self.variant().to_string(),
                    connected: false,
                    block_number: None,
                    gas_price: None,
                }
            }
        }
    }
}
