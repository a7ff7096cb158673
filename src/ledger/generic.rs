//! Ledger client for any Ethereum-compatible JSON-RPC node.
//!
//! Reads go to the contract through `eth_call`. Writes are simulated: this
//! variant holds no signing key, so issuance returns a synthesized
//! transaction at the node's current height.

use async_trait::async_trait;
use log::{info, warn};

use super::contract;
use super::error::{LedgerError, LedgerResult};
use super::rpc::RpcClient;
use super::types::{ContractTransaction, LedgerStatus, OnChainRecord};
use super::LedgerClient;
use crate::config::LedgerConfig;
use crate::credential::CertType;

pub struct GenericRpcLedger {
    rpc: RpcClient,
    contract: Option<String>,
}

impl GenericRpcLedger {
    pub fn from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        let url = config
            .rpc_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| LedgerError::Transport("blockchain RPC URL not configured".into()))?;
        Ok(Self {
            rpc: RpcClient::new(url, config.request_timeout())?,
            contract: config.contract_address.clone(),
        })
    }
}

#[async_trait]
impl LedgerClient for GenericRpcLedger {
    fn variant(&self) -> &'static str {
        "generic"
    }

    async fn issue_simple(
        &self,
        cert_id: &str,
        _content_cid: &str,
        cert_type: CertType,
    ) -> LedgerResult<ContractTransaction> {
        let height = self.rpc.block_number().await?;
        info!("simulated {} issuance of {} at height {}", cert_type, cert_id, height);
        Ok(ContractTransaction::synthesized(cert_id, height))
    }

    async fn issue_full(&self, record: &OnChainRecord, _content_cid: &str) -> LedgerResult<ContractTransaction> {
        let height = self.rpc.block_number().await?;
        info!(
            "simulated issuance of {} for {} at height {}",
            record.cert_id, record.student_id, height
        );
        Ok(ContractTransaction::synthesized(&record.cert_id, height))
    }

    async fn verify(&self, cert_id: &str) -> LedgerResult<bool> {
        match self.contract.as_deref() {
            Some(contract) => contract::verify_certificate(&self.rpc, contract, cert_id).await,
            // writes never reach a contract, so there is nothing to contradict
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
        warn!(
            "wallet registration for {} ({}) is not submitted by the generic ledger",
            identity_id, address
        );
        Ok(())
    }

    async fn fetch_wallet(&self, identity_id: &str) -> LedgerResult<Option<String>> {
        match self.contract.as_deref() {
            Some(contract) => contract::get_student_wallet(&self.rpc, contract, identity_id).await,
            None => Ok(None),
        }
    }

    async fn revoke(&self, cert_id: &str) -> LedgerResult<()> {
        warn!("revocation of {} is not submitted by the generic ledger", cert_id);
        Ok(())
    }

    async fn status(&self) -> LedgerStatus {
        let block_number = self.rpc.block_number().await.ok();
        LedgerStatus {
            variant: self.variant().to_string(),
            connected: block_number.is_some(),
            block_number,
            gas_price: None,
        }
    }
}
