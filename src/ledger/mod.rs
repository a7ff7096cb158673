pub mod abi;
pub mod contract;
pub mod error;
pub mod generic;
pub mod mock;
pub mod poa;
pub mod retry;
pub mod rpc;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use generic::GenericRpcLedger;
pub use mock::{Capability, MockLedger};
pub use poa::PoaLedger;
pub use types::{ContractTransaction, LedgerStatus, OnChainRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

use crate::config::{LedgerConfig, LedgerVariant};
use crate::credential::CertType;
use crate::hashing;

/// Capabilities every ledger variant provides. Call sites hold an
/// `Arc<dyn LedgerClient>` and never inspect the concrete variant.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn variant(&self) -> &'static str;

    async fn issue_simple(
        &self,
        cert_id: &str,
        content_cid: &str,
        cert_type: CertType,
    ) -> LedgerResult<ContractTransaction>;

    async fn issue_full(
        &self,
        record: &OnChainRecord,
        content_cid: &str,
    ) -> LedgerResult<ContractTransaction>;

    async fn verify(&self, cert_id: &str) -> LedgerResult<bool>;

    async fn fetch_record(&self, cert_id: &str) -> LedgerResult<Option<OnChainRecord>>;

    async fn register_wallet(&self, identity_id: &str, address: &str) -> LedgerResult<()>;

    async fn fetch_wallet(&self, identity_id: &str) -> LedgerResult<Option<String>>;

    async fn revoke(&self, cert_id: &str) -> LedgerResult<()>;

    async fn status(&self) -> LedgerStatus;

    fn compute_cert_id(&self, file_hash: &str, student_id: &str, issued_at: &DateTime<Utc>) -> String {
        hashing::compute_cert_id(file_hash, student_id, issued_at)
    }
}

/// Select the configured variant once, at composition time.
pub fn connect(config: &LedgerConfig) -> LedgerResult<Arc<dyn LedgerClient>> {
    let client: Arc<dyn LedgerClient> = match config.variant {
        LedgerVariant::Poa => Arc::new(PoaLedger::from_config(config)?),
        LedgerVariant::Generic => Arc::new(GenericRpcLedger::from_config(config)?),
        LedgerVariant::Mock => Arc::new(MockLedger::new()),
    };
    info!("ledger client selected: {}", client.variant());
    Ok(client)
}
