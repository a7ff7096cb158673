use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::credential::CertType;

pub const DEFAULT_GAS_USED: u64 = 200_000;
/// 20 gwei, in wei.
pub const DEFAULT_GAS_PRICE: &str = "20000000000";

/// Payload anchored on the ledger for one issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnChainRecord {
    pub cert_id: String,
    pub student_id: String,
    pub credential_hash: String,
    pub metadata_hash: String,
    pub issuer_address: String,
    pub student_wallet: String,
    pub cert_type: CertType,
    pub timestamp: i64,
}

impl OnChainRecord {
    /// Record carrying only the id and type, used by the simple issuance path.
    pub fn minimal(cert_id: &str, cert_type: CertType) -> Self {
        Self {
            cert_id: cert_id.to_string(),
            student_id: String::new(),
            credential_hash: String::new(),
            metadata_hash: String::new(),
            issuer_address: String::new(),
            student_wallet: String::new(),
            cert_type,
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Result of a ledger write, real or synthesized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractTransaction {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub gas_price: String,
}

impl ContractTransaction {
    /// Stand-in transaction when the live write is unavailable: the hash is
    /// `sha256(cert_id || wall-clock nanos)` and the block is the current height.
    pub fn synthesized(cert_id: &str, block_number: u64) -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let digest = Sha256::digest(format!("{cert_id}{nanos}").as_bytes());
        Self {
            tx_hash: format!("0x{}", hex::encode(digest)),
            block_number,
            gas_used: DEFAULT_GAS_USED,
            gas_price: DEFAULT_GAS_PRICE.to_string(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_number > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerStatus {
    pub variant: String,
    pub connected: bool,
    pub block_number: Option<u64>,
    pub gas_price: Option<String>,
}
