//! In-process ledger. Every write is sealed into its own block immediately,
//! so records are confirmed as soon as the call returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::error::{LedgerError, LedgerResult};
use super::types::{ContractTransaction, DEFAULT_GAS_PRICE, DEFAULT_GAS_USED, LedgerStatus, OnChainRecord};
use super::LedgerClient;
use crate::credential::CertType;

/// Ledger operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    IssueFull,
    IssueSimple,
    Verify,
    FetchRecord,
    RegisterWallet,
    FetchWallet,
    Revoke,
}

impl Capability {
    const COUNT: usize = 7;

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Capability::IssueFull => "issue_full",
            Capability::IssueSimple => "issue_simple",
            Capability::Verify => "verify",
            Capability::FetchRecord => "fetch_record",
            Capability::RegisterWallet => "register_wallet",
            Capability::FetchWallet => "fetch_wallet",
            Capability::Revoke => "revoke",
        }
    }
}

#[derive(Debug, Clone)]
struct SealedBlock {
    index: u64,
    timestamp: DateTime<Utc>,
    transactions: Vec<String>,
    previous_hash: String,
    hash: String,
}

impl SealedBlock {
    fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: Utc::now(),
            transactions: Vec::new(),
            previous_hash: "0".to_string(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    fn compute_hash(&self) -> String {
        let data = format!(
            "{}{}{}{}",
            self.index,
            self.timestamp.timestamp_nanos_opt().unwrap_or_default(),
            self.transactions.join(","),
            self.previous_hash
        );
        format!("{:x}", Sha256::digest(data.as_bytes()))
    }
}

#[derive(Default)]
struct MockState {
    chain: Vec<SealedBlock>,
    records: HashMap<String, (OnChainRecord, String)>,
    wallets: HashMap<String, String>,
    revoked: HashSet<String>,
}

impl MockState {
    /// Seal `payload` into a new block and return its transaction.
    fn seal(&mut self, payload: &str) -> ContractTransaction {
        let (index, previous_hash) = match self.chain.last() {
            Some(last) => (last.index + 1, last.hash.clone()),
            None => (0, "0".to_string()),
        };
        let timestamp = Utc::now();
        let tx_hash = format!(
            "0x{:x}",
            Sha256::digest(format!("{payload}{index}{}", timestamp.timestamp_nanos_opt().unwrap_or_default()).as_bytes())
        );
        let mut block = SealedBlock {
            index,
            timestamp,
            transactions: vec![tx_hash.clone()],
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        self.chain.push(block);

        ContractTransaction {
            tx_hash,
            block_number: index,
            gas_used: DEFAULT_GAS_USED,
            gas_price: DEFAULT_GAS_PRICE.to_string(),
        }
    }
}

pub struct MockLedger {
    state: RwLock<MockState>,
    faults: [AtomicBool; Capability::COUNT],
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState {
                chain: vec![SealedBlock::genesis()],
                ..MockState::default()
            }),
            faults: Default::default(),
        }
    }

    /// Make `capability` fail (or recover) on subsequent calls.
    pub fn fail(&self, capability: Capability, on: bool) {
        self.faults[capability.index()].store(on, Ordering::SeqCst);
    }

    fn check(&self, capability: Capability) -> LedgerResult<()> {
        if self.faults[capability.index()].load(Ordering::SeqCst) {
            Err(LedgerError::Fault(capability.name()))
        } else {
            Ok(())
        }
    }

    pub async fn chain_height(&self) -> u64 {
        self.state.read().await.chain.last().map(|b| b.index).unwrap_or_default()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.chain.iter().map(|b| b.transactions.len()).sum()
    }

    /// Whether every block links to its predecessor's hash.
    pub async fn is_chain_valid(&self) -> bool {
        let state = self.state.read().await;
        state.chain.windows(2).all(|pair| {
            pair[1].previous_hash == pair[0].hash && pair[1].hash == pair[1].compute_hash()
        })
    }

    pub async fn is_revoked(&self, cert_id: &str) -> bool {
        self.state.read().await.revoked.contains(cert_id)
    }

    pub async fn content_cid(&self, cert_id: &str) -> Option<String> {
        self.state.read().await.records.get(cert_id).map(|(_, cid)| cid.clone())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn variant(&self) -> &'static str {
        "mock"
    }

    async fn issue_simple(
        &self,
        cert_id: &str,
        content_cid: &str,
        cert_type: CertType,
    ) -> LedgerResult<ContractTransaction> {
        self.check(Capability::IssueSimple)?;
        let record = OnChainRecord::minimal(cert_id, cert_type);
        let mut state = self.state.write().await;
        let tx = state.seal(cert_id);
        state.records.insert(cert_id.to_string(), (record, content_cid.to_string()));
        debug!("mock ledger: simple issuance of {} in block {}", cert_id, tx.block_number);
        Ok(tx)
    }

    async fn issue_full(&self, record: &OnChainRecord, content_cid: &str) -> LedgerResult<ContractTransaction> {
        self.check(Capability::IssueFull)?;
        let mut state = self.state.write().await;
        let tx = state.seal(&record.cert_id);
        state
            .records
            .insert(record.cert_id.clone(), (record.clone(), content_cid.to_string()));
        debug!("mock ledger: issued {} in block {}", record.cert_id, tx.block_number);
        Ok(tx)
    }

    async fn verify(&self, cert_id: &str) -> LedgerResult<bool> {
        self.check(Capability::Verify)?;
        let state = self.state.read().await;
        Ok(state.records.contains_key(cert_id) && !state.revoked.contains(cert_id))
    }

    async fn fetch_record(&self, cert_id: &str) -> LedgerResult<Option<OnChainRecord>> {
        self.check(Capability::FetchRecord)?;
        Ok(self.state.read().await.records.get(cert_id).map(|(r, _)| r.clone()))
    }

    async fn register_wallet(&self, identity_id: &str, address: &str) -> LedgerResult<()> {
        self.check(Capability::RegisterWallet)?;
        let mut state = self.state.write().await;
        state.seal(identity_id);
        state.wallets.insert(identity_id.to_string(), address.to_string());
        Ok(())
    }

    async fn fetch_wallet(&self, identity_id: &str) -> LedgerResult<Option<String>> {
        self.check(Capability::FetchWallet)?;
        Ok(self.state.read().await.wallets.get(identity_id).cloned())
    }

    async fn revoke(&self, cert_id: &str) -> LedgerResult<()> {
        self.check(Capability::Revoke)?;
        let mut state = self.state.write().await;
        if !state.records.contains_key(cert_id) {
            return Err(LedgerError::NotFound(cert_id.to_string()));
        }
        let tx = state.seal(cert_id);
        state.revoked.insert(cert_id.to_string());
        info!("mock ledger: revoked {} in block {}", cert_id, tx.block_number);
        Ok(())
    }

    async fn status(&self) -> LedgerStatus {
        LedgerStatus {
            variant: self.variant().to_string(),
            connected: true,
            block_number: Some(self.chain_height().await),
            gas_price: Some(DEFAULT_GAS_PRICE.to_string()),
        }
    }
}
