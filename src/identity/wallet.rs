use log::{debug, warn};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::hashing;
use crate::ledger::LedgerClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletRole {
    Student,
    Issuer,
}

impl WalletRole {
    pub fn prefix(&self) -> &'static str {
        match self {
            WalletRole::Student => "student",
            WalletRole::Issuer => "issuer",
        }
    }

    /// Key the mapping is stored under on the ledger. Student ids stay bare
    /// to match the contract's student wallet table; issuer ids are prefixed
    /// so an issuer never shadows a student with the same id.
    pub fn ledger_key(&self, identity_id: &str) -> String {
        match self {
            WalletRole::Student => identity_id.to_string(),
            WalletRole::Issuer => format!("{}:{}", self.prefix(), identity_id),
        }
    }
}

/// Maps identities to ledger addresses. Registered mappings win; otherwise
/// the address is derived deterministically and registered best-effort.
pub struct WalletDirectory {
    ledger: Arc<dyn LedgerClient>,
    cache: Mutex<LruCache<(WalletRole, String), String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl WalletDirectory {
    pub fn new(ledger: Arc<dyn LedgerClient>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            ledger,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Never fails: every error path ends at the derived address.
    pub async fn resolve(&self, identity_id: &str, role: WalletRole) -> String {
        let key = (role, identity_id.to_string());
        if let Some(address) = self.cache.lock().await.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return address.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let address = match self.ledger.fetch_wallet(&role.ledger_key(identity_id)).await {
            Ok(Some(address)) => {
                debug!("wallet for {} found on ledger: {}", identity_id, address);
                address
            }
            Ok(None) => self.derive_and_register(identity_id, role).await,
            Err(e) => {
                warn!("wallet lookup for {} failed: {}", identity_id, e);
                self.derive_and_register(identity_id, role).await
            }
        };

        self.cache.lock().await.put(key, address.clone());
        address
    }

    async fn derive_and_register(&self, identity_id: &str, role: WalletRole) -> String {
        let address = hashing::derive_address(role.prefix(), identity_id);
        if let Err(e) = self.ledger.register_wallet(&role.ledger_key(identity_id), &address).await {
            warn!("failed to register wallet {} for {}: {}", address, identity_id, e);
        }
        address
    }

    /// (hits, misses) of the resolution cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Capability, MockLedger};

    #[tokio::test]
    async fn derives_and_registers_on_miss() {
        let ledger = Arc::new(MockLedger::new());
        let directory = WalletDirectory::new(ledger.clone(), 8);

        let address = directory.resolve("STU001", WalletRole::Student).await;
        assert_eq!(address, hashing::derive_address("student", "STU001"));
        assert_eq!(ledger.fetch_wallet("STU001").await.unwrap(), Some(address));
    }

    #[tokio::test]
    async fn registered_mapping_wins() {
        let ledger = Arc::new(MockLedger::new());
        ledger.register_wallet("STU002", "0xregistered").await.unwrap();
        let directory = WalletDirectory::new(ledger, 8);

        assert_eq!(directory.resolve("STU002", WalletRole::Student).await, "0xregistered");
    }

    #[tokio::test]
    async fn ledger_failures_are_not_fatal() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail(Capability::FetchWallet, true);
        ledger.fail(Capability::RegisterWallet, true);
        let directory = WalletDirectory::new(ledger, 8);

        let address = directory.resolve("coe-1", WalletRole::Issuer).await;
        assert_eq!(address, hashing::derive_address("issuer", "coe-1"));
    }

    #[tokio::test]
    async fn second_resolution_hits_cache() {
        let ledger = Arc::new(MockLedger::new());
        let directory = WalletDirectory::new(ledger.clone(), 8);

        let first = directory.resolve("STU003", WalletRole::Student).await;
        ledger.fail(Capability::FetchWallet, true);
        let second = directory.resolve("STU003", WalletRole::Student).await;
        assert_eq!(first, second);
        assert_eq!(directory.cache_stats(), (1, 1));
    }

    #[tokio::test]
    async fn issuer_and_student_sharing_an_id_stay_apart() {
        let ledger = Arc::new(MockLedger::new());
        let directory = WalletDirectory::new(ledger.clone(), 8);

        let student = directory.resolve("ID42", WalletRole::Student).await;
        let issuer = directory.resolve("ID42", WalletRole::Issuer).await;
        assert_ne!(student, issuer);
        assert_eq!(issuer, hashing::derive_address("issuer", "ID42"));
        assert_eq!(ledger.fetch_wallet("ID42").await.unwrap(), Some(student));
        assert_eq!(ledger.fetch_wallet("issuer:ID42").await.unwrap(), Some(issuer));
    }
}
