use log::{info, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::content::{ContentStore, MemoryContentStore, PinataClient};
use crate::error::{CredentialError, Result};
use crate::identity::{PermissionGate, RoleTable, WalletDirectory};
use crate::ledger::{self, LedgerClient};
use crate::report::RegistryReport;
use crate::service::{CertificateQueries, IssuanceOrchestrator, RevocationHandler, VerificationEngine};
use crate::store::{MemoryStore, Store};

/// Composition root. One ledger variant is selected here and shared by every
/// service as the same trait object.
pub struct CredentialSystem {
    pub store: Arc<dyn Store>,
    pub content: Arc<dyn ContentStore>,
    pub ledger: Arc<dyn LedgerClient>,
    pub wallets: Arc<WalletDirectory>,
    pub issuance: IssuanceOrchestrator,
    pub verification: VerificationEngine,
    pub revocation: RevocationHandler,
    pub queries: CertificateQueries,
}

impl CredentialSystem {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let ledger = ledger::connect(&config.ledger)?;

        let content: Arc<dyn ContentStore> = if config.content.has_credentials() {
            Arc::new(PinataClient::new(&config.content)?)
        } else {
            warn!("Pinata credentials not configured; using the in-memory content store");
            Arc::new(MemoryContentStore::new(config.content.gateway_url.clone()))
        };

        Ok(Self::with_components(
            Arc::new(MemoryStore::new()),
            content,
            ledger,
            Arc::new(RoleTable),
            config.wallets.cache_size,
        ))
    }

    pub fn with_components(
        store: Arc<dyn Store>,
        content: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
        permissions: Arc<dyn PermissionGate>,
        wallet_cache_size: usize,
    ) -> Self {
        let wallets = Arc::new(WalletDirectory::new(ledger.clone(), wallet_cache_size));
        info!("credential system using the {} ledger", ledger.variant());

        Self {
            issuance: IssuanceOrchestrator::new(
                store.clone(),
                content.clone(),
                ledger.clone(),
                wallets.clone(),
                permissions,
            ),
            verification: VerificationEngine::new(store.clone(), ledger.clone()),
            revocation: RevocationHandler::new(store.clone(), ledger.clone()),
            queries: CertificateQueries::new(store.clone()),
            store,
            content,
            ledger,
            wallets,
        }
    }

    pub async fn report(&self) -> Result<RegistryReport> {
        let certificates = self.queries.list_all().await?;
        let status = self.ledger.status().await;
        Ok(RegistryReport::build(&certificates, &status, self.wallets.cache_stats()))
    }

    /// Ledger and content store reachability, for startup checks.
    pub async fn health_check(&self) -> Result<()> {
        let status = self.ledger.status().await;
        if !status.connected {
            return Err(CredentialError::Upstream(format!(
                "{} ledger is not reachable",
                status.variant
            )));
        }
        self.content.check_connection().await?;
        Ok(())
    }
}
