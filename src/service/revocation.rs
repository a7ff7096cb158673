use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;

use super::into_persistence;
use crate::credential::{Certificate, StatusTransition};
use crate::error::{CredentialError, Result};
use crate::ledger::LedgerClient;
use crate::store::Store;

/// Off-chain status is authoritative; the ledger mirror is advisory.
pub struct RevocationHandler {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
}

impl RevocationHandler {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { store, ledger }
    }

    pub async fn revoke(&self, cert_id: &str, reason: &str) -> Result<Certificate> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CredentialError::Validation("revocation reason is required".into()));
        }

        let current = self.store.get_certificate(cert_id).await?;
        if current.is_revoked() {
            return Err(CredentialError::InvalidTransition {
                cert_id: cert_id.to_string(),
                from: current.status.to_string(),
                to: "revoked".into(),
            });
        }

        let revoked = self
            .store
            .transition(
                cert_id,
                StatusTransition::Revoked {
                    at: Utc::now(),
                    reason: reason.to_string(),
                },
            )
            .await
            .map_err(into_persistence)?;
        info!("certificate {} revoked: {}", cert_id, reason);

        if let Err(e) = self.ledger.revoke(cert_id).await {
            warn!("failed to mirror revocation of {} to ledger: {}", cert_id, e);
        }
        Ok(revoked)
    }
}
