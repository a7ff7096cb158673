use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::credential::{Certificate, StatusTransition, Verification};
use crate::error::{CredentialError, Result};
use crate::hashing;
use crate::ledger::{LedgerClient, OnChainRecord};
use crate::store::Store;

const NOT_FOUND: &str = "certificate not found";
const REVOKED: &str = "certificate has been revoked";

/// What the ledger holds for a certificate, next to the stored record.
#[derive(Debug, Clone)]
pub struct OnChainInspection {
    pub certificate: Certificate,
    pub record: Option<OnChainRecord>,
    /// The ledger's credential hash equals the stored file hash.
    pub hash_matches: bool,
}

/// Reconciles stored certificates against the ledger. Verification never
/// returns an error: every failure is an invalid result with a reason.
pub struct VerificationEngine {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
}

impl VerificationEngine {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { store, ledger }
    }

    pub async fn verify(&self, cert_id: &str) -> Verification {
        let cert = match self.load(cert_id).await {
            Ok(cert) => cert,
            Err(invalid) => return invalid,
        };
        self.reconcile(cert).await
    }

    /// Re-hash presented bytes before the normal verification.
    pub async fn verify_document(&self, cert_id: &str, bytes: &[u8]) -> Verification {
        let cert = match self.load(cert_id).await {
            Ok(cert) => cert,
            Err(invalid) => return invalid,
        };
        if hashing::file_digest(bytes) != cert.file_hash {
            return Verification::invalid(cert_id, "file hash mismatch", Some(cert));
        }
        self.reconcile(cert).await
    }

    pub async fn on_chain_record(&self, cert_id: &str) -> Result<OnChainInspection> {
        let certificate = self.store.get_certificate(cert_id).await?;
        let record = self.ledger.fetch_record(cert_id).await?;
        let hash_matches = record
            .as_ref()
            .is_some_and(|r| r.credential_hash == certificate.file_hash);
        Ok(OnChainInspection {
            certificate,
            record,
            hash_matches,
        })
    }

    async fn load(&self, cert_id: &str) -> std::result::Result<Certificate, Verification> {
        match self.store.get_certificate(cert_id).await {
            Ok(cert) => Ok(cert),
            Err(e) if e.is_not_found() => Err(Verification::invalid(cert_id, NOT_FOUND, None)),
            Err(e) => Err(Verification::invalid(
                cert_id,
                format!("certificate lookup failed: {e}"),
                None,
            )),
        }
    }

    async fn reconcile(&self, cert: Certificate) -> Verification {
        let cert_id = cert.cert_id.clone();
        // Revocation is decided off-chain and wins over any ledger answer.
        if cert.is_revoked() {
            return Verification::invalid(&cert_id, REVOKED, Some(cert));
        }

        match self.ledger.verify(&cert_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Verification::invalid(&cert_id, "certificate not anchored on ledger", Some(cert));
            }
            Err(e) => {
                return Verification::invalid(&cert_id, format!("ledger verification failed: {e}"), Some(cert));
            }
        }

        match self
            .store
            .transition(&cert_id, StatusTransition::Verified { at: Utc::now() })
            .await
        {
            Ok(updated) => {
                debug!("certificate {} verified", cert_id);
                Verification::valid(updated)
            }
            Err(CredentialError::InvalidTransition { .. }) => {
                let latest = self.store.get_certificate(&cert_id).await.ok();
                Verification::invalid(&cert_id, REVOKED, latest.or(Some(cert)))
            }
            Err(e) => {
                warn!("failed to record verification of {}: {}", cert_id, e);
                Verification::valid(cert)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CertificateStatus;
    use crate::credential::certificate::tests::sample_certificate;
    use crate::ledger::{Capability, MockLedger};
    use crate::store::MemoryStore;

    async fn anchored(ledger: &MockLedger, cert: &Certificate) {
        let record = OnChainRecord {
            student_id: cert.student_id.clone(),
            credential_hash: cert.file_hash.clone(),
            ..OnChainRecord::minimal(&cert.cert_id, cert.cert_type)
        };
        ledger.issue_full(&record, &cert.content_cid).await.unwrap();
    }

    async fn setup() -> (Arc<MemoryStore>, Arc<MockLedger>, VerificationEngine) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MockLedger::new());
        let cert = sample_certificate("0x1");
        anchored(&ledger, &cert).await;
        store.create_certificate(cert).await.unwrap();
        let engine = VerificationEngine::new(store.clone(), ledger.clone());
        (store, ledger, engine)
    }

    #[tokio::test]
    async fn first_success_moves_to_verified() {
        let (store, _, engine) = setup().await;
        let result = engine.verify("0x1").await;
        assert!(result.is_valid);
        assert!(result.reason.is_none());
        let stored = store.get_certificate("0x1").await.unwrap();
        assert_eq!(stored.status, CertificateStatus::Verified);
        let first = stored.verified_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(engine.verify("0x1").await.is_valid);
        let refreshed = store.get_certificate("0x1").await.unwrap().verified_at.unwrap();
        assert!(refreshed > first);
    }

    #[tokio::test]
    async fn missing_certificate() {
        let (_, _, engine) = setup().await;
        let result = engine.verify("0xnope").await;
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(NOT_FOUND));
        assert!(result.record.is_none());
    }

    #[tokio::test]
    async fn ledger_error_is_reported() {
        let (store, ledger, engine) = setup().await;
        ledger.fail(Capability::Verify, true);
        let result = engine.verify("0x1").await;
        assert!(!result.is_valid);
        assert!(result.reason.unwrap().starts_with("ledger verification failed"));
        assert_eq!(store.get_certificate("0x1").await.unwrap().status, CertificateStatus::Issued);
    }

    #[tokio::test]
    async fn unanchored_certificate_is_invalid() {
        let (store, _, engine) = setup().await;
        store.create_certificate(sample_certificate("0x2")).await.unwrap();
        let result = engine.verify("0x2").await;
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("certificate not anchored on ledger"));
    }

    #[tokio::test]
    async fn revoked_wins_over_ledger_error() {
        let (store, ledger, engine) = setup().await;
        store
            .transition(
                "0x1",
                StatusTransition::Revoked {
                    at: Utc::now(),
                    reason: "fraud".into(),
                },
            )
            .await
            .unwrap();
        ledger.fail(Capability::Verify, true);

        let result = engine.verify("0x1").await;
        assert!(!result.is_valid);
        assert!(result.reason.unwrap().contains("revoked"));
    }

    #[tokio::test]
    async fn document_hash_mismatch() {
        let (_, _, engine) = setup().await;
        let result = engine.verify_document("0x1", b"tampered").await;
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("file hash mismatch"));
    }

    #[tokio::test]
    async fn on_chain_record_matches_stored_hash() {
        let (_, _, engine) = setup().await;
        let inspection = engine.on_chain_record("0x1").await.unwrap();
        assert!(inspection.record.is_some());
        assert!(inspection.hash_matches);
        assert!(engine.on_chain_record("0xnope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn stamp_failure_still_reports_valid() {
        let (store, _, engine) = setup().await;
        store.set_reject_writes(true);
        let result = engine.verify("0x1").await;
        assert!(result.is_valid);
        assert_eq!(result.record.unwrap().status, CertificateStatus::Issued);
    }
}
