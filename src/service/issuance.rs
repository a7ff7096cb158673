//! Issuance saga: content store, wallet directory, ledger, then the store
//! commit. Nothing before the commit is rolled back on a later failure.

use chrono::{DateTime, Timelike, Utc};
use log::{info, warn};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::into_persistence;
use crate::content::ContentStore;
use crate::credential::{CertType, Certificate, CertificateStatus, IssueRequest};
use crate::error::{CredentialError, Result};
use crate::hashing;
use crate::identity::{PermissionGate, User, WalletDirectory, WalletRole};
use crate::ledger::{ContractTransaction, LedgerClient, OnChainRecord};
use crate::store::Store;

pub struct IssuanceOrchestrator {
    store: Arc<dyn Store>,
    content: Arc<dyn ContentStore>,
    ledger: Arc<dyn LedgerClient>,
    wallets: Arc<WalletDirectory>,
    permissions: Arc<dyn PermissionGate>,
}

impl IssuanceOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        content: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
        wallets: Arc<WalletDirectory>,
        permissions: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            store,
            content,
            ledger,
            wallets,
            permissions,
        }
    }

    pub async fn issue(&self, request: &IssueRequest, issuer_id: &str) -> Result<Certificate> {
        request.validate()?;
        let issued_at = whole_seconds(Utc::now());

        let student = self.store.get_user_by_student_id(&request.student_id).await?;
        let issuer = self.load_issuer(issuer_id).await?;
        self.authorize(&issuer, request.cert_type)?;

        let file_hash = hashing::file_digest(&request.file_data);
        let metadata = self.metadata_map(request, &student, &issuer, &issued_at);
        let metadata_hash = hashing::metadata_digest(&metadata)?;

        let receipt = self
            .content
            .upload(&request.file_data, &request.file_name, &metadata)
            .await?;
        let content_url = self.content.content_url(&receipt.cid);

        let student_wallet = self.wallets.resolve(&request.student_id, WalletRole::Student).await;
        let issuer_wallet = self.wallets.resolve(issuer_id, WalletRole::Issuer).await;

        let cert_id = self
            .ledger
            .compute_cert_id(&file_hash, &request.student_id, &issued_at);
        match self.store.get_certificate(&cert_id).await {
            Ok(existing) => return reissue(existing, issuer_id, request.cert_type),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let record = OnChainRecord {
            cert_id: cert_id.clone(),
            student_id: request.student_id.clone(),
            credential_hash: file_hash.clone(),
            metadata_hash: metadata_hash.clone(),
            issuer_address: issuer_wallet.clone(),
            student_wallet: student_wallet.clone(),
            cert_type: request.cert_type,
            timestamp: issued_at.timestamp(),
        };
        let tx = self.anchor(&record, &receipt.cid).await?;

        let mut cert_metadata = request.metadata.clone();
        fill_names(&mut cert_metadata, &student, &issuer);
        cert_metadata
            .additional_data
            .insert("metadata_hash".into(), Value::String(metadata_hash));
        cert_metadata
            .additional_data
            .insert("student_wallet".into(), Value::String(student_wallet));
        cert_metadata
            .additional_data
            .insert("issuer_wallet".into(), Value::String(issuer_wallet));

        let certificate = Certificate {
            cert_id: cert_id.clone(),
            student_id: request.student_id.clone(),
            issuer_id: issuer_id.to_string(),
            cert_type: request.cert_type,
            file_hash,
            content_cid: receipt.cid,
            content_url,
            tx_hash: tx.tx_hash,
            block_number: tx.block_number,
            status: CertificateStatus::Issued,
            issued_at,
            verified_at: None,
            revoked_at: None,
            revoke_reason: None,
            metadata: cert_metadata,
        };

        match self.store.create_certificate(certificate.clone()).await {
            Ok(()) => {}
            Err(CredentialError::Conflict(_)) => {
                let existing = self.store.get_certificate(&cert_id).await?;
                return reissue(existing, issuer_id, request.cert_type);
            }
            Err(e) => return Err(into_persistence(e)),
        }

        info!(
            "issued {} certificate {} to {} (tx {}, block {})",
            certificate.cert_type, certificate.cert_id, certificate.student_id, certificate.tx_hash,
            certificate.block_number
        );
        Ok(certificate)
    }

    async fn load_issuer(&self, issuer_id: &str) -> Result<User> {
        self.store.get_user(issuer_id).await.map_err(|e| {
            if e.is_not_found() {
                CredentialError::not_found("issuer", issuer_id)
            } else {
                e
            }
        })
    }

    fn authorize(&self, issuer: &User, cert_type: CertType) -> Result<()> {
        if !issuer.is_active {
            return Err(CredentialError::Permission(format!("issuer {} is inactive", issuer.id)));
        }
        if !self.permissions.can_issue(issuer.role, cert_type) {
            return Err(CredentialError::Permission(format!(
                "issuer {} ({}) does not have permission to issue {} certificates",
                issuer.id,
                issuer.role.display_name(),
                cert_type
            )));
        }
        Ok(())
    }

    fn metadata_map(
        &self,
        request: &IssueRequest,
        student: &User,
        issuer: &User,
        issued_at: &DateTime<Utc>,
    ) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::from([
            ("student_id".to_string(), json!(request.student_id)),
            ("student_name".to_string(), json!(student.name)),
            ("issuer_id".to_string(), json!(issuer.id)),
            ("issuer_name".to_string(), json!(issuer.name)),
            ("cert_type".to_string(), json!(request.cert_type.as_str())),
            ("issued_at".to_string(), json!(hashing::cert_timestamp(issued_at))),
        ]);
        for (k, v) in &request.metadata.additional_data {
            map.insert(k.clone(), v.clone());
        }
        map
    }

    /// Full write first, then one simple write; both failing aborts.
    async fn anchor(&self, record: &OnChainRecord, cid: &str) -> Result<ContractTransaction> {
        match self.ledger.issue_full(record, cid).await {
            Ok(tx) => Ok(tx),
            Err(primary) => {
                warn!(
                    "full on-chain issuance of {} failed, using simple issuance: {}",
                    record.cert_id, primary
                );
                self.ledger
                    .issue_simple(&record.cert_id, cid, record.cert_type)
                    .await
                    .map_err(|fallback| {
                        CredentialError::Upstream(format!(
                            "failed to issue certificate on ledger: {primary}; fallback: {fallback}"
                        ))
                    })
            }
        }
    }
}

fn whole_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0).unwrap_or(t)
}

fn fill_names(metadata: &mut crate::credential::CertificateMetadata, student: &User, issuer: &User) {
    if metadata.student_name.is_empty() {
        metadata.student_name = student.name.clone();
    }
    if metadata.student_email.is_empty() {
        metadata.student_email = student.email.clone();
    }
    if metadata.issuer_name.is_empty() {
        metadata.issuer_name = issuer.name.clone();
    }
    if metadata.issuer_role.is_empty() {
        metadata.issuer_role = issuer.role.to_string();
    }
    if metadata.institution.is_empty() {
        metadata.institution = issuer.institution.clone();
    }
}

/// Same id, issuer and type is a retry of an earlier issuance; anything else
/// sharing the id is a collision.
fn reissue(existing: Certificate, issuer_id: &str, cert_type: CertType) -> Result<Certificate> {
    if existing.issuer_id == issuer_id && existing.cert_type == cert_type {
        info!("certificate {} already issued; returning existing record", existing.cert_id);
        Ok(existing)
    } else {
        Err(CredentialError::Conflict(format!(
            "{} is already held by a {} certificate from {}",
            existing.cert_id, existing.cert_type, existing.issuer_id
        )))
    }
}
