use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::Store;
use crate::credential::{Certificate, StatusTransition};
use crate::error::{CredentialError, Result};
use crate::identity::User;

#[derive(Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    certificates: Arc<RwLock<HashMap<String, Certificate>>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make certificate writes fail with a persistence error.
    pub fn set_reject_writes(&self, on: bool) {
        self.reject_writes.store(on, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            Err(CredentialError::Persistence("store is read-only".into()))
        } else {
            Ok(())
        }
    }

    async fn filtered<F>(&self, keep: F) -> Vec<Certificate>
    where
        F: Fn(&Certificate) -> bool,
    {
        let mut certs: Vec<Certificate> = self
            .certificates
            .read()
            .await
            .values()
            .filter(|c| keep(c))
            .cloned()
            .collect();
        certs.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.cert_id.cmp(&b.cert_id)));
        certs
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(CredentialError::Conflict(format!("user {} already exists", user.id)));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        self.users
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CredentialError::not_found("user", id))
    }

    async fn get_user_by_student_id(&self, student_id: &str) -> Result<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.student_id.as_deref() == Some(student_id))
            .cloned()
            .ok_or_else(|| CredentialError::not_found("student", student_id))
    }

    async fn create_certificate(&self, certificate: Certificate) -> Result<()> {
        self.check_writable()?;
        let mut certs = self.certificates.write().await;
        if certs.contains_key(&certificate.cert_id) {
            return Err(CredentialError::Conflict(certificate.cert_id));
        }
        certs.insert(certificate.cert_id.clone(), certificate);
        Ok(())
    }

    async fn get_certificate(&self, cert_id: &str) -> Result<Certificate> {
        self.certificates
            .read()
            .await
            .get(cert_id)
            .cloned()
            .ok_or_else(|| CredentialError::not_found("certificate", cert_id))
    }

    async fn transition(&self, cert_id: &str, transition: StatusTransition) -> Result<Certificate> {
        self.check_writable()?;
        let mut certs = self.certificates.write().await;
        let stored = certs
            .get_mut(cert_id)
            .ok_or_else(|| CredentialError::not_found("certificate", cert_id))?;

        // Mutate a copy so a rejected transition leaves the record untouched.
        let mut updated = stored.clone();
        updated.apply(&transition)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>> {
        Ok(self.filtered(|_| true).await)
    }

    async fn certificates_by_student(&self, student_id: &str) -> Result<Vec<Certificate>> {
        Ok(self.filtered(|c| c.student_id == student_id).await)
    }

    async fn certificates_by_issuer(&self, issuer_id: &str) -> Result<Vec<Certificate>> {
        Ok(self.filtered(|c| c.issuer_id == issuer_id).await)
    }

    async fn certificate_count(&self) -> Result<usize> {
        Ok(self.certificates.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CertificateStatus;
    use crate::credential::certificate::tests::sample_certificate;
    use crate::identity::Role;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn users_by_id_and_student_id() {
        let store = MemoryStore::new();
        store.create_user(User::student("u1", "Asha", "STU001")).await.unwrap();
        store.create_user(User::new("coe-1", "Ravi", Role::Coe)).await.unwrap();

        assert_eq!(store.get_user_by_student_id("STU001").await.unwrap().id, "u1");
        assert_eq!(store.get_user("coe-1").await.unwrap().role, Role::Coe);
        assert!(store.get_user("nobody").await.unwrap_err().is_not_found());
        assert!(matches!(
            store.create_user(User::new("coe-1", "Dup", Role::Coe)).await,
            Err(CredentialError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_cert_id_conflicts() {
        let store = MemoryStore::new();
        store.create_certificate(sample_certificate("0x1")).await.unwrap();
        let err = store.create_certificate(sample_certificate("0x1")).await.unwrap_err();
        assert!(matches!(err, CredentialError::Conflict(_)));
        assert_eq!(store.certificate_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_transition_leaves_record_untouched() {
        let store = MemoryStore::new();
        store.create_certificate(sample_certificate("0x1")).await.unwrap();
        let revoked = store
            .transition(
                "0x1",
                StatusTransition::Revoked {
                    at: Utc::now(),
                    reason: "error".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(revoked.status, CertificateStatus::Revoked);

        let err = store
            .transition("0x1", StatusTransition::Verified { at: Utc::now() })
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidTransition { .. }));
        let stored = store.get_certificate("0x1").await.unwrap();
        assert!(stored.verified_at.is_none());
        assert_eq!(stored.revoke_reason.as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn listings_are_ordered_by_issue_time() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut later = sample_certificate("0xb");
        later.issued_at = now;
        let mut earlier = sample_certificate("0xa");
        earlier.issued_at = now - Duration::seconds(30);
        let mut other = sample_certificate("0xc");
        other.student_id = "STU999".into();
        other.issuer_id = "faculty-1".into();
        other.issued_at = now - Duration::seconds(10);
        for c in [later, earlier, other] {
            store.create_certificate(c).await.unwrap();
        }

        let ids: Vec<String> = store
            .list_certificates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.cert_id)
            .collect();
        assert_eq!(ids, ["0xa", "0xc", "0xb"]);
        assert_eq!(store.certificates_by_student("STU001").await.unwrap().len(), 2);
        assert_eq!(store.certificates_by_issuer("faculty-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_writes_are_persistence_errors() {
        let store = MemoryStore::new();
        store.set_reject_writes(true);
        let err = store.create_certificate(sample_certificate("0x1")).await.unwrap_err();
        assert!(matches!(err, CredentialError::Persistence(_)));
        assert_eq!(store.certificate_count().await.unwrap(), 0);
    }
}
