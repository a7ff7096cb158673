use std::sync::Arc;

use crate::credential::Certificate;
use crate::error::Result;
use crate::store::Store;

/// Read-only views over the certificate index, ordered by issue time.
pub struct CertificateQueries {
    store: Arc<dyn Store>,
}

impl CertificateQueries {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, cert_id: &str) -> Result<Certificate> {
        self.store.get_certificate(cert_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Certificate>> {
        self.store.list_certificates().await
    }

    pub async fn by_student(&self, student_id: &str) -> Result<Vec<Certificate>> {
        self.store.certificates_by_student(student_id).await
    }

    pub async fn by_issuer(&self, issuer_id: &str) -> Result<Vec<Certificate>> {
        self.store.certificates_by_issuer(issuer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::certificate::tests::sample_certificate;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn delegates_to_store() {
        let store = Arc::new(MemoryStore::new());
        store.create_certificate(sample_certificate("0x1")).await.unwrap();
        let queries = CertificateQueries::new(store);

        assert_eq!(queries.get("0x1").await.unwrap().cert_id, "0x1");
        assert_eq!(queries.list_all().await.unwrap().len(), 1);
        assert_eq!(queries.by_student("STU001").await.unwrap().len(), 1);
        assert!(queries.by_issuer("nobody").await.unwrap().is_empty());
        assert!(queries.get("0x2").await.unwrap_err().is_not_found());
    }
}
