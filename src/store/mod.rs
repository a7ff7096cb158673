pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::credential::{Certificate, StatusTransition};
use crate::error::Result;
use crate::identity::User;

/// Durable index of users and certificates.
///
/// Each write is all-or-nothing per record; readers never observe a
/// partially written certificate.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: User) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<User>;

    async fn get_user_by_student_id(&self, student_id: &str) -> Result<User>;

    /// Fails with `Conflict` if the cert id is already taken.
    async fn create_certificate(&self, certificate: Certificate) -> Result<()>;

    async fn get_certificate(&self, cert_id: &str) -> Result<Certificate>;

    /// Apply `transition` atomically and return the updated record.
    async fn transition(&self, cert_id: &str, transition: StatusTransition) -> Result<Certificate>;

    async fn list_certificates(&self) -> Result<Vec<Certificate>>;

    async fn certificates_by_student(&self, student_id: &str) -> Result<Vec<Certificate>>;

    async fn certificates_by_issuer(&self, issuer_id: &str) -> Result<Vec<Certificate>>;

    async fn certificate_count(&self) -> Result<usize>;
}
