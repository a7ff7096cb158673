pub mod issuance;
pub mod queries;
pub mod revocation;
pub mod verification;

pub use issuance::IssuanceOrchestrator;
pub use queries::CertificateQueries;
pub use revocation::RevocationHandler;
pub use verification::{OnChainInspection, VerificationEngine};

use crate::error::CredentialError;

/// Store write failures that are not already domain errors become `Persistence`.
pub(crate) fn into_persistence(err: CredentialError) -> CredentialError {
    match err {
        CredentialError::Persistence(_)
        | CredentialError::Conflict(_)
        | CredentialError::NotFound { .. }
        | CredentialError::InvalidTransition { .. } => err,
        other => CredentialError::Persistence(other.to_string()),
    }
}
