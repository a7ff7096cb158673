use crate::content::ContentError;
use crate::ledger::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Failures surfaced by the issuance, verification and revocation services.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("certificate id conflict: {0}")]
    Conflict(String),

    #[error("invalid status transition for {cert_id}: {from} -> {to}")]
    InvalidTransition {
        cert_id: String,
        from: String,
        to: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl CredentialError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<LedgerError> for CredentialError {
    fn from(err: LedgerError) -> Self {
        Self::Upstream(format!("ledger: {err}"))
    }
}

impl From<ContentError> for CredentialError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(msg) => Self::Validation(msg),
            other => Self::Upstream(format!("content store: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_validation_maps_to_validation() {
        let err: CredentialError = ContentError::Validation("file data is empty".into()).into();
        assert!(matches!(err, CredentialError::Validation(_)));
    }

    #[test]
    fn content_transport_maps_to_upstream() {
        let err: CredentialError = ContentError::MissingCredentials.into();
        assert!(matches!(err, CredentialError::Upstream(_)));
        assert!(err.to_string().contains("content store"));
    }

    #[test]
    fn not_found_display_names_the_kind() {
        let err = CredentialError::not_found("certificate", "0xabc");
        assert_eq!(err.to_string(), "certificate not found: 0xabc");
        assert!(err.is_not_found());
    }
}
