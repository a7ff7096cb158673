use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CredentialError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CertType {
    Marksheet,
    Degree,
    Bonafide,
    Noc,
    #[serde(alias = "participation_cert")]
    Participation,
}

impl CertType {
    pub const ALL: [CertType; 5] = [
        CertType::Marksheet,
        CertType::Degree,
        CertType::Bonafide,
        CertType::Noc,
        CertType::Participation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::Marksheet => "marksheet",
            CertType::Degree => "degree",
            CertType::Bonafide => "bonafide",
            CertType::Noc => "noc",
            CertType::Participation => "participation",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle: issued -> verified -> revoked. Revoked is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Issued,
    Verified,
    Revoked,
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CertificateStatus::Issued => "issued",
            CertificateStatus::Verified => "verified",
            CertificateStatus::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CertificateMetadata {
    pub student_name: String,
    #[serde(default)]
    pub student_email: String,
    pub issuer_name: String,
    #[serde(default)]
    pub issuer_role: String,
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgpa: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub additional_data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub cert_id: String,
    pub student_id: String,
    pub issuer_id: String,
    pub cert_type: CertType,
    pub file_hash: String,
    pub content_cid: String,
    pub content_url: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub status: CertificateStatus,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_reason: Option<String>,
    pub metadata: CertificateMetadata,
}

/// A status change applied to a stored certificate under the store's lock.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransition {
    Verified { at: DateTime<Utc> },
    Revoked { at: DateTime<Utc>, reason: String },
}

impl StatusTransition {
    fn target(&self) -> CertificateStatus {
        match self {
            StatusTransition::Verified { .. } => CertificateStatus::Verified,
            StatusTransition::Revoked { .. } => CertificateStatus::Revoked,
        }
    }
}

impl Certificate {
    pub fn is_revoked(&self) -> bool {
        self.status == CertificateStatus::Revoked
    }

    /// Block number 0 means the transaction was accepted but never observed mined.
    pub fn is_confirmed(&self) -> bool {
        self.block_number > 0
    }

    pub fn apply(&mut self, transition: &StatusTransition) -> Result<()> {
        if self.is_revoked() {
            return Err(CredentialError::InvalidTransition {
                cert_id: self.cert_id.clone(),
                from: self.status.to_string(),
                to: transition.target().to_string(),
            });
        }

        match transition {
            StatusTransition::Verified { at } => {
                self.status = CertificateStatus::Verified;
                self.verified_at = Some(*at);
            }
            StatusTransition::Revoked { at, reason } => {
                self.status = CertificateStatus::Revoked;
                self.revoked_at = Some(*at);
                self.revoke_reason = Some(reason.clone());
            }
        }
        Ok(())
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .additional_data
            .get(key)
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_certificate(cert_id: &str) -> Certificate {
        Certificate {
            cert_id: cert_id.to_string(),
            student_id: "STU001".to_string(),
            issuer_id: "coe-1".to_string(),
            cert_type: CertType::Marksheet,
            file_hash: "aa".repeat(32),
            content_cid: "bafkreiexample".to_string(),
            content_url: "https://gateway.example/ipfs/bafkreiexample".to_string(),
            tx_hash: "0x01".to_string(),
            block_number: 7,
            status: CertificateStatus::Issued,
            issued_at: Utc::now(),
            verified_at: None,
            revoked_at: None,
            revoke_reason: None,
            metadata: CertificateMetadata::default(),
        }
    }

    #[test]
    fn cert_type_wire_names() {
        assert_eq!(serde_json::to_string(&CertType::Noc).unwrap(), "\"noc\"");
        let legacy: CertType = serde_json::from_str("\"participation_cert\"").unwrap();
        assert_eq!(legacy, CertType::Participation);
    }

    #[test]
    fn verify_then_revoke() {
        let mut cert = sample_certificate("0x1");
        let now = Utc::now();
        cert.apply(&StatusTransition::Verified { at: now }).unwrap();
        assert_eq!(cert.status, CertificateStatus::Verified);
        assert_eq!(cert.verified_at, Some(now));

        cert.apply(&StatusTransition::Revoked {
            at: now,
            reason: "issued in error".into(),
        })
        .unwrap();
        assert!(cert.is_revoked());
        assert_eq!(cert.revoke_reason.as_deref(), Some("issued in error"));
    }

    #[test]
    fn revoked_is_terminal() {
        let mut cert = sample_certificate("0x1");
        let now = Utc::now();
        cert.apply(&StatusTransition::Revoked {
            at: now,
            reason: "fraud".into(),
        })
        .unwrap();

        let err = cert
            .apply(&StatusTransition::Verified { at: now })
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidTransition { .. }));
        assert!(cert.is_revoked());
        assert!(cert.verified_at.is_none());
    }
}
