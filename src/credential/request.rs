use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::certificate::{CertType, Certificate, CertificateMetadata, CertificateStatus};
use crate::error::{CredentialError, Result};

/// A decoded issuance request. The authenticated issuer id travels separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub student_id: String,
    pub cert_type: CertType,
    #[serde(with = "hex_bytes")]
    pub file_data: Vec<u8>,
    pub file_name: String,
    #[serde(default)]
    pub metadata: CertificateMetadata,
}

impl IssueRequest {
    pub fn validate(&self) -> Result<()> {
        if self.student_id.trim().is_empty() {
            return Err(CredentialError::Validation("student id is required".into()));
        }
        if self.file_data.is_empty() {
            return Err(CredentialError::Validation("file data is empty".into()));
        }
        if self.file_name.trim().is_empty() {
            return Err(CredentialError::Validation("file name is required".into()));
        }
        Ok(())
    }
}

/// Outcome of reconciling a stored certificate against the ledger.
#[derive(Debug, Clone)]
pub struct Verification {
    pub cert_id: String,
    pub is_valid: bool,
    pub reason: Option<String>,
    pub record: Option<Certificate>,
}

impl Verification {
    pub fn valid(record: Certificate) -> Self {
        Self {
            cert_id: record.cert_id.clone(),
            is_valid: true,
            reason: None,
            record: Some(record),
        }
    }

    pub fn invalid(cert_id: &str, reason: impl Into<String>, record: Option<Certificate>) -> Self {
        Self {
            cert_id: cert_id.to_string(),
            is_valid: false,
            reason: Some(reason.into()),
            record,
        }
    }

    pub fn to_public(&self) -> PublicVerification {
        PublicVerification::from(self)
    }
}

/// Wire shape of a verification answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicVerification {
    pub is_valid: bool,
    pub cert_id: String,
    pub student_id: Option<String>,
    pub issuer_id: Option<String>,
    pub cert_type: Option<CertType>,
    pub status: Option<CertificateStatus>,
    pub issued_at: Option<DateTime<Utc>>,
    pub content_url: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub metadata: Option<CertificateMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Verification> for PublicVerification {
    fn from(v: &Verification) -> Self {
        let rec = v.record.as_ref();
        Self {
            is_valid: v.is_valid,
            cert_id: v.cert_id.clone(),
            student_id: rec.map(|c| c.student_id.clone()),
            issuer_id: rec.map(|c| c.issuer_id.clone()),
            cert_type: rec.map(|c| c.cert_type),
            status: rec.map(|c| c.status),
            issued_at: rec.map(|c| c.issued_at),
            content_url: rec.map(|c| c.content_url.clone()),
            tx_hash: rec.map(|c| c.tx_hash.clone()),
            block_number: rec.map(|c| c.block_number),
            metadata: rec.map(|c| c.metadata.clone()),
            error_message: v.reason.clone(),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::certificate::tests::sample_certificate;

    fn request() -> IssueRequest {
        IssueRequest {
            student_id: "STU001".into(),
            cert_type: CertType::Degree,
            file_data: b"%PDF-1.7".to_vec(),
            file_name: "degree.pdf".into(),
            metadata: CertificateMetadata::default(),
        }
    }

    #[test]
    fn rejects_empty_inputs() {
        let mut r = request();
        r.file_data.clear();
        assert!(matches!(r.validate(), Err(CredentialError::Validation(_))));

        let mut r = request();
        r.file_name = "  ".into();
        assert!(matches!(r.validate(), Err(CredentialError::Validation(_))));

        let mut r = request();
        r.student_id = String::new();
        assert!(matches!(r.validate(), Err(CredentialError::Validation(_))));

        assert!(request().validate().is_ok());
    }

    #[test]
    fn file_data_travels_as_hex() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["file_data"], "255044462d312e37");
        let back: IssueRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.file_data, b"%PDF-1.7");
    }

    #[test]
    fn public_shape_of_missing_certificate() {
        let v = Verification::invalid("0xdead", "certificate not found", None);
        let json = serde_json::to_value(v.to_public()).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["cert_id"], "0xdead");
        assert_eq!(json["error_message"], "certificate not found");
        assert!(json["tx_hash"].is_null());
    }

    #[test]
    fn public_shape_of_valid_certificate() {
        let v = Verification::valid(sample_certificate("0xbeef"));
        let public = v.to_public();
        assert!(public.is_valid);
        assert_eq!(public.block_number, Some(7));
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("error_message").is_none());
    }
}
