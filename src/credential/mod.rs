pub mod certificate;
pub mod request;

pub use certificate::{CertType, Certificate, CertificateMetadata, CertificateStatus, StatusTransition};
pub use request::{IssueRequest, PublicVerification, Verification};
