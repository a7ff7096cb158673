//! Digest computation over certificate artifacts and their metadata.
//!
//! All functions here are pure. The only failure mode is metadata that
//! cannot be serialized to canonical JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the artifact bytes.
pub fn file_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex SHA-256 of the canonical JSON encoding of `metadata`.
///
/// Canonical here means serde_json's encoding of a value whose maps are
/// ordered (`BTreeMap` or `serde_json::Map`), so identical content always
/// yields identical bytes.
pub fn metadata_digest<T: Serialize + ?Sized>(metadata: &T) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(metadata)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Timestamp rendering fed into the certificate id: RFC 3339, UTC, whole seconds.
pub fn cert_timestamp(issued_at: &DateTime<Utc>) -> String {
    issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `0x`-prefixed SHA-256 of `file_hash || student_id || issued_at`.
pub fn compute_cert_id(file_hash: &str, student_id: &str, issued_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_hash.as_bytes());
    hasher.update(student_id.as_bytes());
    hasher.update(cert_timestamp(issued_at).as_bytes());
    format!("0x{:x}", hasher.finalize())
}

/// Derive a 20-byte hex address from `role_wallet_identity`.
pub fn derive_address(role: &str, identity_id: &str) -> String {
    let digest = Sha256::digest(format!("{role}_wallet_{identity_id}").as_bytes());
    format!("0x{}", hex::encode(&digest[..20]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::{BTreeMap, HashSet};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn file_digest_matches_known_vector() {
        assert_eq!(
            file_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn metadata_digest_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("student_id", "S1");
        a.insert("cert_type", "degree");
        let mut b = BTreeMap::new();
        b.insert("cert_type", "degree");
        b.insert("student_id", "S1");
        assert_eq!(metadata_digest(&a).unwrap(), metadata_digest(&b).unwrap());
    }

    #[test]
    fn cert_id_is_deterministic() {
        let t = at(1_700_000_000);
        let first = compute_cert_id("aa", "S1", &t);
        for _ in 0..10 {
            assert_eq!(compute_cert_id("aa", "S1", &t), first);
        }
        assert!(first.starts_with("0x"));
        assert_eq!(first.len(), 66);
    }

    #[test]
    fn cert_id_changes_with_each_input() {
        let t = at(1_700_000_000);
        let base = compute_cert_id("aa", "S1", &t);
        assert_ne!(base, compute_cert_id("ab", "S1", &t));
        assert_ne!(base, compute_cert_id("aa", "S2", &t));
        assert_ne!(base, compute_cert_id("aa", "S1", &at(1_700_000_001)));
    }

    #[test]
    fn cert_id_ignores_sub_second_precision() {
        let t = at(1_700_000_000);
        let later = t + chrono::Duration::milliseconds(450);
        assert_eq!(compute_cert_id("aa", "S1", &t), compute_cert_id("aa", "S1", &later));
    }

    #[test]
    fn cert_ids_do_not_collide_on_diverse_inputs() {
        let mut seen = HashSet::new();
        for file in 0..20 {
            for student in 0..10 {
                for secs in 0..5 {
                    let id = compute_cert_id(
                        &file_digest(format!("file-{file}").as_bytes()),
                        &format!("STU{student:03}"),
                        &at(1_700_000_000 + secs),
                    );
                    assert!(seen.insert(id));
                }
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn derived_address_shape() {
        let addr = derive_address("student", "STU001");
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
        assert_ne!(addr, derive_address("issuer", "STU001"));
    }
}
