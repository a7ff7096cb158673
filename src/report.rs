//! Registry summary: certificate counts by status and type, anchoring state,
//! ledger status. Printable, and exportable to CSV.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::credential::{CertType, Certificate, CertificateStatus};
use crate::ledger::LedgerStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryReport {
    pub timestamp: String,
    pub ledger_variant: String,
    pub ledger_connected: bool,
    pub chain_height: Option<u64>,
    pub total: usize,
    pub issued: usize,
    pub verified: usize,
    pub revoked: usize,
    /// Anchored in a known block.
    pub confirmed: usize,
    /// Accepted by the ledger but recorded at block 0.
    pub pending: usize,
    pub by_type: BTreeMap<CertType, usize>,
    pub wallet_cache_hit_rate: f64,
}

impl RegistryReport {
    pub fn build(certificates: &[Certificate], ledger: &LedgerStatus, wallet_cache: (u64, u64)) -> Self {
        let count = |status: CertificateStatus| certificates.iter().filter(|c| c.status == status).count();
        let confirmed = certificates.iter().filter(|c| c.is_confirmed()).count();

        let mut by_type = BTreeMap::new();
        for cert in certificates {
            *by_type.entry(cert.cert_type).or_insert(0) += 1;
        }

        let (hits, misses) = wallet_cache;
        let lookups = hits + misses;
        let wallet_cache_hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64 * 100.0
        };

        Self {
            timestamp: Utc::now().to_rfc3339(),
            ledger_variant: ledger.variant.clone(),
            ledger_connected: ledger.connected,
            chain_height: ledger.block_number,
            total: certificates.len(),
            issued: count(CertificateStatus::Issued),
            verified: count(CertificateStatus::Verified),
            revoked: count(CertificateStatus::Revoked),
            confirmed,
            pending: certificates.len() - confirmed,
            by_type,
            wallet_cache_hit_rate,
        }
    }

    pub fn print_report(&self) {
        let height = self
            .chain_height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║           Credential Registry Report                  ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Timestamp: {:<42} ║", self.timestamp);
        println!("║                                                       ║");
        println!("║ Ledger                                                ║");
        println!("║    → Variant: {:<39} ║", self.ledger_variant);
        println!("║    → Connected: {:<37} ║", self.ledger_connected);
        println!("║    → Height: {:<40} ║", height);
        println!("║                                                       ║");
        println!("║ Certificates: {:<39} ║", self.total);
        println!("║    → Issued: {:<40} ║", self.issued);
        println!("║    → Verified: {:<38} ║", self.verified);
        println!("║    → Revoked: {:<39} ║", self.revoked);
        println!("║    → Confirmed on ledger: {:<27} ║", self.confirmed);
        println!("║    → Pending confirmation: {:<26} ║", self.pending);
        println!("║                                                       ║");
        println!("║ By type                                               ║");
        for (cert_type, n) in &self.by_type {
            println!("║    → {:<15} {:<32} ║", cert_type.as_str(), n);
        }
        println!("║                                                       ║");
        println!("║ Wallet cache hit rate: {:<28.2}% ║", self.wallet_cache_hit_rate);
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }

    /// Append one summary row, writing the header when the file is new.
    pub fn save_to_csv(&self, path: &Path) -> csv::Result<()> {
        let file_exists = path.exists();
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut wtr = csv::Writer::from_writer(file);

        if !file_exists {
            let mut header = vec![
                "timestamp".to_string(),
                "ledger_variant".to_string(),
                "ledger_connected".to_string(),
                "chain_height".to_string(),
                "total".to_string(),
                "issued".to_string(),
                "verified".to_string(),
                "revoked".to_string(),
                "confirmed".to_string(),
                "pending".to_string(),
            ];
            header.extend(CertType::ALL.iter().map(|t| format!("type_{}", t.as_str())));
            header.push("wallet_cache_hit_rate_percent".to_string());
            wtr.write_record(&header)?;
        }

        let mut row = vec![
            self.timestamp.clone(),
            self.ledger_variant.clone(),
            self.ledger_connected.to_string(),
            self.chain_height.map(|h| h.to_string()).unwrap_or_default(),
            self.total.to_string(),
            self.issued.to_string(),
            self.verified.to_string(),
            self.revoked.to_string(),
            self.confirmed.to_string(),
            self.pending.to_string(),
        ];
        row.extend(
            CertType::ALL
                .iter()
                .map(|t| self.by_type.get(t).copied().unwrap_or(0).to_string()),
        );
        row.push(format!("{:.2}", self.wallet_cache_hit_rate));
        wtr.write_record(&row)?;

        wtr.flush()?;
        Ok(())
    }
}

/// One row per certificate; overwrites `path`.
pub fn save_certificates_csv(certificates: &[Certificate], path: &Path) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "cert_id",
        "student_id",
        "issuer_id",
        "cert_type",
        "status",
        "file_hash",
        "content_cid",
        "tx_hash",
        "block_number",
        "issued_at",
        "revoked_at",
        "revoke_reason",
    ])?;
    for cert in certificates {
        let status = cert.status.to_string();
        let block = cert.block_number.to_string();
        let issued_at = cert.issued_at.to_rfc3339();
        let revoked_at = cert.revoked_at.map(|t| t.to_rfc3339()).unwrap_or_default();
        wtr.write_record([
            cert.cert_id.as_str(),
            cert.student_id.as_str(),
            cert.issuer_id.as_str(),
            cert.cert_type.as_str(),
            status.as_str(),
            cert.file_hash.as_str(),
            cert.content_cid.as_str(),
            cert.tx_hash.as_str(),
            block.as_str(),
            issued_at.as_str(),
            revoked_at.as_str(),
            cert.revoke_reason.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::certificate::tests::sample_certificate;

    fn status() -> LedgerStatus {
        LedgerStatus {
            variant: "mock".into(),
            connected: true,
            block_number: Some(9),
            gas_price: None,
        }
    }

    fn certificates() -> Vec<Certificate> {
        let a = sample_certificate("0xa");
        let mut b = sample_certificate("0xb");
        b.status = CertificateStatus::Revoked;
        b.cert_type = CertType::Noc;
        let mut c = sample_certificate("0xc");
        c.block_number = 0;
        c.status = CertificateStatus::Verified;
        vec![a, b, c]
    }

    #[test]
    fn counts_by_status_type_and_anchoring() {
        let report = RegistryReport::build(&certificates(), &status(), (3, 1));
        assert_eq!(report.total, 3);
        assert_eq!((report.issued, report.verified, report.revoked), (1, 1, 1));
        assert_eq!((report.confirmed, report.pending), (2, 1));
        assert_eq!(report.by_type.get(&CertType::Marksheet), Some(&2));
        assert_eq!(report.by_type.get(&CertType::Noc), Some(&1));
        assert!((report.wallet_cache_hit_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_csv_appends_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        let report = RegistryReport::build(&certificates(), &status(), (0, 0));
        report.save_to_csv(&path).unwrap();
        report.save_to_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,ledger_variant"));
        assert!(lines[0].contains("type_participation"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("timestamp")).count(), 1);
    }

    #[test]
    fn certificate_csv_has_one_row_each() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certs.csv");
        save_certificates_csv(&certificates(), &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][0], "0xb");
        assert_eq!(&rows[1][4], "revoked");
    }
}
