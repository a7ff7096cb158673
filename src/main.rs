use anyhow::{Context, Result};
use credchain::config::Config;
use credchain::credential::{CertType, CertificateMetadata, IssueRequest};
use credchain::identity::{Role, User};
use credchain::ledger::LedgerClient;
use credchain::report::save_certificates_csv;
use credchain::store::Store;
use credchain::CredentialSystem;
use std::path::Path;

async fn seed_users(system: &CredentialSystem) -> Result<()> {
    let users = [
        User::new("admin-1", "Registrar", Role::MainAdmin),
        User::new("coe-1", "Controller of Examinations", Role::Coe),
        User::new("faculty-cs", "CS Department Office", Role::DepartmentFaculty),
        User::student("stu-1", "Asha Menon", "STU001"),
        User::student("stu-2", "Rahul Iyer", "STU002"),
    ];
    for user in users {
        system
            .store
            .create_user(user.with_institution("Demo Institute of Technology"))
            .await?;
    }
    Ok(())
}

fn request(student_id: &str, cert_type: CertType, body: &str) -> IssueRequest {
    IssueRequest {
        student_id: student_id.to_string(),
        cert_type,
        file_data: body.as_bytes().to_vec(),
        file_name: format!("{}-{}.pdf", student_id.to_lowercase(), cert_type),
        metadata: CertificateMetadata {
            course: Some("B.Tech Computer Science".into()),
            academic_year: Some("2024-25".into()),
            ..CertificateMetadata::default()
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║        Academic Credential Registry (credchain)       ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    let config = match std::env::var("CREDCHAIN_CONFIG") {
        Ok(path) => Config::load(Path::new(&path)).with_context(|| format!("loading {path}"))?,
        Err(_) => Config::from_env().context("reading configuration from environment")?,
    };
    let system = CredentialSystem::from_config(&config)?;
    if let Err(e) = system.health_check().await {
        println!("Warning: health check failed: {}", e);
    }
    seed_users(&system).await?;
    println!("✓ System initialized ({} ledger)\n", system.ledger.variant());

    println!("[1/4] Issuing certificates...");
    let marksheet_body = "Semester 6 marksheet: CGPA 8.9";
    let marksheet = system
        .issuance
        .issue(&request("STU001", CertType::Marksheet, marksheet_body), "coe-1")
        .await?;
    let degree = system
        .issuance
        .issue(&request("STU002", CertType::Degree, "Bachelor of Technology"), "coe-1")
        .await?;
    let bonafide = system
        .issuance
        .issue(&request("STU001", CertType::Bonafide, "Bonafide student 2024-25"), "faculty-cs")
        .await?;
    for cert in [&marksheet, &degree, &bonafide] {
        println!(
            "      ✓ {} {} → tx {} (block {})",
            cert.cert_type, cert.cert_id, cert.tx_hash, cert.block_number
        );
    }
    match system
        .issuance
        .issue(&request("STU002", CertType::Bonafide, "unauthorized"), "coe-1")
        .await
    {
        Ok(_) => println!("      ✗ unauthorized issuance was accepted"),
        Err(e) => println!("      ✓ rejected: {}", e),
    }

    println!("\n[2/4] Verifying...");
    let result = system.verification.verify(&marksheet.cert_id).await;
    println!("      ✓ {} valid: {}", marksheet.cert_id, result.is_valid);
    let tampered = system
        .verification
        .verify_document(&marksheet.cert_id, b"Semester 6 marksheet: CGPA 9.9")
        .await;
    println!(
        "      ✓ tampered document valid: {} ({})",
        tampered.is_valid,
        tampered.reason.unwrap_or_default()
    );
    println!("{}", serde_json::to_string_pretty(&result.to_public())?);

    println!("\n[3/4] Revoking the degree certificate...");
    system
        .revocation
        .revoke(&degree.cert_id, "issued against incomplete records")
        .await?;
    let after = system.verification.verify(&degree.cert_id).await;
    println!(
        "      ✓ {} valid: {} ({})",
        degree.cert_id,
        after.is_valid,
        after.reason.unwrap_or_default()
    );

    println!("\n[4/4] Reporting...");
    let report = system.report().await?;
    report.print_report();

    match report.save_to_csv(Path::new("registry.csv")) {
        Ok(_) => println!("✓ Summary saved to registry.csv"),
        Err(e) => println!("✗ Error saving registry.csv: {}", e),
    }
    let certificates = system.queries.list_all().await?;
    match save_certificates_csv(&certificates, Path::new("certificates.csv")) {
        Ok(_) => println!("✓ Certificates saved to certificates.csv"),
        Err(e) => println!("✗ Error saving certificates.csv: {}", e),
    }
    println!();
    Ok(())
}
