//! Tamper-evident academic credentials: documents are hashed, pinned to a
//! content-addressed store, anchored on a ledger, and indexed off-chain for
//! querying, verification and revocation.

pub mod config;
pub mod content;
pub mod credential;
pub mod error;
pub mod hashing;
pub mod identity;
pub mod ledger;
pub mod report;
pub mod service;
pub mod store;
pub mod system;

pub use config::Config;
pub use error::{CredentialError, Result};
pub use system::CredentialSystem;
