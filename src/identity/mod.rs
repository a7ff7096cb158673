pub mod permissions;
pub mod user;
pub mod wallet;

pub use permissions::{PermissionGate, RolePermissions, RoleTable};
pub use user::{Role, User};
pub use wallet::{WalletDirectory, WalletRole};
