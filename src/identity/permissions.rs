use super::user::Role;
use crate::credential::CertType;

/// Yes/no gate deciding whether a role may issue a certificate type.
pub trait PermissionGate: Send + Sync {
    fn can_issue(&self, role: Role, cert_type: CertType) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolePermissions {
    pub can_issue_marksheet: bool,
    pub can_issue_bonafide: bool,
    pub can_issue_noc: bool,
    pub can_issue_participation: bool,
    pub can_verify_credentials: bool,
    pub can_manage_users: bool,
}

impl RolePermissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::MainAdmin => Self {
                can_issue_marksheet: true,
                can_issue_bonafide: true,
                can_issue_noc: true,
                can_issue_participation: true,
                can_verify_credentials: true,
                can_manage_users: true,
            },
            Role::Coe => Self {
                can_issue_marksheet: true,
                can_verify_credentials: true,
                ..Self::default()
            },
            Role::DepartmentFaculty => Self {
                can_issue_bonafide: true,
                can_issue_noc: true,
                can_verify_credentials: true,
                ..Self::default()
            },
            Role::ClubCoordinator => Self {
                can_issue_participation: true,
                can_verify_credentials: true,
                ..Self::default()
            },
            Role::ExternalVerifier => Self {
                can_verify_credentials: true,
                ..Self::default()
            },
            Role::Student => Self::default(),
        }
    }

    pub fn allows(&self, cert_type: CertType) -> bool {
        match cert_type {
            // degrees ride on the marksheet capability
            CertType::Marksheet | CertType::Degree => self.can_issue_marksheet,
            CertType::Bonafide => self.can_issue_bonafide,
            CertType::Noc => self.can_issue_noc,
            CertType::Participation => self.can_issue_participation,
        }
    }
}

/// Static role table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleTable;

impl PermissionGate for RoleTable {
    fn can_issue(&self, role: Role, cert_type: CertType) -> bool {
        RolePermissions::for_role(role).allows(cert_type)
    }
}
