use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MainAdmin,
    Coe,
    DepartmentFaculty,
    ClubCoordinator,
    ExternalVerifier,
    Student,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::MainAdmin => "Main Administrator",
            Role::Coe => "Controller of Examinations",
            Role::DepartmentFaculty => "Department Faculty",
            Role::ClubCoordinator => "Club Coordinator",
            Role::ExternalVerifier => "External Verifier",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::MainAdmin => "main_admin",
            Role::Coe => "coe",
            Role::DepartmentFaculty => "department_faculty",
            Role::ClubCoordinator => "club_coordinator",
            Role::ExternalVerifier => "external_verifier",
            Role::Student => "student",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub institution: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            student_id: None,
            role,
            department: None,
            institution: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn student(id: impl Into<String>, name: impl Into<String>, student_id: impl Into<String>) -> Self {
        let mut user = Self::new(id, name, Role::Student);
        user.student_id = Some(student_id.into());
        user
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = institution.into();
        self
    }
}
