// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account role. Serialized as `TEACHER` / `STUDENT`, also inside JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }
}

/// A student document as stored by the persistence gateway.
///
/// `school_no` is the business key: upserts and deletes go through it,
/// never through `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub school_no: String,
    pub class_group: String,
    /// Argon2 hash. Only ever serialized into storage documents.
    pub password_hash: String,
    pub created_at: i64,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// The singleton teacher ("admin") account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub password_hash: String,
}

/// Identity returned to clients after login and from `/api/auth/me`.
/// Never carries a password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub surname: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_group: Option<String>,
}

impl From<&Student> for SessionUser {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            role: Role::Student,
            name: s.name.clone(),
            surname: s.surname.clone(),
            username: s.username.clone(),
            school_no: Some(s.school_no.clone()),
            class_group: Some(s.class_group.clone()),
        }
    }
}

impl From<&Teacher> for SessionUser {
    fn from(t: &Teacher) -> Self {
        Self {
            id: t.id.clone(),
            role: Role::Teacher,
            name: t.name.clone(),
            surname: t.surname.clone(),
            username: t.username.clone(),
            school_no: None,
            class_group: None,
        }
    }
}

/// Student as listed to the teacher.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStudent {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub school_no: String,
    pub class_group: String,
    pub created_at: i64,
}

impl From<&Student> for PublicStudent {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            surname: s.surname.clone(),
            school_no: s.school_no.clone(),
            class_group: s.class_group.clone(),
            created_at: s.created_at,
        }
    }
}

/// DTO for login. `identifier` is the school number for students and the
/// username for the teacher.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub role: Role,
    #[validate(length(min = 1, max = 50))]
    pub identifier: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for the teacher adding or editing a student by hand.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveStudentRequest {
    #[validate(length(min = 1, max = 20, message = "School number is required."))]
    pub school_no: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub surname: String,
    #[validate(length(min = 1, max = 20, message = "Class is required."))]
    pub class_group: String,
    /// Defaults to the school number when absent.
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,
}
