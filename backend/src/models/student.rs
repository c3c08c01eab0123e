//! Models that represent students and the PIN login payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    types::StudentId,
    validation::rules::{validate_display_name, validate_pin},
};

#[derive(Debug, Clone, FromRow)]
/// Database representation of a student who signs in with a PIN.
pub struct Student {
    /// Unique generated identifier.
    pub id: StudentId,
    /// Unique human-readable name typed at the login screen.
    pub display_name: String,
    /// Argon2id digest of the student's PIN. Never the raw PIN.
    pub pin_hash: String,
    pub created_at: DateTime<Utc>,
    /// Last time the PIN digest was replaced.
    pub pin_updated_at: DateTime<Utc>,
}

impl Student {
    /// Constructs a new student with a freshly generated identifier.
    pub fn new(display_name: String, pin_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: StudentId::new(),
            display_name,
            pin_hash,
            created_at: now,
            pin_updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public-facing representation of a student. Carries every field except the PIN hash.
pub struct StudentResponse {
    #[schema(value_type = String)]
    pub id: StudentId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub pin_updated_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        StudentResponse {
            id: student.id,
            display_name: student.display_name,
            created_at: student.created_at,
            pin_updated_at: student.pin_updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Credentials submitted from the student portal.
pub struct StudentLoginRequest {
    pub display_name: String,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Body returned after a successful PIN login.
pub struct StudentLoginResponse {
    pub success: bool,
    pub student: StudentResponse,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload for registering a new student from the admin portal.
pub struct CreateStudent {
    #[validate(custom(function = "validate_display_name"))]
    pub display_name: String,
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Payload for replacing a student's PIN.
pub struct ResetPinRequest {
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}
