//! Append-only audit records for PIN logins and credential administration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::{types::Json, FromRow};
use std::fmt;
use utoipa::ToSchema;

use crate::{
    types::{LoginAuditId, StudentId},
    validation::rules::DISPLAY_NAME_MAX_CHARS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Fixed set of actions recorded in the login audit trail.
pub enum AuditAction {
    /// PIN accepted.
    LoginOk,
    /// Attempt rejected before a student was resolved.
    LoginFail,
    /// A resolved student submitted the wrong PIN.
    PinAttempt,
    /// A teacher replaced a student's PIN.
    PinReset,
    /// A teacher registered a student.
    StudentCreated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoginOk => "login_ok",
            AuditAction::LoginFail => "login_fail",
            AuditAction::PinAttempt => "pin_attempt",
            AuditAction::PinReset => "pin_reset",
            AuditAction::StudentCreated => "student_created",
        }
    }
}

/// Reasons attached to failed attempts under the `reason` metadata key.
pub mod reason {
    pub const STUDENT_NOT_FOUND: &str = "student_not_found";
    pub const INVALID_PIN: &str = "invalid_pin";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Who performed the audited action, rendered as `student:<id>`,
/// `teacher:<email>` or `client:<ip>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditActor {
    /// A student identified by id, or by the submitted display name when no
    /// record was resolved.
    Student(String),
    Teacher(String),
    /// An attempt throttled before its body was read; only the peer is known.
    Client(String),
}

impl fmt::Display for AuditActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditActor::Student(id) => write!(f, "student:{}", id),
            AuditActor::Teacher(email) => write!(f, "teacher:{}", email),
            AuditActor::Client(ip) => write!(f, "client:{}", ip),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Persisted audit entry. Rows are never updated.
pub struct LoginAuditEntry {
    #[schema(value_type = String)]
    pub id: LoginAuditId,
    pub actor: String,
    pub action: AuditAction,
    #[schema(value_type = Option<String>)]
    pub student_id: Option<StudentId>,
    pub teacher_email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
}

/// Client details passed through from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

/// An audit entry before the logger assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewLoginAudit {
    pub actor: AuditActor,
    pub action: AuditAction,
    pub student_id: Option<StudentId>,
    pub teacher_email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Map<String, Value>,
}

impl NewLoginAudit {
    fn new(actor: AuditActor, action: AuditAction, client: &ClientInfo) -> Self {
        let mut metadata = Map::new();
        if let Some(request_id) = client.request_id.as_ref() {
            metadata.insert("request_id".to_string(), json!(request_id));
        }
        Self {
            actor,
            action,
            student_id: None,
            teacher_email: None,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            metadata,
        }
    }

    /// Attempt that never resolved a student record.
    /// Names longer than any storable display name are clipped.
    pub fn login_failed(display_name: &str, reason: &str, client: &ClientInfo) -> Self {
        let display_name = clip_display_name(display_name);
        Self::new(
            AuditActor::Student(display_name.to_string()),
            AuditAction::LoginFail,
            client,
        )
        .with_reason(reason)
        .with_metadata("display_name", json!(display_name))
    }

    /// Login attempt rejected by the rate limiter.
    pub fn login_throttled(client: &ClientInfo) -> Self {
        let peer = client.ip.clone().unwrap_or_else(|| "unknown".to_string());
        Self::new(AuditActor::Client(peer), AuditAction::LoginFail, client)
            .with_reason(reason::RATE_LIMITED)
    }

    /// Wrong PIN for a resolved student.
    pub fn pin_rejected(student_id: StudentId, client: &ClientInfo) -> Self {
        Self::new(
            AuditActor::Student(student_id.to_string()),
            AuditAction::PinAttempt,
            client,
        )
        .for_student(student_id)
        .with_reason(reason::INVALID_PIN)
    }

    pub fn login_succeeded(student_id: StudentId, client: &ClientInfo) -> Self {
        Self::new(
            AuditActor::Student(student_id.to_string()),
            AuditAction::LoginOk,
            client,
        )
        .for_student(student_id)
    }

    pub fn pin_reset(teacher_email: &str, student_id: StudentId, client: &ClientInfo) -> Self {
        Self::new(
            AuditActor::Teacher(teacher_email.to_string()),
            AuditAction::PinReset,
            client,
        )
        .for_student(student_id)
        .by_teacher(teacher_email)
    }

    pub fn student_created(
        teacher_email: &str,
        student_id: StudentId,
        client: &ClientInfo,
    ) -> Self {
        Self::new(
            AuditActor::Teacher(teacher_email.to_string()),
            AuditAction::StudentCreated,
            client,
        )
        .for_student(student_id)
        .by_teacher(teacher_email)
    }

    pub fn for_student(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn by_teacher(mut self, teacher_email: &str) -> Self {
        self.teacher_email = Some(teacher_email.to_string());
        self
    }

    pub fn with_reason(self, reason: &str) -> Self {
        self.with_metadata("reason", json!(reason))
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn reason(&self) -> Option<&str> {
        self.metadata.get("reason").and_then(Value::as_str)
    }
}

fn clip_display_name(display_name: &str) -> &str {
    match display_name.char_indices().nth(DISPLAY_NAME_MAX_CHARS) {
        Some((end, _)) => &display_name[..end],
        None => display_name,
    }
}
