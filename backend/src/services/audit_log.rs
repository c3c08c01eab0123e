use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use std::time::Duration;

use crate::{
    models::login_audit::{LoginAuditEntry, NewLoginAudit},
    repositories::login_audit,
    types::{LoginAuditId, StudentId},
};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to persist audit entry: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Append-only sink for login audit entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Appends one entry and returns its generated id.
    async fn record(&self, entry: NewLoginAudit) -> Result<LoginAuditId, AuditError>;

    /// Newest-first entries referencing `student_id`.
    async fn list_for_student(
        &self,
        student_id: StudentId,
        limit: i64,
    ) -> Result<Vec<LoginAuditEntry>, AuditError>;
}

#[derive(Debug, Clone)]
pub struct PgAuditLogger {
    pool: PgPool,
}

impl PgAuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn delete_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        login_audit::delete_login_audits_before(&self.pool, cutoff).await
    }
}

/// Stamps a pending entry with its id and creation time.
pub fn materialize(entry: NewLoginAudit) -> LoginAuditEntry {
    LoginAuditEntry {
        id: LoginAuditId::new(),
        actor: entry.actor.to_string(),
        action: entry.action,
        student_id: entry.student_id,
        teacher_email: entry.teacher_email,
        ip: entry.ip,
        user_agent: entry.user_agent,
        metadata: Json(Value::Object(entry.metadata)),
        created_at: Utc::now(),
    }
}

/// Writes `entry` without letting a failure escape. The outcome already
/// decided by the caller stands either way; failures and writes that exceed
/// `budget` go to operator logs.
pub async fn record_best_effort(
    logger: &dyn AuditLogger,
    entry: NewLoginAudit,
    budget: Duration,
) -> Option<LoginAuditId> {
    let action = entry.action.as_str();
    let actor = entry.actor.to_string();
    let request_id = entry
        .metadata
        .get("request_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    match tokio::time::timeout(budget, logger.record(entry)).await {
        Ok(Ok(id)) => Some(id),
        Ok(Err(err)) => {
            tracing::error!(
                error = %err,
                action,
                actor = %actor,
                request_id = ?request_id,
                "Failed to record login audit entry"
            );
            None
        }
        Err(_) => {
            tracing::error!(
                budget_ms = budget.as_millis() as u64,
                action,
                actor = %actor,
                request_id = ?request_id,
                "Timed out recording login audit entry"
            );
            None
        }
    }
}

#[async_trait]
impl AuditLogger for PgAuditLogger {
    async fn record(&self, entry: NewLoginAudit) -> Result<LoginAuditId, AuditError> {
        let log = materialize(entry);
        login_audit::insert_login_audit(&self.pool, &log).await?;
        Ok(log.id)
    }

    async fn list_for_student(
        &self,
        student_id: StudentId,
        limit: i64,
    ) -> Result<Vec<LoginAuditEntry>, AuditError> {
        let rows =
            login_audit::list_login_audits_for_student(&self.pool, student_id, limit).await?;
        Ok(rows)
    }
}
