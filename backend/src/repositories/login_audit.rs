use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::login_audit::LoginAuditEntry;
use crate::types::{LoginAuditId, StudentId};

const SELECT_COLUMNS: &str =
    "id, actor, action, student_id, teacher_email, ip, user_agent, metadata, created_at";

pub async fn insert_login_audit(pool: &PgPool, entry: &LoginAuditEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO login_audit_logs \
         (id, actor, action, student_id, teacher_email, ip, user_agent, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id)
    .bind(&entry.actor)
    .bind(entry.action)
    .bind(entry.student_id)
    .bind(&entry.teacher_email)
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(&entry.metadata)
    .bind(entry.created_at)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn fetch_login_audit(
    pool: &PgPool,
    id: LoginAuditId,
) -> Result<Option<LoginAuditEntry>, sqlx::Error> {
    let query = format!("SELECT {} FROM login_audit_logs WHERE id = $1", SELECT_COLUMNS);
    sqlx::query_as::<_, LoginAuditEntry>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_login_audits_for_student(
    pool: &PgPool,
    student_id: StudentId,
    limit: i64,
) -> Result<Vec<LoginAuditEntry>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM login_audit_logs WHERE student_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, LoginAuditEntry>(&query)
        .bind(student_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn delete_login_audits_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM login_audit_logs WHERE created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
