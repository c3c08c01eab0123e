use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    error::AppError,
    middleware::{auth::TeacherIdentity, client_context::ClientContext},
    models::{
        login_audit::{LoginAuditEntry, NewLoginAudit},
        student::{CreateStudent, ResetPinRequest, Student, StudentResponse},
    },
    repositories::student::StoreError,
    services::audit_log::record_best_effort,
    state::AppState,
    types::StudentId,
    utils::pin::hash_pin_blocking,
};

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// Maximum number of entries (default 50, max 500).
    pub limit: Option<i64>,
}

impl AuditLogQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT)
    }
}

pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, AppError> {
    let students = state.students.list().await?;
    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}

pub async fn create_student(
    State(state): State<AppState>,
    Extension(teacher): Extension<TeacherIdentity>,
    ClientContext(client): ClientContext,
    payload: Result<Json<CreateStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentResponse>), AppError> {
    let Json(payload) = payload.map_err(bad_body)?;
    payload.validate()?;

    let display_name = payload.display_name.trim().to_string();
    match state.students.find_by_display_name(&display_name).await {
        Ok(_) => return Err(StoreError::Conflict.into()),
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let pin_hash = hash_pin_blocking(state.pin_verifier.clone(), payload.pin).await?;
    let student = state
        .students
        .create(&Student::new(display_name, pin_hash))
        .await?;

    record_best_effort(
        state.audit_log.as_ref(),
        NewLoginAudit::student_created(&teacher.email, student.id, &client),
        state.config.audit_write_timeout(),
    )
    .await;
    tracing::info!(student_id = %student.id, teacher = %teacher.email, "Student created");

    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

pub async fn reset_student_pin(
    State(state): State<AppState>,
    Extension(teacher): Extension<TeacherIdentity>,
    ClientContext(client): ClientContext,
    Path(student_id): Path<String>,
    payload: Result<Json<ResetPinRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let student_id = parse_student_id(&student_id)?;
    let Json(payload) = payload.map_err(bad_body)?;
    payload.validate()?;

    let pin_hash = hash_pin_blocking(state.pin_verifier.clone(), payload.pin).await?;
    state.students.update_hash(student_id, &pin_hash).await?;

    record_best_effort(
        state.audit_log.as_ref(),
        NewLoginAudit::pin_reset(&teacher.email, student_id, &client),
        state.config.audit_write_timeout(),
    )
    .await;
    tracing::info!(student_id = %student_id, teacher = %teacher.email, "Student PIN reset");

    Ok(Json(json!({"message": "PIN updated"})))
}

pub async fn list_student_audit_logs(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<LoginAuditEntry>>, AppError> {
    let student_id = parse_student_id(&student_id)?;
    state.students.find_by_id(student_id).await?;

    let entries = state
        .audit_log
        .list_for_student(student_id, query.limit())
        .await
        .map_err(|err| AppError::InternalServerError(err.into()))?;
    Ok(Json(entries))
}

fn parse_student_id(raw: &str) -> Result<StudentId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Student not found".to_string()))
}

fn bad_body(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "Rejected admin request body");
    AppError::BadRequest("Invalid request body".to_string())
}
