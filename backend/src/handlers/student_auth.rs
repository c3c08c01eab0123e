//! Student portal PIN login.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    error::AppError,
    middleware::client_context::ClientContext,
    models::{
        login_audit::{reason, NewLoginAudit},
        student::{StudentLoginRequest, StudentLoginResponse, StudentResponse},
    },
    repositories::student::StoreError,
    services::audit_log::record_best_effort,
    state::AppState,
    utils::pin::{validate_pin_format, verify_pin_blocking},
};

pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALID_PIN_FORMAT: &str = "Invalid PIN format";
pub const STUDENT_NOT_FOUND: &str = "Student not found";
pub const INVALID_PIN: &str = "Invalid PIN";

/// Verifies a display name + PIN pair.
///
/// Every attempt that passes the format check leaves exactly one audit entry
/// before the response is returned. Audit failures are logged and never
/// change the outcome.
pub async fn student_login(
    State(state): State<AppState>,
    ClientContext(client): ClientContext,
    payload: Result<Json<StudentLoginRequest>, JsonRejection>,
) -> Result<Json<StudentLoginResponse>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected student login body");
        AppError::BadRequest(INVALID_BODY.to_string())
    })?;

    // No student resolved yet, so nothing to audit.
    if !validate_pin_format(&payload.pin) {
        return Err(AppError::BadRequest(INVALID_PIN_FORMAT.to_string()));
    }

    let matched = match state.students.find_by_display_name(&payload.display_name).await {
        Ok(matched) => matched,
        Err(StoreError::NotFound) => {
            // Burn one slow hash so unknown names cost the same as wrong PINs.
            verify_pin_blocking(
                state.pin_verifier.clone(),
                payload.pin,
                state.pin_verifier.decoy_hash().to_string(),
            )
            .await;
            record_best_effort(
                state.audit_log.as_ref(),
                NewLoginAudit::login_failed(
                    &payload.display_name,
                    reason::STUDENT_NOT_FOUND,
                    &client,
                ),
                state.config.audit_write_timeout(),
            )
            .await;
            return Err(AppError::NotFound(STUDENT_NOT_FOUND.to_string()));
        }
        Err(err) => {
            record_best_effort(
                state.audit_log.as_ref(),
                NewLoginAudit::login_failed(&payload.display_name, reason::INTERNAL_ERROR, &client),
                state.config.audit_write_timeout(),
            )
            .await;
            return Err(AppError::InternalServerError(
                anyhow::Error::new(err).context("student lookup failed"),
            ));
        }
    };

    if matched.duplicate_detected {
        tracing::error!(
            student_id = %matched.student.id,
            "Data integrity fault: display name matches more than one student; using the oldest"
        );
    }
    let student = matched.student;

    let pin_matches = verify_pin_blocking(
        state.pin_verifier.clone(),
        payload.pin,
        student.pin_hash.clone(),
    )
    .await;

    if !pin_matches {
        record_best_effort(
            state.audit_log.as_ref(),
            NewLoginAudit::pin_rejected(student.id, &client),
            state.config.audit_write_timeout(),
        )
        .await;
        return Err(AppError::Unauthorized(INVALID_PIN.to_string()));
    }

    record_best_effort(
        state.audit_log.as_ref(),
        NewLoginAudit::login_succeeded(student.id, &client),
        state.config.audit_write_timeout(),
    )
    .await;
    tracing::info!(student_id = %student.id, "Student logged in");

    Ok(Json(StudentLoginResponse {
        success: true,
        student: StudentResponse::from(student),
    }))
}
