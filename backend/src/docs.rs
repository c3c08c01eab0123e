#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::admin::AuditLogQuery,
    models::{
        login_audit::{AuditAction, LoginAuditEntry},
        student::{
            CreateStudent, ResetPinRequest, StudentLoginRequest, StudentLoginResponse,
            StudentResponse,
        },
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        student_login_doc,
        admin_list_students_doc,
        admin_create_student_doc,
        admin_reset_pin_doc,
        admin_student_audit_logs_doc
    ),
    components(
        schemas(
            // student portal
            StudentLoginRequest,
            StudentLoginResponse,
            StudentResponse,
            // admin
            CreateStudent,
            ResetPinRequest,
            LoginAuditEntry,
            AuditAction,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Student", description = "Student portal PIN login"),
        (name = "Admin", description = "Teacher-only student management")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/student/login",
    request_body = StudentLoginRequest,
    responses(
        (status = 200, description = "PIN accepted", body = StudentLoginResponse),
        (status = 400, description = "Malformed body or PIN format", body = ErrorResponse),
        (status = 401, description = "PIN does not match", body = ErrorResponse),
        (status = 404, description = "No student with that display name", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Student",
    security(())
)]
fn student_login_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/students",
    responses(
        (status = 200, body = [StudentResponse]),
        (status = 401, body = ErrorResponse),
        (status = 403, body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_list_students_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/students",
    request_body = CreateStudent,
    responses(
        (status = 201, body = StudentResponse),
        (status = 400, body = ErrorResponse),
        (status = 409, description = "Display name already taken", body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_create_student_doc() {}

#[utoipa::path(
    put,
    path = "/api/admin/students/{id}/pin",
    params(("id" = String, Path, description = "Student ID")),
    request_body = ResetPinRequest,
    responses(
        (status = 200, description = "PIN updated", body = serde_json::Value),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_reset_pin_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/students/{id}/audit-logs",
    params(
        ("id" = String, Path, description = "Student ID"),
        AuditLogQuery
    ),
    responses(
        (status = 200, description = "Newest first", body = [LoginAuditEntry]),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_student_audit_logs_doc() {}
