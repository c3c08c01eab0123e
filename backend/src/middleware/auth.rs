use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{state::AppState, utils::jwt::verify_teacher_token};

/// Authenticated admin-portal user, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherIdentity {
    pub email: String,
}

/// Requires a valid teacher bearer token on admin routes.
pub async fn auth_teacher(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_auth_header(request.headers())
        .as_deref()
        .and_then(parse_bearer_token)
        .map(|value| value.to_string())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = verify_teacher_token(&token, &state.config.jwt_secret).map_err(|err| {
        tracing::debug!(error = %err, "Rejected teacher token");
        StatusCode::UNAUTHORIZED
    })?;
    if !claims.is_teacher() {
        return Err(StatusCode::FORBIDDEN);
    }

    request
        .extensions_mut()
        .insert(TeacherIdentity { email: claims.sub });
    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

fn extract_auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
}
