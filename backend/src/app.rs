use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    BoxError, Router,
};
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    docs::ApiDoc,
    error::AppError,
    handlers,
    middleware::{auth::auth_teacher, client_context::request_id, rate_limit},
    state::AppState,
};

/// Largest accepted login body; fits a full-length display name and PIN.
const LOGIN_BODY_LIMIT_BYTES: usize = 4 * 1024;

/// Assembles every route with its shared layers.
pub fn build_router(state: AppState) -> Router {
    let mut public_routes: Router<AppState> = Router::new()
        .route("/api/student/login", post(handlers::student_login))
        .layer(DefaultBodyLimit::max(LOGIN_BODY_LIMIT_BYTES));
    if state.config.rate_limit_login_enabled {
        public_routes = public_routes
            .layer(rate_limit::create_login_rate_limiter(&state.config))
            .layer(axum_middleware::from_fn_with_state(
                state.clone(),
                rate_limit::audit_throttled_logins,
            ));
    }

    let admin_routes: Router<AppState> = Router::new()
        .route(
            "/api/admin/students",
            get(handlers::admin::list_students).post(handlers::admin::create_student),
        )
        .route(
            "/api/admin/students/{id}/pin",
            put(handlers::admin::reset_student_pin),
        )
        .route(
            "/api/admin/students/{id}/audit-logs",
            get(handlers::admin::list_student_audit_logs),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_teacher,
        ));

    let timeout = state.config.request_timeout();
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(request_id))
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(timeout))
                .layer(cors),
        )
        .with_state(state)
}

async fn handle_timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request exceeded the ambient timeout");
        AppError::RequestTimeout("Request timed out".to_string())
    } else {
        AppError::InternalServerError(anyhow::anyhow!("Unhandled middleware error: {}", err))
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(24 * 60 * 60));

    if config.cors_allow_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
