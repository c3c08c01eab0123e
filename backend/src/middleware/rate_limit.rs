use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorError,
    GovernorLayer,
};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::client_context::ClientContext;
use crate::models::login_audit::NewLoginAudit;
use crate::services::audit_log::record_best_effort;
use crate::state::AppState;

/// Longest accepted refill window.
const MAX_WINDOW_SECONDS: u64 = 24 * 60 * 60;

/// Response extension set on requests the limiter rejected.
#[derive(Debug, Clone, Copy)]
pub struct LoginThrottled;

/// Per-peer-IP limiter for the student login route.
pub fn create_login_rate_limiter(
    config: &Config,
) -> GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware, Body> {
    let burst_size = config.rate_limit_login_max_requests.max(1);
    let window_seconds = config
        .rate_limit_login_window_seconds
        .clamp(1, MAX_WINDOW_SECONDS);
    // Replenish one slot per (window / burst) so a full burst refills over one window.
    let replenish =
        (Duration::from_secs(window_seconds) / burst_size).max(Duration::from_millis(1));
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .period(replenish)
            .burst_size(burst_size)
            .key_extractor(PeerIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("rate limiter config should be valid"),
    );

    GovernorLayer::new(governor_conf).error_handler(rate_limit_error_handler)
}

/// Wraps the limiter so throttled attempts still leave a `login_fail` entry.
pub async fn audit_throttled_logins(
    State(state): State<AppState>,
    ClientContext(client): ClientContext,
    request: Request,
    next: Next,
) -> Response<Body> {
    let response = next.run(request).await;
    if response.extensions().get::<LoginThrottled>().is_some() {
        record_best_effort(
            state.audit_log.as_ref(),
            NewLoginAudit::login_throttled(&client),
            state.config.audit_write_timeout(),
        )
        .await;
    }
    response
}

fn rate_limit_error_handler(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::warn!(wait_time, "Login rate limit exceeded");
            let mut response =
                AppError::TooManyRequests("Too many requests. Please try again later.".into())
                    .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            if let Ok(value) = HeaderValue::from_str(&wait_time.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
            response.extensions_mut().insert(LoginThrottled);
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::InternalServerError(anyhow::anyhow!("Unable to determine client address"))
                .into_response()
        }
        GovernorError::Other { code, msg, headers } => {
            tracing::warn!(status = %code, message = ?msg, "Rate limiter error");
            let mut response =
                AppError::TooManyRequests("Too many requests. Please try again later.".into())
                    .into_response();
            *response.status_mut() = code;
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
    }
}
