use chrono::{Duration, Utc};
use std::time::Duration as StdDuration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_portal_backend::{
    config::{AuditLogRetentionPolicy, Config},
    db::connection::create_pool,
    services::audit_log::PgAuditLogger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audit_log_cleanup=info,notes_portal_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let days = match config.audit_log_retention_policy() {
        AuditLogRetentionPolicy::Forever => {
            tracing::info!("Audit log retention is set to forever; nothing to delete");
            return Ok(());
        }
        AuditLogRetentionPolicy::Days(days) => days,
    };

    let pool = create_pool(
        &config.database_url,
        1,
        StdDuration::from_secs(config.request_timeout_seconds.max(1)),
    )
    .await?;

    let cutoff = Utc::now() - Duration::days(days);
    let deleted = PgAuditLogger::new(pool.clone())
        .delete_logs_before(cutoff)
        .await?;
    if deleted > 0 {
        tracing::info!(deleted, retention_days = days, "Deleted expired login audit entries");
    }

    sqlx::query("VACUUM (ANALYZE) login_audit_logs")
        .execute(&pool)
        .await?;

    Ok(())
}
