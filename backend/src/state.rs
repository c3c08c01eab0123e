use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::student::{CredentialStore, PgCredentialStore},
    services::audit_log::{AuditLogger, PgAuditLogger},
    utils::pin::{Argon2PinVerifier, PinVerifier},
};

/// Shared handler state. Collaborators are trait objects so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub students: Arc<dyn CredentialStore>,
    pub audit_log: Arc<dyn AuditLogger>,
    pub pin_verifier: Arc<dyn PinVerifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        students: Arc<dyn CredentialStore>,
        audit_log: Arc<dyn AuditLogger>,
        pin_verifier: Arc<dyn PinVerifier>,
    ) -> Self {
        Self {
            config,
            students,
            audit_log,
            pin_verifier,
        }
    }

    /// Wires the PostgreSQL-backed store and logger with an Argon2 verifier
    /// built from `config`.
    pub fn from_pool(pool: DbPool, config: Config) -> anyhow::Result<Self> {
        let pin_verifier = Argon2PinVerifier::from_config(&config)?;
        Ok(Self::new(
            config,
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(PgAuditLogger::new(pool)),
            Arc::new(pin_verifier),
        ))
    }
}
