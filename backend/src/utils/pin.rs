use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::Rng;
use std::sync::Arc;

use crate::config::Config;

/// Number of digits in a student PIN.
pub const PIN_LENGTH: usize = 6;

/// Returns `true` when `pin` is exactly six ASCII digits.
pub fn validate_pin_format(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Hashes and checks PINs. Implementations must use a slow, salted credential hash.
pub trait PinVerifier: Send + Sync {
    /// Produces a salted digest. Two calls with the same PIN yield different digests.
    fn hash(&self, pin: &str) -> anyhow::Result<String>;

    /// Checks `pin` against `stored_hash`. Malformed input yields `false`.
    fn verify(&self, pin: &str, stored_hash: &str) -> bool;

    /// Digest of a throwaway PIN, verified against when no student matched so
    /// both outcomes spend one slow hash.
    fn decoy_hash(&self) -> &str;
}

/// Argon2id PIN hashing with a configurable work factor.
pub struct Argon2PinVerifier {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl Argon2PinVerifier {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid PIN hash parameters: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let decoy_pin = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let decoy_hash = hash_with(&argon2, &decoy_pin)?;

        Ok(Self { argon2, decoy_hash })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.pin_hash_memory_kib,
            config.pin_hash_iterations,
            config.pin_hash_parallelism,
        )
    }
}

impl PinVerifier for Argon2PinVerifier {
    fn hash(&self, pin: &str) -> anyhow::Result<String> {
        hash_with(&self.argon2, pin)
    }

    fn verify(&self, pin: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "Stored PIN hash is malformed");
                return false;
            }
        };

        // The digest carries its own algorithm and params, so older work
        // factors keep verifying after a config change.
        match self.argon2.verify_password(pin.as_bytes(), &parsed_hash) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(err) => {
                tracing::warn!(error = %err, "PIN verification error");
                false
            }
        }
    }

    fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }
}

/// Runs `verify` on the blocking pool so the slow hash does not stall other requests.
/// A panicked task counts as a mismatch.
pub async fn verify_pin_blocking(
    verifier: Arc<dyn PinVerifier>,
    pin: String,
    stored_hash: String,
) -> bool {
    match tokio::task::spawn_blocking(move || verifier.verify(&pin, &stored_hash)).await {
        Ok(matches) => matches,
        Err(err) => {
            tracing::error!(error = ?err, "PIN verification task failed");
            false
        }
    }
}

/// Runs `hash` on the blocking pool.
pub async fn hash_pin_blocking(
    verifier: Arc<dyn PinVerifier>,
    pin: String,
) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || verifier.hash(&pin))
        .await
        .map_err(|e| anyhow::anyhow!("PIN hashing task failed: {}", e))?
}

fn hash_with(argon2: &Argon2<'_>, pin: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let pin_hash = argon2
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash PIN: {}", e))?;
    Ok(pin_hash.to_string())
}
