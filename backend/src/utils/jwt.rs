use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role claim carried by admin portal tokens.
pub const TEACHER_ROLE: &str = "teacher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherClaims {
    pub sub: String, // teacher email
    pub role: String,
    pub exp: i64,    // expiration time
    pub iat: i64,    // issued at
    pub jti: String, // JWT ID
}

impl TeacherClaims {
    pub fn new(email: String, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: email,
            role: TEACHER_ROLE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_teacher(&self) -> bool {
        self.role == TEACHER_ROLE
    }
}

pub fn create_teacher_token(
    email: String,
    secret: &str,
    expiration_hours: u64,
) -> anyhow::Result<String> {
    let claims = TeacherClaims::new(email, expiration_hours);
    encode_claims(&claims, secret)
}

pub fn encode_claims(claims: &TeacherClaims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_teacher_token(token: &str, secret: &str) -> anyhow::Result<TeacherClaims> {
    let validation = Validation::default();
    let token_data = decode::<TeacherClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}
