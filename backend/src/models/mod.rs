//! Data models shared across database access and API handlers.

pub mod login_audit;
pub mod student;
