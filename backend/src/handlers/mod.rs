pub mod admin;
pub mod student_auth;

pub use student_auth::*;
