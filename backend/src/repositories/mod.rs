pub mod login_audit;
pub mod student;

pub use student::{CredentialStore, PgCredentialStore, StoreError, StudentMatch};
