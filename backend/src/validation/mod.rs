//! Validation rules for admin payloads.
//!
//! The student login path checks the PIN with `utils::pin::validate_pin_format`
//! directly; admin payloads go through `validator` derives using these rules.

pub mod rules;

pub use validator::Validate;
