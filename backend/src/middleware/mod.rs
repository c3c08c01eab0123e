pub mod auth;
pub mod client_context;
pub mod rate_limit;

pub use auth::*;
pub use client_context::*;
pub use rate_limit::*;
