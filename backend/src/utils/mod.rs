pub mod jwt;
pub mod pin;

pub use jwt::*;
pub use pin::*;
