//! services/api/src/auth/mod.rs
//!
//! Password hashing and bearer-token issuance/validation.

pub mod password;
pub mod token;

pub use token::{Claims, TokenService};
