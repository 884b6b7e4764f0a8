//! Wire types exchanged with the auth endpoints.

pub mod token;

pub use token::{LoginRequest, TokenResponse};
