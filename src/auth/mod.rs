pub mod cookie;
pub mod jwt;
pub mod password;
pub mod reset;
mod types;

pub use types::{SessionClaims, SessionError};
