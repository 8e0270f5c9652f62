pub mod auth;
pub mod cards;
pub mod health;
mod router;
pub mod share;

pub use router::router;
