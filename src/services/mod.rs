pub mod account_service;
pub mod card_service;
pub mod context;
pub mod share_service;
pub mod user_service;
pub mod validation;
pub mod views;

pub use context::ServiceContext;
