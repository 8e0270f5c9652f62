pub mod base;
pub mod base_traits;
pub mod card_dao;
mod context;
pub mod error;
mod retry;
pub mod share_dao;
pub mod user_dao;

pub use base::DaoBase;
pub use base_traits::{HasIdActiveModel, TimestampedActiveModel};
pub use card_dao::{CardChanges, CardDao, NewCard};
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use share_dao::{GrantOutcome, ShareDao, ShareRecipient};
pub use user_dao::{NewUser, UserDao};
