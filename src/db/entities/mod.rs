#[allow(unused_imports)]
pub mod prelude {
    pub use super::card_share::Entity as CardShare;
    pub use super::loyalty_card::Entity as LoyaltyCard;
    pub use super::user::Entity as User;
}

pub mod card_share;
pub mod loyalty_card;
pub mod user;
