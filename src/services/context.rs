use sea_orm::DatabaseConnection;

use crate::{
    auth::jwt::JwtKeys,
    db::dao::DaoContext,
    notify::Notifier,
    services::{
        account_service::AccountService, card_service::CardService, share_service::ShareService,
        user_service::UserService,
    },
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
    jwt: JwtKeys,
    notifier: Notifier,
    public_url: String,
}

impl ServiceContext {
    pub fn new(
        db: &DatabaseConnection,
        jwt: JwtKeys,
        notifier: Notifier,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            daos: DaoContext::new(db),
            jwt,
            notifier,
            public_url: public_url.into(),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            &state.db,
            state.jwt.clone(),
            state.notifier.clone(),
            state.config.mail.public_url.as_str(),
        )
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.user())
    }

    pub fn account(&self) -> AccountService {
        AccountService::new(
            self.daos.user(),
            self.jwt.clone(),
            self.notifier.clone(),
            self.public_url.as_str(),
        )
    }

    pub fn card(&self) -> CardService {
        CardService::new(self.daos.card(), self.daos.share(), self.user())
    }

    pub fn share(&self) -> ShareService {
        ShareService::new(
            self.daos.card(),
            self.daos.share(),
            self.user(),
            self.notifier.clone(),
            self.public_url.as_str(),
        )
    }
}
