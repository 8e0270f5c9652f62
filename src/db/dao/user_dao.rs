use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult, base_traits::touch, retry::retry_when_busy};
use crate::db::entities::{
    card_share, loyalty_card,
    prelude::{CardShare, LoyaltyCard, User},
    user,
};

pub const EMAIL_TAKEN: &str = "Email already in use";

#[derive(Clone)]
pub struct UserDao {
    db: DatabaseConnection,
}

/// Fields for a new user row.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl DaoBase for UserDao {
    type Entity = User;
    const NAME: &'static str = "user";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl UserDao {
    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
        let email = email.to_string();
        self.find_one(move |query| query.filter(user::Column::Email.eq(email)))
            .await
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> DaoResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?)
    }

    pub async fn create_user(&self, new_user: NewUser<'_>) -> DaoResult<user::Model> {
        let model = user::ActiveModel {
            email: Set(new_user.email.to_string()),
            password_hash: Set(new_user.password_hash.to_string()),
            first_name: Set(new_user.first_name.map(str::to_string)),
            last_name: Set(new_user.last_name.map(str::to_string)),
            is_active: Set(true),
            reset_token: Set(None),
            reset_token_expiry: Set(None),
            last_login_at: Set(None),
            ..Default::default()
        };
        self.create(model).await.map_err(|err| match err {
            DaoLayerError::Db(err) => DaoLayerError::from_write(err, EMAIL_TAKEN),
            other => other,
        })
    }

    pub async fn set_last_login(&self, id: &Uuid, at: &DateTime<FixedOffset>) -> DaoResult<()> {
        let at = *at;
        self.update(*id, move |active| {
            active.last_login_at = Set(Some(at));
        })
        .await
        .map(|_| ())
    }

    pub async fn update_profile(
        &self,
        id: &Uuid,
        email: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> DaoResult<user::Model> {
        let email = email.to_string();
        let mut active: user::ActiveModel = self.find_by_id(*id).await?.into();
        active.email = Set(email);
        active.first_name = Set(first_name);
        active.last_name = Set(last_name);
        touch(&mut active);

        User::update(active)
            .exec(&self.db)
            .await
            .map_err(|err| DaoLayerError::from_write(err, EMAIL_TAKEN))
    }

    /// Overwrites any previously issued reset token.
    pub async fn store_reset_token(
        &self,
        id: &Uuid,
        token: &str,
        expires_at: &DateTime<FixedOffset>,
    ) -> DaoResult<()> {
        let token = token.to_string();
        let expires_at = *expires_at;
        self.update(*id, move |active| {
            active.reset_token = Set(Some(token));
            active.reset_token_expiry = Set(Some(expires_at));
        })
        .await
        .map(|_| ())
    }

    /// Swaps in the new hash and clears the token in one transaction.
    /// Returns `None` when no user holds an unexpired matching token.
    pub async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: &DateTime<FixedOffset>,
    ) -> DaoResult<Option<Uuid>> {
        retry_when_busy(move || self.consume_reset_token_once(token, new_password_hash, now)).await
    }

    async fn consume_reset_token_once(
        &self,
        token: &str,
        new_password_hash: &str,
        now: &DateTime<FixedOffset>,
    ) -> DaoResult<Option<Uuid>> {
        let txn = self.db.begin().await?;

        let Some(found) = User::find()
            .filter(user::Column::ResetToken.eq(token))
            .filter(user::Column::ResetTokenExpiry.gt(*now))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut changes = user::ActiveModel {
            password_hash: Set(new_password_hash.to_string()),
            reset_token: Set(None),
            reset_token_expiry: Set(None),
            ..Default::default()
        };
        touch(&mut changes);

        // the token guard makes a concurrent consumer see zero rows
        let updated = User::update_many()
            .set(changes)
            .filter(user::Column::Id.eq(found.id))
            .filter(user::Column::ResetToken.eq(token))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        txn.commit().await?;
        Ok(Some(found.id))
    }

    /// Removes the user, every card they own and every share they are part of.
    pub async fn delete_account(&self, id: &Uuid) -> DaoResult<()> {
        retry_when_busy(move || self.delete_account_once(id)).await
    }

    async fn delete_account_once(&self, id: &Uuid) -> DaoResult<()> {
        let txn = self.db.begin().await?;

        // shares on the user's own cards always carry shared_by == owner
        CardShare::delete_many()
            .filter(
                Condition::any()
                    .add(card_share::Column::SharedWith.eq(*id))
                    .add(card_share::Column::SharedBy.eq(*id)),
            )
            .exec(&txn)
            .await?;
        LoyaltyCard::delete_many()
            .filter(loyalty_card::Column::UserId.eq(*id))
            .exec(&txn)
            .await?;
        let deleted = User::delete_by_id(*id).exec(&txn).await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(Self::not_found(*id));
        }

        txn.commit().await?;
        Ok(())
    }
}
