use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use super::{
    DaoBase, DaoLayerError, DaoResult,
    base_traits::stamp_new,
    error::is_unique_violation,
    retry::retry_when_busy,
};
use crate::db::entities::{
    card_share, loyalty_card,
    prelude::{CardShare, LoyaltyCard, User},
    user,
};

#[derive(Clone)]
pub struct ShareDao {
    db: DatabaseConnection,
}

/// Recipient of a grant, by address. When nobody holds `email` yet and a
/// `provisional_hash` is given, the account is created in the same
/// transaction as the shares.
#[derive(Debug, Clone, Copy)]
pub struct ShareRecipient<'a> {
    pub email: &'a str,
    pub provisional_hash: Option<&'a str>,
}

/// Result of a batch grant. Only `Granted` commits anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// At least one requested card is not owned by the sharer.
    NotOwned,
    /// The address belongs to the sharer.
    SelfShare,
    /// The address is unknown and no provisional hash was supplied.
    RecipientMissing,
    Granted {
        recipient: user::Model,
        provisioned: bool,
        created: usize,
        existing: usize,
    },
}

impl DaoBase for ShareDao {
    type Entity = CardShare;
    const NAME: &'static str = "share";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl ShareDao {
    /// Shares every card in `card_ids` with `recipient`. Ownership is
    /// re-checked inside the transaction; pairs that already exist are
    /// skipped through the (card_id, shared_with) unique key.
    pub async fn grant(
        &self,
        owner_id: &Uuid,
        card_ids: &[Uuid],
        recipient: ShareRecipient<'_>,
    ) -> DaoResult<GrantOutcome> {
        retry_when_busy(move || self.grant_once(owner_id, card_ids, recipient)).await
    }

    async fn grant_once(
        &self,
        owner_id: &Uuid,
        card_ids: &[Uuid],
        recipient: ShareRecipient<'_>,
    ) -> DaoResult<GrantOutcome> {
        let txn = self.db.begin().await?;

        match grant_in(&txn, owner_id, card_ids, recipient).await {
            Ok(outcome @ GrantOutcome::Granted { .. }) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Ok(outcome) => {
                txn.rollback().await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "grant rollback failed");
                }
                Err(err)
            }
        }
    }

    pub async fn list_for_cards(&self, card_ids: &[Uuid]) -> DaoResult<Vec<card_share::Model>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(CardShare::find()
            .filter(card_share::Column::CardId.is_in(card_ids.iter().copied()))
            .order_by_asc(card_share::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn list_received(&self, recipient_id: &Uuid) -> DaoResult<Vec<card_share::Model>> {
        Ok(CardShare::find()
            .filter(card_share::Column::SharedWith.eq(*recipient_id))
            .order_by_asc(card_share::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_received(
        &self,
        recipient_id: &Uuid,
        card_id: &Uuid,
    ) -> DaoResult<Option<card_share::Model>> {
        Ok(CardShare::find()
            .filter(card_share::Column::CardId.eq(*card_id))
            .filter(card_share::Column::SharedWith.eq(*recipient_id))
            .one(&self.db)
            .await?)
    }

    /// Deletes one share created by `owner_id`; returns the number of rows removed.
    pub async fn revoke_by_id(&self, owner_id: &Uuid, share_id: &Uuid) -> DaoResult<u64> {
        let result = CardShare::delete_many()
            .filter(card_share::Column::Id.eq(*share_id))
            .filter(card_share::Column::SharedBy.eq(*owner_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn revoke_for_recipient(
        &self,
        owner_id: &Uuid,
        card_ids: &[Uuid],
        recipient_id: &Uuid,
    ) -> DaoResult<u64> {
        if card_ids.is_empty() {
            return Ok(0);
        }
        let result = CardShare::delete_many()
            .filter(card_share::Column::CardId.is_in(card_ids.iter().copied()))
            .filter(card_share::Column::SharedWith.eq(*recipient_id))
            .filter(card_share::Column::SharedBy.eq(*owner_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

async fn grant_in(
    txn: &DatabaseTransaction,
    owner_id: &Uuid,
    card_ids: &[Uuid],
    recipient: ShareRecipient<'_>,
) -> DaoResult<GrantOutcome> {
    let owned = LoyaltyCard::find()
        .filter(loyalty_card::Column::Id.is_in(card_ids.iter().copied()))
        .filter(loyalty_card::Column::UserId.eq(*owner_id))
        .all(txn)
        .await?;
    if owned.len() != card_ids.len() {
        return Ok(GrantOutcome::NotOwned);
    }

    let (account, provisioned) = match find_user(txn, recipient.email).await? {
        Some(account) => (account, false),
        None => {
            let Some(password_hash) = recipient.provisional_hash else {
                return Ok(GrantOutcome::RecipientMissing);
            };
            let inserted = provision_user(txn, recipient.email, password_hash).await?;
            // a concurrent insert for the same address makes ours a no-op
            let account = find_user(txn, recipient.email).await?.ok_or_else(|| {
                DaoLayerError::Db(DbErr::RecordNotFound(format!(
                    "user {} after provisioning",
                    recipient.email
                )))
            })?;
            (account, inserted)
        }
    };
    if account.id == *owner_id {
        return Ok(GrantOutcome::SelfShare);
    }

    let mut created = 0;
    let mut existing = 0;
    for card_id in card_ids {
        let mut share = card_share::ActiveModel {
            card_id: Set(*card_id),
            shared_with: Set(account.id),
            shared_by: Set(*owner_id),
            ..Default::default()
        };
        stamp_new(&mut share);

        let inserted = CardShare::insert(share)
            .on_conflict(
                OnConflict::columns([card_share::Column::CardId, card_share::Column::SharedWith])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await;

        match inserted {
            Ok(0) => existing += 1,
            Ok(_) => created += 1,
            Err(err) if is_unique_violation(&err) => existing += 1,
            Err(err) => return Err(DaoLayerError::Db(err)),
        }
    }

    Ok(GrantOutcome::Granted {
        recipient: account,
        provisioned,
        created,
        existing,
    })
}

async fn find_user(txn: &DatabaseTransaction, email: &str) -> DaoResult<Option<user::Model>> {
    Ok(User::find()
        .filter(user::Column::Email.eq(email))
        .one(txn)
        .await?)
}

/// Returns false when another transaction created the address first.
async fn provision_user(
    txn: &DatabaseTransaction,
    email: &str,
    password_hash: &str,
) -> DaoResult<bool> {
    let mut account = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(password_hash.to_string()),
        first_name: Set(None),
        last_name: Set(None),
        is_active: Set(true),
        reset_token: Set(None),
        reset_token_expiry: Set(None),
        last_login_at: Set(None),
        ..Default::default()
    };
    stamp_new(&mut account);

    let inserted = User::insert(account)
        .on_conflict(
            OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;
    Ok(inserted > 0)
}
