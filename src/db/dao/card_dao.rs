use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{DaoBase, DaoResult, base_traits::touch, retry::retry_when_busy};
use crate::db::entities::{
    card_share, loyalty_card,
    prelude::{CardShare, LoyaltyCard},
};

#[derive(Clone)]
pub struct CardDao {
    db: DatabaseConnection,
}

/// Column values for a new card; already validated by the service layer.
pub struct NewCard {
    pub owner_id: Uuid,
    pub shop_name: String,
    pub card_type: String,
    pub card_code: String,
    pub notes: Option<String>,
    pub logo_url: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Default, Clone)]
pub struct CardChanges {
    pub shop_name: Option<String>,
    pub card_type: Option<String>,
    pub card_code: Option<String>,
    pub notes: Option<Option<String>>,
    pub logo_url: Option<String>,
}

impl DaoBase for CardDao {
    type Entity = LoyaltyCard;
    const NAME: &'static str = "card";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl CardDao {
    pub async fn create_card(&self, card: NewCard) -> DaoResult<loyalty_card::Model> {
        let model = loyalty_card::ActiveModel {
            user_id: Set(card.owner_id),
            shop_name: Set(card.shop_name),
            card_type: Set(card.card_type),
            card_code: Set(card.card_code),
            notes: Set(card.notes),
            logo_url: Set(card.logo_url),
            ..Default::default()
        };
        self.create(model).await
    }

    pub async fn list_owned(&self, owner_id: &Uuid) -> DaoResult<Vec<loyalty_card::Model>> {
        Ok(LoyaltyCard::find()
            .filter(loyalty_card::Column::UserId.eq(*owner_id))
            .order_by_asc(loyalty_card::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> DaoResult<Vec<loyalty_card::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(LoyaltyCard::find()
            .filter(loyalty_card::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(loyalty_card::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_owned(
        &self,
        owner_id: &Uuid,
        card_id: &Uuid,
    ) -> DaoResult<Option<loyalty_card::Model>> {
        Ok(LoyaltyCard::find_by_id(*card_id)
            .filter(loyalty_card::Column::UserId.eq(*owner_id))
            .one(&self.db)
            .await?)
    }

    pub async fn find_owned_by_ids(
        &self,
        owner_id: &Uuid,
        card_ids: &[Uuid],
    ) -> DaoResult<Vec<loyalty_card::Model>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(LoyaltyCard::find()
            .filter(loyalty_card::Column::Id.is_in(card_ids.iter().copied()))
            .filter(loyalty_card::Column::UserId.eq(*owner_id))
            .all(&self.db)
            .await?)
    }

    /// Applies `changes` only if `owner_id` owns the card; the ownership check
    /// and the write share a transaction. `None` means not found or not owned.
    pub async fn update_owned(
        &self,
        owner_id: &Uuid,
        card_id: &Uuid,
        changes: CardChanges,
    ) -> DaoResult<Option<loyalty_card::Model>> {
        retry_when_busy(move || self.update_owned_once(owner_id, card_id, changes.clone())).await
    }

    async fn update_owned_once(
        &self,
        owner_id: &Uuid,
        card_id: &Uuid,
        changes: CardChanges,
    ) -> DaoResult<Option<loyalty_card::Model>> {
        let txn = self.db.begin().await?;

        let Some(card) = LoyaltyCard::find_by_id(*card_id)
            .filter(loyalty_card::Column::UserId.eq(*owner_id))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut active: loyalty_card::ActiveModel = card.into();
        if let Some(shop_name) = changes.shop_name {
            active.shop_name = Set(shop_name);
        }
        if let Some(card_type) = changes.card_type {
            active.card_type = Set(card_type);
        }
        if let Some(card_code) = changes.card_code {
            active.card_code = Set(card_code);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(notes);
        }
        if let Some(logo_url) = changes.logo_url {
            active.logo_url = Set(logo_url);
        }
        touch(&mut active);

        let updated = LoyaltyCard::update(active).exec(&txn).await?;
        txn.commit().await?;
        Ok(Some(updated))
    }

    /// Deletes an owned card together with its shares. Returns false when the
    /// card does not exist or belongs to someone else.
    pub async fn delete_owned(&self, owner_id: &Uuid, card_id: &Uuid) -> DaoResult<bool> {
        retry_when_busy(move || self.delete_owned_once(owner_id, card_id)).await
    }

    async fn delete_owned_once(&self, owner_id: &Uuid, card_id: &Uuid) -> DaoResult<bool> {
        // dropping the transaction on an early `?` rolls it back
        let txn = self.db.begin().await?;

        let owned = LoyaltyCard::find_by_id(*card_id)
            .filter(loyalty_card::Column::UserId.eq(*owner_id))
            .one(&txn)
            .await?;
        if owned.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }

        CardShare::delete_many()
            .filter(card_share::Column::CardId.eq(*card_id))
            .exec(&txn)
            .await?;
        LoyaltyCard::delete_by_id(*card_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
}
