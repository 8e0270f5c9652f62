use std::{collections::HashMap, str::FromStr};

use serde::Serialize;
use uuid::Uuid;

use super::{
    user_service::UserService,
    validation::{optional_text, required_text},
    views::{CardView, ShareView, UserIndex, UserSummary},
};
use crate::{
    db::{
        dao::{CardChanges, CardDao, NewCard, ShareDao},
        entities::{card_share, loyalty_card},
    },
    error::AppError,
    logos::logo_for,
};

pub const CARD_NOT_FOUND: &str = "Card not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Barcode,
    QrCode,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Barcode => "BARCODE",
            CardType::QrCode => "QRCODE",
        }
    }
}

impl FromStr for CardType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BARCODE" => Ok(CardType::Barcode),
            "QRCODE" => Ok(CardType::QrCode),
            _ => Err(AppError::bad_request("Card type must be BARCODE or QRCODE")),
        }
    }
}

pub struct CardInput<'a> {
    pub shop_name: Option<&'a str>,
    pub card_type: Option<&'a str>,
    pub card_code: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCard {
    #[serde(flatten)]
    pub card: CardView,
    pub shares: Vec<ShareView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedCard {
    #[serde(flatten)]
    pub card: CardView,
    pub share_id: Uuid,
    pub shared_by: UserSummary,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardListing {
    pub owned: Vec<OwnedCard>,
    pub shared: Vec<SharedCard>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum CardDetail {
    Owner(OwnedCard),
    Shared(SharedCard),
}

#[derive(Clone)]
pub struct CardService {
    card_dao: CardDao,
    share_dao: ShareDao,
    users: UserService,
}

impl CardService {
    pub fn new(card_dao: CardDao, share_dao: ShareDao, users: UserService) -> Self {
        Self {
            card_dao,
            share_dao,
            users,
        }
    }

    pub async fn list_cards(&self, user_id: &Uuid) -> Result<CardListing, AppError> {
        let owned = self.card_dao.list_owned(user_id).await?;
        let owned_ids: Vec<Uuid> = owned.iter().map(|card| card.id).collect();
        let outgoing = self.share_dao.list_for_cards(&owned_ids).await?;

        let received = self.share_dao.list_received(user_id).await?;
        let received_ids: Vec<Uuid> = received.iter().map(|share| share.card_id).collect();
        let shared_cards = self.card_dao.find_many(&received_ids).await?;

        let mut people: Vec<Uuid> = outgoing.iter().map(|share| share.shared_with).collect();
        people.extend(shared_cards.iter().map(|card| card.user_id));
        people.sort();
        people.dedup();
        let index = UserIndex::new(self.users.find_many(&people).await?);

        let mut shares_by_card: HashMap<Uuid, Vec<card_share::Model>> = HashMap::new();
        for share in outgoing {
            shares_by_card.entry(share.card_id).or_default().push(share);
        }

        let mut owned = owned;
        sort_by_shop(&mut owned);
        let owned = owned
            .into_iter()
            .map(|card| {
                let shares = shares_by_card.remove(&card.id).unwrap_or_default();
                OwnedCard {
                    shares: index.share_views(&shares),
                    card: card.into(),
                }
            })
            .collect();

        let share_for_card: HashMap<Uuid, Uuid> = received
            .iter()
            .map(|share| (share.card_id, share.id))
            .collect();
        let mut shared_cards = shared_cards;
        sort_by_shop(&mut shared_cards);
        let shared = shared_cards
            .into_iter()
            .filter_map(|card| {
                Some(SharedCard {
                    share_id: *share_for_card.get(&card.id)?,
                    shared_by: index.summary(&card.user_id)?,
                    card: card.into(),
                })
            })
            .collect();

        Ok(CardListing { owned, shared })
    }

    pub async fn create_card(
        &self,
        owner_id: &Uuid,
        input: CardInput<'_>,
    ) -> Result<CardView, AppError> {
        const MISSING: &str = "Shop name, card type and card code are required";
        let shop_name = required_text(input.shop_name, MISSING)?;
        let card_type = CardType::from_str(&required_text(input.card_type, MISSING)?)?;
        let card_code = required_text(input.card_code, MISSING)?;

        let card = self
            .card_dao
            .create_card(NewCard {
                owner_id: *owner_id,
                logo_url: logo_for(&shop_name).to_string(),
                shop_name,
                card_type: card_type.as_str().to_string(),
                card_code,
                notes: optional_text(input.notes),
            })
            .await?;

        tracing::info!(card_id = %card.id, owner_id = %owner_id, "card created");
        Ok(card.into())
    }

    /// Visible to the owner and to share recipients; everyone else gets the
    /// same 404 as for an id that does not exist.
    pub async fn get_card(&self, user_id: &Uuid, card_id: &Uuid) -> Result<CardDetail, AppError> {
        let card = self
            .card_dao
            .find_many(&[*card_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;

        if card.user_id == *user_id {
            let shares = self.share_dao.list_for_cards(&[card.id]).await?;
            let recipients: Vec<Uuid> = shares.iter().map(|share| share.shared_with).collect();
            let index = UserIndex::new(self.users.find_many(&recipients).await?);
            return Ok(CardDetail::Owner(OwnedCard {
                shares: index.share_views(&shares),
                card: card.into(),
            }));
        }

        let share = self
            .share_dao
            .find_received(user_id, card_id)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;
        let owner = self
            .users
            .find_by_id(&card.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;

        Ok(CardDetail::Shared(SharedCard {
            share_id: share.id,
            shared_by: UserSummary::from(&owner),
            card: card.into(),
        }))
    }

    /// Owner-only partial update. `notes: Some("")` clears the notes.
    pub async fn update_card(
        &self,
        owner_id: &Uuid,
        card_id: &Uuid,
        patch: CardInput<'_>,
    ) -> Result<CardView, AppError> {
        let changes = build_changes(patch)?;

        let updated = self
            .card_dao
            .update_owned(owner_id, card_id, changes)
            .await?
            .ok_or_else(|| AppError::not_found(CARD_NOT_FOUND))?;

        tracing::info!(card_id = %updated.id, "card updated");
        Ok(updated.into())
    }

    pub async fn delete_card(&self, owner_id: &Uuid, card_id: &Uuid) -> Result<(), AppError> {
        if !self.card_dao.delete_owned(owner_id, card_id).await? {
            return Err(AppError::not_found(CARD_NOT_FOUND));
        }
        tracing::info!(card_id = %card_id, "card deleted");
        Ok(())
    }
}

fn build_changes(patch: CardInput<'_>) -> Result<CardChanges, AppError> {
    if patch.shop_name.is_none()
        && patch.card_type.is_none()
        && patch.card_code.is_none()
        && patch.notes.is_none()
    {
        return Err(AppError::bad_request("No fields to update"));
    }

    let mut changes = CardChanges::default();
    if let Some(raw) = patch.shop_name {
        let shop_name = required_text(Some(raw), "Shop name cannot be empty")?;
        changes.logo_url = Some(logo_for(&shop_name).to_string());
        changes.shop_name = Some(shop_name);
    }
    if let Some(raw) = patch.card_type {
        changes.card_type = Some(CardType::from_str(raw)?.as_str().to_string());
    }
    if let Some(raw) = patch.card_code {
        changes.card_code = Some(required_text(Some(raw), "Card code cannot be empty")?);
    }
    if let Some(raw) = patch.notes {
        changes.notes = Some(optional_text(Some(raw)));
    }
    Ok(changes)
}

fn sort_by_shop(cards: &mut [loyalty_card::Model]) {
    cards.sort_by(|a, b| {
        a.shop_name
            .to_lowercase()
            .cmp(&b.shop_name.to_lowercase())
            .then(a.created_at.cmp(&b.created_at))
    });
}
