use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::db::entities::{card_share, loyalty_card, user};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: Uuid,
    pub shop_name: String,
    pub card_type: String,
    pub card_code: String,
    pub notes: Option<String>,
    pub logo_url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<loyalty_card::Model> for CardView {
    fn from(model: loyalty_card::Model) -> Self {
        Self {
            id: model.id,
            shop_name: model.shop_name,
            card_type: model.card_type,
            card_code: model.card_code,
            notes: model.notes,
            logo_url: model.logo_url,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One recipient of an owned card.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: Uuid,
    pub card_id: Uuid,
    pub shared_with_user: UserSummary,
    pub created_at: DateTime<FixedOffset>,
}

/// Users keyed by id, for attaching emails to shares.
pub(crate) struct UserIndex(HashMap<Uuid, user::Model>);

impl UserIndex {
    pub(crate) fn new(users: Vec<user::Model>) -> Self {
        Self(users.into_iter().map(|user| (user.id, user)).collect())
    }

    pub(crate) fn summary(&self, id: &Uuid) -> Option<UserSummary> {
        self.0.get(id).map(UserSummary::from)
    }

    /// Shares whose recipient row is gone are skipped.
    pub(crate) fn share_views(&self, shares: &[card_share::Model]) -> Vec<ShareView> {
        shares
            .iter()
            .filter_map(|share| {
                Some(ShareView {
                    id: share.id,
                    card_id: share.card_id,
                    shared_with_user: self.summary(&share.shared_with)?,
                    created_at: share.created_at,
                })
            })
            .collect()
    }
}
