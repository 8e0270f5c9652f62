use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "loyalty_cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    pub shop_name: String,
    /// `BARCODE` or `QRCODE`, see `services::card_service::CardType`.
    pub card_type: String,
    pub card_code: String,
    pub notes: Option<String>,
    pub logo_url: String,
    #[sea_orm(indexed)]
    pub user_id: Uuid,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub owner: HasOne<super::user::Entity>,
    #[sea_orm(has_many)]
    pub shares: HasMany<super::card_share::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

crate::timestamped_entity!();
