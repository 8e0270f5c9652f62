use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "card_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    // (card_id, shared_with) is unique: a card is shared at most once per recipient.
    #[sea_orm(indexed, unique_key = "card_recipient")]
    pub card_id: Uuid,
    #[sea_orm(indexed, unique_key = "card_recipient")]
    pub shared_with: Uuid,
    #[sea_orm(indexed)]
    pub shared_by: Uuid,
    #[sea_orm(belongs_to, from = "card_id", to = "id", on_delete = "Cascade")]
    pub card: HasOne<super::loyalty_card::Entity>,
    #[sea_orm(
        belongs_to,
        relation_enum = "Recipient",
        from = "shared_with",
        to = "id",
        on_delete = "Cascade"
    )]
    pub recipient: HasOne<super::user::Entity>,
    #[sea_orm(
        belongs_to,
        relation_enum = "Sharer",
        from = "shared_by",
        to = "id",
        on_delete = "Cascade"
    )]
    pub sharer: HasOne<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

crate::timestamped_entity!();
