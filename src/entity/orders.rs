use sea_orm::entity::prelude::*;

// `product_id` is a plain column: products can be hard-deleted while their
// historical orders remain, so reads join products defensively.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub product_id: Uuid,
    pub quantity_kg: i32,
    pub price_per_kg: i64,
    pub total_price: i64,
    pub status: String,
    pub payment_status: String,
    pub dispute_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::BuyerId",
        to = "super::users::Column::Id"
    )]
    Buyer,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FarmerId",
        to = "super::users::Column::Id"
    )]
    Farmer,
}

impl ActiveModelBehavior for ActiveModel {}
