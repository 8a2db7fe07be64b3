use sea_orm::entity::prelude::*;

// Pooled multi-farmer quantity per crop+location; (crop_name, location) is a
// unique compound key at the database level.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_listings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub crop_name: String,
    pub location: String,
    pub total_quantity_kg: i32,
    pub price_per_kg: i64,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_listing_members::Entity")]
    Members,
}

impl Related<super::group_listing_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
