use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_listing_members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub farmer_id: Uuid,
    pub product_id: Uuid,
    pub quantity_kg: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group_listings::Entity",
        from = "Column::GroupId",
        to = "super::group_listings::Column::Id"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FarmerId",
        to = "super::users::Column::Id"
    )]
    Farmer,
}

impl Related<super::group_listings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
