use sea_orm::entity::prelude::*;

/// Benefit rows are removed by the FK cascade when their tier is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tier_benefits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tier_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
