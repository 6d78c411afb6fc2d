use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named product characteristic such as "Color" or "Screen size"
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parameters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_parameter::Entity")]
    ProductParameter,
}

impl Related<super::product_parameter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductParameter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
