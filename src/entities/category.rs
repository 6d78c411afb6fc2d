use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Assigned by the partner document, not generated
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
    #[sea_orm(has_many = "super::shop_category::Entity")]
    ShopCategory,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::shop::Entity> for Entity {
    fn to() -> RelationDef {
        super::shop_category::Relation::Shop.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::shop_category::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
