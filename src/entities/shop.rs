use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Partner shop; looked up by name during price-list import
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub url: Option<String>,
    pub user_id: Option<i32>,
    /// Open for orders
    pub state: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::auth::user::Entity",
        from = "Column::UserId",
        to = "crate::auth::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::product_info::Entity")]
    ProductInfo,
    #[sea_orm(has_many = "super::shop_category::Entity")]
    ShopCategory,
}

impl Related<crate::auth::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductInfo.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::shop_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::shop_category::Relation::Shop.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
