use crate::{
    entities::{category, parameter, product, product_info, product_parameter, shop},
    errors::ServiceError,
};
use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShopView {
    pub id: i32,
    pub name: String,
    pub url: Option<String>,
    pub state: bool,
}

impl From<shop::Model> for ShopView {
    fn from(model: shop::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            state: model.state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductView {
    pub name: String,
    /// Category name
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductParameterView {
    pub parameter: String,
    pub value: String,
}

/// A shop's offer as exposed by the catalog, basket and order endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductInfoView {
    pub id: i32,
    pub model: String,
    pub product: ProductView,
    pub shop: i32,
    #[serde(skip)]
    pub shop_name: String,
    pub quantity: i32,
    pub price: i64,
    pub price_rrc: i64,
    pub product_parameters: Vec<ProductParameterView>,
}

/// Filters for `GET /products`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub shop_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
}

/// Read side of the catalog
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Shops currently accepting orders
    #[instrument(skip(self))]
    pub async fn list_shops(&self) -> Result<Vec<ShopView>, ServiceError> {
        let shops = shop::Entity::find()
            .filter(shop::Column::State.eq(true))
            .order_by_asc(shop::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(shops.into_iter().map(ShopView::from).collect())
    }

    /// Offers from open shops, optionally narrowed by shop, category and name.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductInfoView>, ServiceError> {
        let mut query = product_info::Entity::find()
            .join(JoinType::InnerJoin, product_info::Relation::Shop.def())
            .join(JoinType::InnerJoin, product_info::Relation::Product.def())
            .filter(shop::Column::State.eq(true));

        if let Some(shop_id) = filter.shop_id {
            query = query.filter(product_info::Column::ShopId.eq(shop_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    product::Entity,
                    product::Column::Name,
                ))))
                .like(pattern),
            );
        }

        let infos = query
            .order_by_asc(product_info::Column::Id)
            .all(&*self.db)
            .await?;
        load_product_views(&*self.db, infos).await
    }
}

/// Expands offers into views with product, category, shop and parameters,
/// batching the lookups instead of querying per row. Output order follows
/// `infos`.
pub(crate) async fn load_product_views<C>(
    db: &C,
    infos: Vec<product_info::Model>,
) -> Result<Vec<ProductInfoView>, ServiceError>
where
    C: ConnectionTrait,
{
    if infos.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: HashSet<i32> = infos.iter().map(|i| i.product_id).collect();
    let shop_ids: HashSet<i32> = infos.iter().map(|i| i.shop_id).collect();
    let info_ids: Vec<i32> = infos.iter().map(|i| i.id).collect();

    let products: HashMap<i32, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let category_ids: HashSet<i32> = products.values().map(|p| p.category_id).collect();
    let categories: HashMap<i32, String> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let shops: HashMap<i32, String> = shop::Entity::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let links = product_parameter::Entity::find()
        .filter(product_parameter::Column::ProductInfoId.is_in(info_ids))
        .order_by_asc(product_parameter::Column::Id)
        .all(db)
        .await?;
    let parameter_ids: HashSet<i32> = links.iter().map(|l| l.parameter_id).collect();
    let parameter_names: HashMap<i32, String> = parameter::Entity::find()
        .filter(parameter::Column::Id.is_in(parameter_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let mut parameters: HashMap<i32, Vec<ProductParameterView>> = HashMap::new();
    for link in links {
        let name = parameter_names
            .get(&link.parameter_id)
            .cloned()
            .unwrap_or_default();
        parameters
            .entry(link.product_info_id)
            .or_default()
            .push(ProductParameterView {
                parameter: name,
                value: link.value,
            });
    }

    infos
        .into_iter()
        .map(|info| {
            let product = products.get(&info.product_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "product {} missing for offer {}",
                    info.product_id, info.id
                ))
            })?;
            Ok(ProductInfoView {
                id: info.id,
                model: info.model,
                product: ProductView {
                    name: product.name.clone(),
                    category: categories
                        .get(&product.category_id)
                        .cloned()
                        .unwrap_or_default(),
                },
                shop: info.shop_id,
                shop_name: shops.get(&info.shop_id).cloned().unwrap_or_default(),
                quantity: info.quantity,
                price: info.price,
                price_rrc: info.price_rrc,
                product_parameters: parameters.remove(&info.id).unwrap_or_default(),
            })
        })
        .collect()
}
