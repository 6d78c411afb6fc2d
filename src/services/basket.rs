use crate::{
    entities::{
        order::{self, OrderState},
        order_item, product_info,
    },
    errors::{OrderError, ServiceError},
    services::orders::{load_order_views, OrderView},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One requested basket line. Entries without `product_info` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasketItemInput {
    pub product_info: Option<i32>,
    /// Defaults to 1. Zero removes the line.
    pub quantity: Option<i32>,
}

/// Result of a basket update
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BasketUpdate {
    /// Lines created or changed
    pub updated: usize,
    /// Lines removed because their quantity was set to zero
    pub removed: usize,
}

/// Per-user draft order ("basket").
///
/// A user has at most one order in the `basket` state. It is created lazily on
/// the first add and becomes a regular order on checkout, after which the next
/// add starts a fresh basket.
#[derive(Clone)]
pub struct BasketService {
    db: Arc<DatabaseConnection>,
}

/// The user's current basket, if any. When several exist the oldest wins.
pub(crate) async fn find_basket<C>(db: &C, user_id: i32) -> Result<Option<order::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::State.eq(OrderState::Basket))
        .order_by_asc(order::Column::Id)
        .one(db)
        .await?)
}

/// Returns the user's basket, creating an empty one when none exists.
pub(crate) async fn get_or_create_basket<C>(db: &C, user_id: i32) -> Result<order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(basket) = find_basket(db, user_id).await? {
        return Ok(basket);
    }

    let basket = order::ActiveModel {
        user_id: Set(user_id),
        dt: Set(Utc::now()),
        state: Set(OrderState::Basket),
        contact_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(user_id, basket_id = basket.id, "created basket");
    Ok(basket)
}

impl BasketService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the user's basket, creating an empty one on first access.
    #[instrument(skip(self))]
    pub async fn view_basket(&self, user_id: i32) -> Result<OrderView, OrderError> {
        let basket = get_or_create_basket(&*self.db, user_id).await?;
        load_order_views(&*self.db, vec![basket])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("basket view missing".to_string()))
    }

    /// Adds or updates basket lines.
    ///
    /// Quantities replace what is already in the basket rather than adding to
    /// it. Every entry is validated before anything is written, and the whole
    /// call runs in one transaction: an id that does not resolve to an offer
    /// fails with `NotFound` and nothing from this call is kept.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - empty item list or a negative quantity
    /// * `NotFound` - unknown `product_info` id
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn add_items(
        &self,
        user_id: i32,
        items: Vec<BasketItemInput>,
    ) -> Result<BasketUpdate, OrderError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "items must not be empty".to_string(),
            ));
        }

        let mut requested: Vec<(i32, i32)> = Vec::with_capacity(items.len());
        for item in items {
            let Some(product_info_id) = item.product_info else {
                continue;
            };
            let quantity = item.quantity.unwrap_or(1);
            if quantity < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product_info {} must not be negative",
                    product_info_id
                )));
            }
            requested.push((product_info_id, quantity));
        }

        let txn = self.db.begin().await?;
        let basket = get_or_create_basket(&txn, user_id).await?;
        let mut result = BasketUpdate {
            updated: 0,
            removed: 0,
        };

        for (product_info_id, quantity) in requested {
            product_info::Entity::find_by_id(product_info_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product info {} not found", product_info_id))
                })?;

            let existing = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(basket.id))
                .filter(order_item::Column::ProductInfoId.eq(product_info_id))
                .one(&txn)
                .await?;

            match (existing, quantity) {
                (Some(line), 0) => {
                    order_item::Entity::delete_by_id(line.id).exec(&txn).await?;
                    result.removed += 1;
                }
                (None, 0) => {}
                (Some(line), quantity) => {
                    let mut line: order_item::ActiveModel = line.into();
                    line.quantity = Set(quantity);
                    line.update(&txn).await?;
                    result.updated += 1;
                }
                (None, quantity) => {
                    order_item::ActiveModel {
                        order_id: Set(basket.id),
                        product_info_id: Set(product_info_id),
                        quantity: Set(quantity),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await
                    .map_err(|e| ServiceError::from_write(e, "basket line"))?;
                    result.updated += 1;
                }
            }
        }

        txn.commit().await?;
        info!(
            basket_id = basket.id,
            updated = result.updated,
            removed = result.removed,
            "basket updated"
        );
        Ok(result)
    }

    /// Removes the lines for the given offers and returns how many went away.
    #[instrument(skip(self))]
    pub async fn remove_items(
        &self,
        user_id: i32,
        product_info_ids: Vec<i32>,
    ) -> Result<u64, OrderError> {
        if product_info_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "items must not be empty".to_string(),
            ));
        }

        let basket = find_basket(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Basket not found".to_string()))?;

        let deleted = order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(basket.id))
            .filter(order_item::Column::ProductInfoId.is_in(product_info_ids))
            .exec(&*self.db)
            .await?
            .rows_affected;

        info!(basket_id = basket.id, deleted, "basket lines removed");
        Ok(deleted)
    }
}
