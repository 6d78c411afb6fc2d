use crate::{
    auth::AuthUser,
    entities::{
        contact,
        order::{self, OrderState},
        order_item, product_info,
    },
    errors::{OrderError, ServiceError},
    notifications::{self, Notifier, OrderLine},
    services::{basket::find_basket, catalog::load_product_views, catalog::ProductInfoView},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItemView {
    pub id: i32,
    pub product_info: ProductInfoView,
    pub quantity: i32,
}

/// Order (or basket) with its lines and the total computed on read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderView {
    pub id: i32,
    pub state: OrderState,
    pub dt: DateTime<Utc>,
    pub contact: Option<contact::Model>,
    pub ordered_items: Vec<OrderItemView>,
    pub total_sum: i64,
}

impl OrderView {
    fn lines(&self) -> Vec<OrderLine> {
        self.ordered_items
            .iter()
            .map(|item| OrderLine {
                name: item.product_info.product.name.clone(),
                shop: item.product_info.shop_name.clone(),
                quantity: item.quantity,
                price: item.product_info.price,
            })
            .collect()
    }
}

/// Σ quantity × unit price
pub fn order_total<I>(lines: I) -> i64
where
    I: IntoIterator<Item = (i32, i64)>,
{
    lines
        .into_iter()
        .map(|(quantity, price)| i64::from(quantity) * price)
        .sum()
}

/// Checkout and order history
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    notifier: Arc<dyn Notifier>,
    admin_email: String,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, notifier: Arc<dyn Notifier>, admin_email: String) -> Self {
        Self {
            db,
            notifier,
            admin_email,
        }
    }

    /// Places the caller's basket as a new order.
    ///
    /// The contact is checked before the basket: a missing or foreign contact
    /// fails with `NoContact`, a missing or empty basket with `EmptyBasket`.
    /// The state change and contact attachment commit together; the buyer and
    /// the operator are notified afterwards. A delivery failure is returned as
    /// `NotificationError` while the order stays placed.
    #[instrument(skip(self, user), fields(user_id = user.user_id))]
    pub async fn checkout(
        &self,
        user: &AuthUser,
        contact_id: Option<i32>,
    ) -> Result<OrderView, OrderError> {
        let contact_id = contact_id.ok_or(ServiceError::NoContact)?;

        let txn = self.db.begin().await?;

        contact::Entity::find_by_id(contact_id)
            .filter(contact::Column::UserId.eq(user.user_id))
            .one(&txn)
            .await?
            .ok_or(ServiceError::NoContact)?;

        let basket = find_basket(&txn, user.user_id)
            .await?
            .ok_or(ServiceError::EmptyBasket)?;

        let line_count = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(basket.id))
            .count(&txn)
            .await?;
        if line_count == 0 {
            return Err(ServiceError::EmptyBasket);
        }

        let mut placed: order::ActiveModel = basket.into();
        placed.state = Set(OrderState::New);
        placed.contact_id = Set(Some(contact_id));
        let placed = placed.update(&txn).await?;

        txn.commit().await?;
        info!(order_id = placed.id, lines = line_count, "order placed");

        let view = load_order_views(&*self.db, vec![placed])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("placed order vanished".to_string()))?;

        self.notify_placed(user, &view).await?;
        Ok(view)
    }

    async fn notify_placed(&self, user: &AuthUser, view: &OrderView) -> Result<(), OrderError> {
        let lines = view.lines();
        let messages = [
            notifications::order_placed(&user.email, view.id, &lines, view.total_sum),
            notifications::new_order_for_admin(
                &self.admin_email,
                &user.email,
                view.id,
                &lines,
                view.total_sum,
            ),
        ];

        for message in messages {
            if let Err(e) = self.notifier.send(message).await {
                error!(order_id = view.id, error = %e, "order notification failed");
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Every order of the caller except the basket, oldest first
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: i32) -> Result<Vec<OrderView>, OrderError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::State.ne(OrderState::Basket))
            .order_by_asc(order::Column::Id)
            .all(&*self.db)
            .await?;
        load_order_views(&*self.db, orders).await
    }
}

/// Builds views for `orders` with lines, contacts and totals. Output order
/// follows `orders`.
pub(crate) async fn load_order_views<C>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, ServiceError>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let info_ids: HashSet<i32> = items.iter().map(|i| i.product_info_id).collect();
    let infos = product_info::Entity::find()
        .filter(product_info::Column::Id.is_in(info_ids))
        .all(db)
        .await?;
    let views: HashMap<i32, ProductInfoView> = load_product_views(db, infos)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let contact_ids: HashSet<i32> = orders.iter().filter_map(|o| o.contact_id).collect();
    let contacts: HashMap<i32, contact::Model> = if contact_ids.is_empty() {
        HashMap::new()
    } else {
        contact::Entity::find()
            .filter(contact::Column::Id.is_in(contact_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let mut lines: HashMap<i32, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        let Some(product_info) = views.get(&item.product_info_id).cloned() else {
            continue;
        };
        lines.entry(item.order_id).or_default().push(OrderItemView {
            id: item.id,
            product_info,
            quantity: item.quantity,
        });
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let ordered_items = lines.remove(&order.id).unwrap_or_default();
            let total_sum = order_total(
                ordered_items
                    .iter()
                    .map(|i| (i.quantity, i.product_info.price)),
            );
            OrderView {
                id: order.id,
                state: order.state,
                dt: order.dt,
                contact: order.contact_id.and_then(|id| contacts.get(&id).cloned()),
                ordered_items,
                total_sum,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_multiplies_quantity_by_price() {
        assert_eq!(order_total([(3, 100), (1, 250)]), 550);
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total(Vec::<(i32, i64)>::new()), 0);
    }

    #[test]
    fn total_does_not_overflow_i32() {
        assert_eq!(order_total([(100_000, 100_000)]), 10_000_000_000);
    }
}
