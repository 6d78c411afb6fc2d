pub mod accounts;
pub mod basket;
pub mod catalog;
pub mod common;
pub mod contacts;
pub mod orders;
pub mod partner;

use crate::{
    config::AppConfig,
    db::DbPool,
    notifications::Notifier,
    services::{
        accounts::AccountService, basket::BasketService, catalog::CatalogService,
        contacts::ContactService, orders::OrderService, price_list::PriceListImporter,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub price_list: Arc<PriceListImporter>,
    pub basket: Arc<BasketService>,
    pub orders: Arc<OrderService>,
    pub contacts: Arc<ContactService>,
}

impl AppServices {
    /// Wires every service onto one pool and one notifier.
    pub fn new(db_pool: Arc<DbPool>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        let reset_ttl = chrono::Duration::seconds(
            i64::try_from(config.password_reset_token_ttl_secs).unwrap_or(i64::MAX),
        );

        Self {
            accounts: Arc::new(AccountService::new(
                db_pool.clone(),
                notifier.clone(),
                reset_ttl,
            )),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            price_list: Arc::new(PriceListImporter::new(db_pool.clone())),
            basket: Arc::new(BasketService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                notifier,
                config.admin_email.clone(),
            )),
            contacts: Arc::new(ContactService::new(db_pool)),
        }
    }
}
