//! Partner price-list import.
//!
//! A shop account uploads a JSON or YAML document describing its shop, the
//! categories it sells in and its goods. The document is checked in full
//! before the database is touched; the import then replaces every offer of
//! the shop inside one transaction.

use crate::{
    auth::{AuthUser, UserRole},
    entities::{category, parameter, product, product_info, product_parameter, shop, shop_category},
    errors::{ImportError, ServiceError},
};
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Fails with `Forbidden` unless `user` is a shop account.
pub fn ensure_uploader(user: &AuthUser) -> Result<(), ImportError> {
    user.require_role(UserRole::Shop, "Only shop accounts can upload price lists")
}

/// Supported upload formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceListFormat {
    Json,
    Yaml,
}

impl PriceListFormat {
    pub fn from_filename(filename: &str) -> Result<Self, ImportError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(ServiceError::UnsupportedFormat(format!(
                "'{}' is not a .json, .yaml or .yml file",
                filename
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PriceListDocument {
    #[validate(length(min = 1, max = 50))]
    pub shop: String,
    #[serde(default)]
    #[validate]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    #[validate]
    pub goods: Vec<GoodsRecord>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CategoryRecord {
    pub id: i32,
    #[validate(length(min = 1, max = 40))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GoodsRecord {
    /// Partner-side id, kept for reference only
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub category: i32,
    #[serde(default)]
    #[validate(length(max = 80))]
    pub model: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub price: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub price_rrc: i64,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Parameter values arrive as strings, numbers or booleans and are stored
/// as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

/// Parses and validates an uploaded price list.
///
/// Syntax errors are `ParseError`; a well-formed document with the wrong
/// shape (missing or unknown fields, wrong types, out-of-range values) is a
/// `ValidationError`.
pub fn parse_price_list(filename: &str, bytes: &[u8]) -> Result<PriceListDocument, ImportError> {
    let format = PriceListFormat::from_filename(filename)?;

    let raw: serde_json::Value = match format {
        PriceListFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| ServiceError::ParseError(format!("invalid JSON: {}", e)))?,
        PriceListFormat::Yaml => serde_yaml::from_slice(bytes)
            .map_err(|e| ServiceError::ParseError(format!("invalid YAML: {}", e)))?,
    };

    let document: PriceListDocument = serde_json::from_value(raw)
        .map_err(|e| ServiceError::ValidationError(format!("invalid price list: {}", e)))?;
    document.validate()?;
    Ok(document)
}

/// Counts reported back to the uploader
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub shop_id: i32,
    pub shop: String,
    pub categories: usize,
    pub products: usize,
    pub parameters: usize,
}

#[derive(Clone)]
pub struct PriceListImporter {
    db: Arc<DatabaseConnection>,
}

impl PriceListImporter {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Imports a price list for the uploading shop account.
    ///
    /// Steps, all inside one transaction:
    /// 1. find or create the shop by name and attach it to the uploader
    /// 2. find or create each declared category and link it to the shop
    /// 3. delete every offer of the shop (their parameters go with them)
    /// 4. recreate one offer per goods entry with its parameters
    ///
    /// Any failure rolls the whole import back.
    #[instrument(skip(self, user, bytes), fields(user_id = user.user_id, size = bytes.len()))]
    pub async fn import(
        &self,
        user: &AuthUser,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ImportSummary, ImportError> {
        ensure_uploader(user)?;
        let document = parse_price_list(filename, bytes)?;

        let txn = self.db.begin().await?;
        let summary = apply_document(&txn, user.user_id, &document).await?;
        txn.commit().await?;

        info!(
            shop_id = summary.shop_id,
            shop = %summary.shop,
            categories = summary.categories,
            products = summary.products,
            parameters = summary.parameters,
            "price list imported"
        );
        Ok(summary)
    }
}

async fn apply_document(
    txn: &DatabaseTransaction,
    user_id: i32,
    document: &PriceListDocument,
) -> Result<ImportSummary, ImportError> {
    let shop = resolve_shop(txn, user_id, &document.shop).await?;

    let mut known_categories: HashSet<i32> = HashSet::new();
    for record in &document.categories {
        resolve_category(txn, shop.id, record).await?;
        known_categories.insert(record.id);
    }

    product_parameter::Entity::delete_many()
        .filter(
            product_parameter::Column::ProductInfoId.in_subquery(
                Query::select()
                    .column(product_info::Column::Id)
                    .from(product_info::Entity)
                    .and_where(product_info::Column::ShopId.eq(shop.id))
                    .to_owned(),
            ),
        )
        .exec(txn)
        .await?;
    let removed = product_info::Entity::delete_many()
        .filter(product_info::Column::ShopId.eq(shop.id))
        .exec(txn)
        .await?
        .rows_affected;
    if removed > 0 {
        info!(shop_id = shop.id, removed, "cleared previous offers");
    }

    let mut parameter_ids: HashMap<String, i32> = HashMap::new();
    let mut parameter_rows = 0;
    for goods in &document.goods {
        if !known_categories.contains(&goods.category) {
            category::Entity::find_by_id(goods.category)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "goods '{}' refers to unknown category {}",
                        goods.name, goods.category
                    ))
                })?;
            known_categories.insert(goods.category);
        }

        let product = resolve_product(txn, &goods.name, goods.category).await?;
        let offer = product_info::ActiveModel {
            product_id: Set(product.id),
            shop_id: Set(shop.id),
            external_id: Set(goods.id),
            model: Set(goods.model.clone()),
            quantity: Set(goods.quantity),
            price: Set(goods.price),
            price_rrc: Set(goods.price_rrc),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_write(e, "product offer"))?;

        for (name, value) in &goods.parameters {
            let parameter_id = match parameter_ids.get(name) {
                Some(id) => *id,
                None => {
                    let id = resolve_parameter(txn, name).await?;
                    parameter_ids.insert(name.clone(), id);
                    id
                }
            };
            product_parameter::ActiveModel {
                product_info_id: Set(offer.id),
                parameter_id: Set(parameter_id),
                value: Set(value.to_string()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            parameter_rows += 1;
        }
    }

    Ok(ImportSummary {
        shop_id: shop.id,
        shop: shop.name,
        categories: document.categories.len(),
        products: document.goods.len(),
        parameters: parameter_rows,
    })
}

async fn resolve_shop(
    txn: &DatabaseTransaction,
    user_id: i32,
    name: &str,
) -> Result<shop::Model, ImportError> {
    let existing = shop::Entity::find()
        .filter(shop::Column::Name.eq(name))
        .one(txn)
        .await?;

    match existing {
        Some(found) if found.user_id == Some(user_id) => Ok(found),
        Some(found) => {
            warn!(
                shop_id = found.id,
                shop = %found.name,
                previous_owner = ?found.user_id,
                new_owner = user_id,
                "shop re-associated with a different uploader"
            );
            let mut active: shop::ActiveModel = found.into();
            active.user_id = Set(Some(user_id));
            Ok(active.update(txn).await?)
        }
        None => shop::ActiveModel {
            name: Set(name.to_string()),
            url: Set(None),
            user_id: Set(Some(user_id)),
            state: Set(true),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_write(e, "shop")),
    }
}

async fn resolve_category(
    txn: &DatabaseTransaction,
    shop_id: i32,
    record: &CategoryRecord,
) -> Result<(), ImportError> {
    match category::Entity::find_by_id(record.id).one(txn).await? {
        Some(existing) if existing.name != record.name => {
            return Err(ServiceError::Conflict(format!(
                "category {} is already named '{}', not '{}'",
                record.id, existing.name, record.name
            )));
        }
        Some(_) => {}
        None => {
            category::ActiveModel {
                id: Set(record.id),
                name: Set(record.name.clone()),
            }
            .insert(txn)
            .await
            .map_err(|e| ServiceError::from_write(e, "category"))?;
        }
    }

    let linked = shop_category::Entity::find()
        .filter(shop_category::Column::ShopId.eq(shop_id))
        .filter(shop_category::Column::CategoryId.eq(record.id))
        .one(txn)
        .await?;
    if linked.is_none() {
        shop_category::ActiveModel {
            shop_id: Set(shop_id),
            category_id: Set(record.id),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

async fn resolve_product(
    txn: &DatabaseTransaction,
    name: &str,
    category_id: i32,
) -> Result<product::Model, ImportError> {
    let existing = product::Entity::find()
        .filter(product::Column::Name.eq(name))
        .filter(product::Column::CategoryId.eq(category_id))
        .one(txn)
        .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    Ok(product::ActiveModel {
        name: Set(name.to_string()),
        category_id: Set(category_id),
        ..Default::default()
    }
    .insert(txn)
    .await?)
}

async fn resolve_parameter(txn: &DatabaseTransaction, name: &str) -> Result<i32, ImportError> {
    let existing = parameter::Entity::find()
        .filter(parameter::Column::Name.eq(name))
        .one(txn)
        .await?;
    if let Some(found) = existing {
        return Ok(found.id);
    }

    let created = parameter::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| ServiceError::from_write(e, "parameter"))?;
    Ok(created.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const YAML: &str = r#"
shop: Acme
categories:
  - id: 224
    name: Smartphones
goods:
  - id: 4216292
    category: 224
    model: apple/iphone/xs-max
    name: Smartphone Apple iPhone XS Max 512GB (gold)
    price: 110000
    price_rrc: 116990
    quantity: 14
    parameters:
      "Screen size (in)": 6.5
      "Resolution (px)": 2688x1242
      "Built-in storage (GB)": 512
      Color: gold
"#;

    #[test]
    fn picks_format_from_extension() {
        assert_eq!(
            PriceListFormat::from_filename("list.JSON").unwrap(),
            PriceListFormat::Json
        );
        assert_eq!(
            PriceListFormat::from_filename("shop1.yml").unwrap(),
            PriceListFormat::Yaml
        );
        assert_matches!(
            PriceListFormat::from_filename("prices.csv"),
            Err(ServiceError::UnsupportedFormat(_))
        );
        assert_matches!(
            PriceListFormat::from_filename("no_extension"),
            Err(ServiceError::UnsupportedFormat(_))
        );
    }

    #[test]
    fn parses_yaml_document() {
        let doc = parse_price_list("shop1.yaml", YAML.as_bytes()).unwrap();
        assert_eq!(doc.shop, "Acme");
        assert_eq!(doc.categories.len(), 1);
        let goods = &doc.goods[0];
        assert_eq!(goods.id, Some(4216292));
        assert_eq!(goods.price, 110000);
        assert_eq!(goods.parameters["Screen size (in)"].to_string(), "6.5");
        assert_eq!(goods.parameters["Built-in storage (GB)"].to_string(), "512");
        assert_eq!(goods.parameters["Color"].to_string(), "gold");
    }

    #[test]
    fn goods_fields_default_when_absent() {
        let doc = parse_price_list(
            "list.json",
            br#"{"shop":"Acme","goods":[{"name":"Widget","category":1}]}"#,
        )
        .unwrap();
        let goods = &doc.goods[0];
        assert_eq!(goods.model, "");
        assert_eq!((goods.quantity, goods.price, goods.price_rrc), (0, 0, 0));
        assert!(goods.parameters.is_empty());
        assert!(doc.categories.is_empty());
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert_matches!(
            parse_price_list("list.json", b"{\"shop\": "),
            Err(ServiceError::ParseError(_))
        );
        assert_matches!(
            parse_price_list("list.yaml", b"shop: [unterminated"),
            Err(ServiceError::ParseError(_))
        );
    }

    #[test]
    fn wrong_shape_is_a_validation_error() {
        // missing shop
        assert_matches!(
            parse_price_list("list.json", br#"{"goods": []}"#),
            Err(ServiceError::ValidationError(_))
        );
        // goods entry without a name
        assert_matches!(
            parse_price_list("list.json", br#"{"shop":"A","goods":[{"category":1}]}"#),
            Err(ServiceError::ValidationError(_))
        );
        // unknown top-level field
        assert_matches!(
            parse_price_list("list.json", br#"{"shop":"A","owner":"me"}"#),
            Err(ServiceError::ValidationError(_))
        );
        // negative price
        assert_matches!(
            parse_price_list(
                "list.json",
                br#"{"shop":"A","goods":[{"name":"W","category":1,"price":-5}]}"#
            ),
            Err(ServiceError::ValidationError(_))
        );
        // empty shop name
        assert_matches!(
            parse_price_list("list.json", br#"{"shop":""}"#),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn bundled_sample_price_list_parses() {
        let doc = parse_price_list("shop1.yaml", include_bytes!("../../data/shop1.yaml")).unwrap();
        assert_eq!(doc.categories.len(), 2);
        assert_eq!(doc.goods.len(), 3);
        assert_eq!(doc.goods[2].parameters["Wireless"], ParameterValue::Bool(true));
    }

    #[test]
    fn parameter_values_render_as_text() {
        assert_eq!(ParameterValue::Bool(true).to_string(), "true");
        assert_eq!(ParameterValue::Integer(64).to_string(), "64");
        assert_eq!(ParameterValue::Float(5.8).to_string(), "5.8");
        assert_eq!(ParameterValue::Text("black".into()).to_string(), "black");
    }
}
