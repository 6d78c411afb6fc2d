pub mod category;
pub mod contact;
pub mod order;
pub mod order_item;
pub mod parameter;
pub mod product;
pub mod product_info;
pub mod product_parameter;
pub mod shop;
pub mod shop_category;
