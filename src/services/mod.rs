// Accounts and authentication tokens
pub mod accounts;

// Catalog: partner uploads and the public read side
pub mod catalog;
pub mod price_list;

// Basket, checkout and order history
pub mod basket;
pub mod orders;

// Delivery contacts
pub mod contacts;
