pub mod auth;
pub mod cart;
pub mod categories;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod reviews;
