pub mod cart_items;
pub mod categories;
pub mod discount_codes;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
