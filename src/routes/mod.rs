use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod categories;
pub mod discounts;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/cart", cart::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/reviews", reviews::router())
        .nest("/order", orders::router())
        .nest("/discount-codes", discounts::router())
}
