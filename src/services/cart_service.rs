use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::cart::{
        AddToCartRequest, CartItemDto, CartView, RemoveCartItemRequest, UpdateCartItemRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// A cart line joined with its product.
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.item.quantity)
    }
}

/// Loads the caller's cart. Lines whose product has since been deleted are
/// dropped from the result.
pub async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<Vec<CartLine>> {
    let items = state.store.carts.find_by_user(user_id).await?;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match state.store.products.find_by_id(item.product_id).await? {
            Some(product) => lines.push(CartLine { item, product }),
            None => {
                tracing::warn!(cart_item_id = %item.id, product_id = %item.product_id, "cart line references a missing product");
            }
        }
    }
    Ok(lines)
}

pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::subtotal).sum()
}

async fn cart_view(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let lines = load_cart(state, user_id).await?;
    let total = cart_total(&lines);
    let items = lines
        .into_iter()
        .map(|line| CartItemDto {
            id: line.item.id,
            subtotal: line.subtotal(),
            quantity: line.item.quantity,
            product: line.product,
        })
        .collect();
    Ok(CartView { items, total })
}

/// The caller's line with `cart_item_id`; lines of other users are reported
/// as missing.
async fn owned_item(state: &AppState, user: &AuthUser, cart_item_id: Uuid) -> AppResult<CartItem> {
    state
        .store
        .carts
        .find_item(cart_item_id)
        .await?
        .filter(|item| item.user_id == user.user_id)
        .ok_or_else(|| AppError::not_found("Cart item"))
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = state
        .store
        .products
        .find_by_id(payload.product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let existing = state
        .store
        .carts
        .find_by_user(user.user_id)
        .await?
        .into_iter()
        .find(|item| item.product_id == payload.product_id);

    let insufficient =
        || AppError::BadRequest(format!("Insufficient stock for {}", product.name));
    let item = match existing {
        Some(mut item) => {
            item.quantity = item
                .quantity
                .checked_add(payload.quantity)
                .ok_or_else(insufficient)?;
            item
        }
        None => CartItem {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            product_id: product.id,
            quantity: payload.quantity,
            created_at: Utc::now(),
        },
    };

    if item.quantity > product.stock {
        return Err(insufficient());
    }

    state.store.carts.save_item(item).await?;
    tracing::debug!(user_id = %user.user_id, product_id = %product.id, "cart updated");

    let view = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", view, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let mut item = owned_item(state, user, payload.cart_item_id).await?;

    if payload.quantity <= 0 {
        state.store.carts.delete_item(item.id).await?;
    } else {
        let product = state
            .store
            .products
            .find_by_id(item.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        if payload.quantity > product.stock {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        item.quantity = payload.quantity;
        state.store.carts.save_item(item).await?;
    }

    let view = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", view, None))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: RemoveCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let item = owned_item(state, user, payload.cart_item_id).await?;
    state.store.carts.delete_item(item.id).await?;

    let view = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", view, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    state.store.carts.clear(user.user_id).await?;
    Ok(ApiResponse::success(
        "Cart cleared",
        CartView {
            items: Vec::new(),
            total: 0.0,
        },
        Some(Meta::empty()),
    ))
}
