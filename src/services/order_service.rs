use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, PaymentIntentResponse, PlaceOrderRequest},
    error::{AppError, AppResult},
    mail::{EmailMessage, notify},
    middleware::auth::{AuthUser, Permission},
    models::{DiscountCode, Order, OrderItem, OrderStatus, User},
    payments::{is_intent_id, to_minor_units},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::cart_service::{cart_total, load_cart},
    state::AppState,
};

async fn load_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state
        .store
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

async fn load_order(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    state
        .store
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

async fn active_discount(state: &AppState, code: &str) -> AppResult<DiscountCode> {
    state
        .store
        .discounts
        .find_by_code(code)
        .await?
        .filter(|discount| discount.active)
        .ok_or_else(|| AppError::BadRequest("Invalid or inactive discount code".into()))
}

/// Emails the order's owner, if they still exist.
async fn notify_owner(state: &AppState, order: &Order, subject: &str, body: String) {
    match state.store.users.find_by_id(order.user_id).await {
        Ok(Some(owner)) => {
            notify(
                state.mailer.as_ref(),
                EmailMessage::new(owner.email, subject, body),
            )
            .await
        }
        Ok(None) => tracing::warn!(order_id = %order.id, "order owner no longer exists"),
        Err(err) => tracing::warn!(error = %err, order_id = %order.id, "could not load order owner"),
    }
}

/// Turns a paid-for cart into an order.
///
/// Steps run in sequence: the cart must be non-empty, the payment intent must
/// report success, every line must be in stock, then stock is decremented,
/// the optional discount applied, the order stored, and the cart cleared.
/// All validation happens before the first write, but the writes themselves
/// are not atomic and concurrent orders can race on stock.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let customer = load_user(state, user.user_id).await?;

    let lines = load_cart(state, user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let payment_intent_id = payload.payment_intent_id.trim().to_string();
    if payment_intent_id.is_empty() {
        return Err(AppError::BadRequest("payment_intent_id is required".into()));
    }
    if !is_intent_id(&payment_intent_id) {
        return Err(AppError::BadRequest("payment_intent_id is malformed".into()));
    }
    let intent = state
        .payments
        .retrieve_intent(&payment_intent_id)
        .await
        .map_err(|e| AppError::Payment(format!("Failed to retrieve payment intent: {e}")))?;
    if !intent.is_succeeded() {
        return Err(AppError::BadRequest(format!(
            "Payment not completed (status: {})",
            intent.status
        )));
    }

    if let Some(short) = lines.iter().find(|line| line.product.stock < line.item.quantity) {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock for {}",
            short.product.name
        )));
    }

    let discount = match payload
        .discount_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
    {
        Some(code) => Some(active_discount(state, code).await?),
        None => None,
    };

    let order_id = Uuid::new_v4();
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let mut product = line.product;
        product.stock -= line.item.quantity;
        let product = state.store.products.save(product).await?;
        items.push(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: product.id,
            product_name: product.name,
            unit_price: product.price,
            quantity: line.item.quantity,
        });
    }

    let mut total_price = Order::items_total(&items);
    if let Some(discount) = &discount {
        total_price = discount.apply(total_price);
    }

    let order = state
        .store
        .orders
        .save(Order {
            id: order_id,
            user_id: user.user_id,
            items,
            order_date: Utc::now(),
            total_price,
            status: OrderStatus::Pending,
            payment_intent_id,
        })
        .await?;

    state.store.carts.clear(user.user_id).await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = order.total_price,
        discount = discount.as_ref().map(|d| d.code.as_str()),
        "order placed"
    );

    notify(
        state.mailer.as_ref(),
        EmailMessage::new(
            customer.email,
            "Order Confirmation",
            format!(
                "Thank you for your order! Order ID: {}\nTotal: ${:.2}\nStatus: {}",
                order.id, order.total_price, order.status
            ),
        ),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let page = pagination.page_request();
    let (items, total) = state.store.orders.find_by_user(user.user_id, page).await?;
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::for_page(&page, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = load_order(state, order_id).await?;
    user.require_owner_or(order.user_id, Permission::ActOnAnyOrder)?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let mut order = load_order(state, order_id).await?;
    user.require_owner_or(order.user_id, Permission::ActOnAnyOrder)?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "Only PENDING orders can be cancelled".into(),
        ));
    }

    state
        .payments
        .cancel_intent(&order.payment_intent_id)
        .await
        .map_err(|e| AppError::Payment(format!("Failed to cancel payment: {e}")))?;

    for item in &order.items {
        match state.store.products.find_by_id(item.product_id).await? {
            Some(mut product) => {
                product.stock += item.quantity;
                state.store.products.save(product).await?;
            }
            None => tracing::warn!(
                order_id = %order.id,
                product_id = %item.product_id,
                "cannot restock a deleted product"
            ),
        }
    }

    order.status = OrderStatus::Cancelled;
    let order = state.store.orders.save(order).await?;

    tracing::info!(order_id = %order.id, cancelled_by = %user.user_id, "order cancelled");

    notify_owner(
        state,
        &order,
        "Order Cancelled",
        format!("Your order #{} has been cancelled.", order.id),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    ))
}

/// Overwrites the status. Any transition is accepted, including out of
/// CANCELLED; stock and payment are left as they are.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<Order>> {
    user.require(Permission::ManageOrders)?;

    let mut order = load_order(state, order_id).await?;
    let previous = order.status;
    if previous == OrderStatus::Cancelled && status != OrderStatus::Cancelled {
        tracing::warn!(order_id = %order.id, to = %status, "reviving a cancelled order");
    }

    order.status = status;
    let order = state.store.orders.save(order).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %status, "order status updated");

    notify_owner(
        state,
        &order,
        "Order Status Update",
        format!("Your order #{} is now {}", order.id, order.status),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn create_payment_intent(
    state: &AppState,
    amount: f64,
) -> AppResult<ApiResponse<PaymentIntentResponse>> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }

    let intent = state
        .payments
        .create_intent(to_minor_units(amount), &state.currency)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    Ok(ApiResponse::success(
        "Payment intent created",
        PaymentIntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        },
        Some(Meta::empty()),
    ))
}

/// Creates a payment intent for the current value of the caller's cart.
pub async fn create_cart_payment_intent(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentIntentResponse>> {
    let lines = load_cart(state, user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    create_payment_intent(state, cart_total(&lines)).await
}
