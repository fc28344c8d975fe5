use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub payment_intent_id: String,
    pub discount_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    /// Amount charged, in minor currency units.
    pub amount: i64,
    pub currency: String,
}
