use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::discounts::{CreateDiscountRequest, SetDiscountActiveRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::DiscountCode,
    response::ApiResponse,
    services::discount_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_codes).post(create_code))
        .route("/{id}/active", put(set_active))
}

#[utoipa::path(
    get,
    path = "/api/discount-codes",
    responses(
        (status = 200, description = "All discount codes", body = ApiResponse<Vec<DiscountCode>>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn list_codes(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<DiscountCode>>>> {
    Ok(Json(discount_service::list_discount_codes(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/discount-codes",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Discount code created", body = ApiResponse<DiscountCode>),
        (status = 400, description = "Duplicate code or percentage out of range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn create_code(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDiscountRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DiscountCode>>)> {
    let resp = discount_service::create_discount_code(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/discount-codes/{id}/active",
    params(("id" = Uuid, Path, description = "Discount code ID")),
    request_body = SetDiscountActiveRequest,
    responses(
        (status = 200, description = "Activation flag updated", body = ApiResponse<DiscountCode>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Discount code not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn set_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetDiscountActiveRequest>,
) -> AppResult<Json<ApiResponse<DiscountCode>>> {
    Ok(Json(
        discount_service::set_discount_active(&state, &user, id, payload).await?,
    ))
}
