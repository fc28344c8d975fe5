use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{AddReviewRequest, EditReviewRequest, ReviewList},
    error::AppResult,
    middleware::auth::{AuthUser, MaybeAuthUser},
    models::Review,
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_review))
        .route("/product/{id}", get(product_reviews))
        .route("/{id}", put(edit_review).delete(delete_review))
        .route("/{id}/approve", put(approve_review))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = AddReviewRequest,
    responses(
        (status = 201, description = "Review submitted, pending approval", body = ApiResponse<Review>),
        (status = 400, description = "Not purchased, already reviewed, or invalid rating/comment"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let resp = review_service::add_review(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/reviews/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Approved reviews; moderators also see pending ones", body = ApiResponse<ReviewList>)
    ),
    tag = "Reviews"
)]
pub async fn product_reviews(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::get_product_reviews(&state, user.as_ref(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = EditReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<Review>),
        (status = 400, description = "Edit window has passed"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn edit_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::edit_review(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}/approve",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review approved", body = ApiResponse<Review>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn approve_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::approve_review(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_review(&state, &user, id).await?;
    Ok(Json(resp))
}
