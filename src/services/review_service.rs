use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    dto::reviews::{AddReviewRequest, EditReviewRequest, ReviewList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// How long after posting a review its author may still edit it.
pub const EDIT_WINDOW_HOURS: i64 = 24;
pub const MAX_COMMENT_LEN: usize = 500;

fn validate(rating: i32, comment: &str) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}

async fn load_review(state: &AppState, review_id: Uuid) -> AppResult<Review> {
    state
        .store
        .reviews
        .find_by_id(review_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review"))
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    payload: AddReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate(payload.rating, &payload.comment)?;

    if state
        .store
        .products
        .find_by_id(payload.product_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Product"));
    }

    if !state
        .store
        .orders
        .has_purchased(user.user_id, payload.product_id)
        .await?
    {
        return Err(AppError::BadRequest(
            "You can only review products you have purchased".into(),
        ));
    }

    if state
        .store
        .reviews
        .exists_for(user.user_id, payload.product_id)
        .await?
    {
        return Err(AppError::BadRequest(
            "You have already reviewed this product".into(),
        ));
    }

    let review = state
        .store
        .reviews
        .save(Review {
            id: Uuid::new_v4(),
            product_id: payload.product_id,
            user_id: user.user_id,
            username: user.username.clone(),
            rating: payload.rating,
            comment: payload.comment,
            created_at: Utc::now(),
            approved: false,
        })
        .await?;

    tracing::info!(review_id = %review.id, product_id = %review.product_id, "review submitted");

    Ok(ApiResponse::success(
        "Review submitted for moderation",
        review,
        Some(Meta::empty()),
    ))
}

/// Moderators see every review, everyone else only approved ones.
pub async fn get_product_reviews(
    state: &AppState,
    user: Option<&AuthUser>,
    product_id: Uuid,
) -> AppResult<ApiResponse<ReviewList>> {
    let sees_all = user.is_some_and(|user| user.can(Permission::ModerateReviews));
    let items = state
        .store
        .reviews
        .find_by_product(product_id)
        .await?
        .into_iter()
        .filter(|review| sees_all || review.approved)
        .collect();

    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

pub async fn approve_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<Review>> {
    user.require(Permission::ModerateReviews)?;

    let mut review = load_review(state, review_id).await?;
    review.approved = true;
    let review = state.store.reviews.save(review).await?;

    Ok(ApiResponse::success(
        "Review approved",
        review,
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.require(Permission::ModerateReviews)?;

    if !state.store.reviews.delete(review_id).await? {
        return Err(AppError::not_found("Review"));
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn edit_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    payload: EditReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate(payload.rating, &payload.comment)?;

    let mut review = load_review(state, review_id).await?;
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "You can only edit your own reviews".into(),
        ));
    }
    if review.created_at + Duration::hours(EDIT_WINDOW_HOURS) < Utc::now() {
        return Err(AppError::BadRequest(format!(
            "Reviews can only be edited within {EDIT_WINDOW_HOURS} hours of submission"
        )));
    }

    review.rating = payload.rating;
    review.comment = payload.comment;
    let review = state.store.reviews.save(review).await?;

    Ok(ApiResponse::success(
        "Review updated",
        review,
        Some(Meta::empty()),
    ))
}
