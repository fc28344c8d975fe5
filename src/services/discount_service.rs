use uuid::Uuid;

use crate::{
    dto::discounts::{CreateDiscountRequest, SetDiscountActiveRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission},
    models::DiscountCode,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_discount_codes(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<DiscountCode>>> {
    user.require(Permission::ManageDiscounts)?;
    let codes = state.store.discounts.list().await?;
    Ok(ApiResponse::success("Discount codes", codes, None))
}

pub async fn create_discount_code(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDiscountRequest,
) -> AppResult<ApiResponse<DiscountCode>> {
    user.require(Permission::ManageDiscounts)?;

    let code = payload.code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    let percentage = payload.discount_percentage;
    if !(percentage > 0.0 && percentage <= 100.0) {
        return Err(AppError::BadRequest(
            "discount_percentage must be in (0, 100]".into(),
        ));
    }
    if state.store.discounts.find_by_code(&code).await?.is_some() {
        return Err(AppError::BadRequest(format!("code `{code}` already exists")));
    }

    let discount = state
        .store
        .discounts
        .save(DiscountCode {
            id: Uuid::new_v4(),
            code,
            discount_percentage: percentage,
            active: payload.active,
        })
        .await?;

    Ok(ApiResponse::success(
        "Discount code created",
        discount,
        Some(Meta::empty()),
    ))
}

pub async fn set_discount_active(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetDiscountActiveRequest,
) -> AppResult<ApiResponse<DiscountCode>> {
    user.require(Permission::ManageDiscounts)?;

    let mut discount = state
        .store
        .discounts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Discount code"))?;
    discount.active = payload.active;
    let discount = state.store.discounts.save(discount).await?;

    Ok(ApiResponse::success(
        "Discount code updated",
        discount,
        Some(Meta::empty()),
    ))
}
