use uuid::Uuid;

use crate::{
    dto::categories::CreateCategoryRequest,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission},
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<Vec<Category>>> {
    let categories = state.store.categories.list().await?;
    Ok(ApiResponse::success("Categories", categories, None))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = state
        .store
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    Ok(ApiResponse::success("Category", category, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    user.require(Permission::ManageCatalog)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("category name is required".into()));
    }
    if state.store.categories.find_by_name(&name).await?.is_some() {
        return Err(AppError::BadRequest(format!("category `{name}` already exists")));
    }

    let category = state
        .store
        .categories
        .save(Category {
            id: Uuid::new_v4(),
            name,
            description: payload.description,
        })
        .await?;

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.require(Permission::ManageCatalog)?;

    if state.store.products.count_in_category(id).await? > 0 {
        return Err(AppError::BadRequest(
            "category still has products".into(),
        ));
    }
    if !state.store.categories.delete(id).await? {
        return Err(AppError::not_found("Category"));
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
