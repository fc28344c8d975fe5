use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductDto, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
    store::{PageRequest, ProductFilter},
};

/// Attaches the derived average rating and category name.
pub async fn to_dto(state: &AppState, product: Product) -> AppResult<ProductDto> {
    let average_rating = state.store.reviews.average_rating(product.id).await?;
    let category_name = state
        .store
        .categories
        .find_by_id(product.category_id)
        .await?
        .map(|category| category.name);
    Ok(ProductDto {
        product,
        average_rating,
        category_name,
    })
}

async fn to_dtos(state: &AppState, products: Vec<Product>) -> AppResult<Vec<ProductDto>> {
    let mut items = Vec::with_capacity(products.len());
    for product in products {
        items.push(to_dto(state, product).await?);
    }
    Ok(items)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let page = query.page_request();
    let filter = query.to_filter();
    let (products, total) = state.store.products.find(&filter, page).await?;

    let items = to_dtos(state, products).await?;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::for_page(&page, total)),
    ))
}

/// Case-insensitive name search; a blank query lists everything.
pub async fn search_products(
    state: &AppState,
    query: Option<String>,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        name_contains: query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        ..Default::default()
    };
    let (products, _) = state
        .store
        .products
        .find(&filter, PageRequest::all())
        .await?;

    let items = to_dtos(state, products).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn products_by_category(
    state: &AppState,
    category_id: Uuid,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        category_id: Some(category_id),
        ..Default::default()
    };
    let (products, _) = state
        .store
        .products
        .find(&filter, PageRequest::all())
        .await?;

    let items = to_dtos(state, products).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDto>> {
    let product = state
        .store
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::success(
        "Product",
        to_dto(state, product).await?,
        None,
    ))
}

fn validate_fields(name: &str, price: f64, stock: i32) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("product name is required".into()));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest("price must be a non-negative number".into()));
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    Ok(())
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    if state
        .store
        .categories
        .find_by_id(category_id)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest(format!(
            "Category with ID {category_id} not found"
        )));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    user.require(Permission::ManageCatalog)?;
    validate_fields(&payload.name, payload.price, payload.stock)?;
    ensure_category(state, payload.category_id).await?;

    let product = state
        .store
        .products
        .save(Product {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            description: payload.description,
            price: payload.price,
            stock: payload.stock,
            image_url: payload.image_url,
            category_id: payload.category_id,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(product_id = %product.id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        to_dto(state, product).await?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    user.require(Permission::ManageCatalog)?;
    let mut product = state
        .store
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    if let Some(name) = payload.name {
        product.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        product.description = Some(description);
    }
    if let Some(price) = payload.price {
        product.price = price;
    }
    if let Some(stock) = payload.stock {
        product.stock = stock;
    }
    if let Some(image_url) = payload.image_url {
        product.image_url = Some(image_url);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
        product.category_id = category_id;
    }
    validate_fields(&product.name, product.price, product.stock)?;

    let product = state.store.products.save(product).await?;

    Ok(ApiResponse::success(
        "Updated",
        to_dto(state, product).await?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user.require(Permission::ManageCatalog)?;
    if !state.store.products.delete(id).await? {
        return Err(AppError::not_found("Product"));
    }

    tracing::info!(product_id = %id, "product deleted");

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
