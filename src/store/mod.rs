//! Storage interfaces, one trait per entity.
//!
//! Services only talk to these traits. `orm` backs them with sea-orm against
//! Postgres, `memory` keeps everything in process for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CartItem, Category, DiscountCode, Order, Product, Review, User},
};

pub mod memory;
pub mod orm;

pub use memory::MemoryStore;
pub use orm::OrmStore;

/// A normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page) as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    /// Everything in one page, for endpoints that are not paginated.
    pub fn all() -> Self {
        Self {
            page: 1,
            per_page: i64::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: ProductSort,
    pub descending: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = &self.name_contains {
            if !product
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if self.category_id.is_some_and(|id| id != product.category_id) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn save(&self, user: User) -> AppResult<User>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Category>>;
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>>;
    async fn list(&self) -> AppResult<Vec<Category>>;
    async fn save(&self, category: Category) -> AppResult<Category>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;
    /// Returns the requested page together with the total match count.
    async fn find(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Product>, u64)>;
    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64>;
    async fn save(&self, product: Product) -> AppResult<Product>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Lines of one user's cart, oldest first.
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<CartItem>>;
    async fn find_item(&self, id: Uuid) -> AppResult<Option<CartItem>>;
    async fn save_item(&self, item: CartItem) -> AppResult<CartItem>;
    async fn delete_item(&self, id: Uuid) -> AppResult<bool>;
    async fn clear(&self, user_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>>;
    /// One user's orders, newest first.
    async fn find_by_user(&self, user_id: Uuid, page: PageRequest)
    -> AppResult<(Vec<Order>, u64)>;
    /// True when a non-cancelled order of the user contains the product.
    async fn has_purchased(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool>;
    /// Inserts or replaces the order together with its items.
    async fn save(&self, order: Order) -> AppResult<Order>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Review>>;
    async fn find_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>>;
    async fn exists_for(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool>;
    /// Mean rating over every review of the product, 0 when there are none.
    async fn average_rating(&self, product_id: Uuid) -> AppResult<f64>;
    async fn save(&self, review: Review) -> AppResult<Review>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DiscountCode>>;
    async fn find_by_code(&self, code: &str) -> AppResult<Option<DiscountCode>>;
    async fn list(&self) -> AppResult<Vec<DiscountCode>>;
    async fn save(&self, code: DiscountCode) -> AppResult<DiscountCode>;
}

/// Handles to every entity store, cheap to clone.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub discounts: Arc<dyn DiscountStore>,
}

impl Store {
    pub fn orm(conn: sea_orm::DatabaseConnection) -> Self {
        Self::from_backend(Arc::new(OrmStore::new(conn)))
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::default()))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore
            + CategoryStore
            + ProductStore
            + CartStore
            + OrderStore
            + ReviewStore
            + DiscountStore
            + 'static,
    {
        Self {
            users: backend.clone(),
            categories: backend.clone(),
            products: backend.clone(),
            carts: backend.clone(),
            orders: backend.clone(),
            reviews: backend.clone(),
            discounts: backend,
        }
    }
}
