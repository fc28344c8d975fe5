use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CartItem, Category, DiscountCode, Order, OrderStatus, Product, Review, User},
};

use super::{
    CartStore, CategoryStore, DiscountStore, OrderStore, PageRequest, ProductFilter, ProductSort,
    ProductStore, ReviewStore, UserStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    cart_items: HashMap<Uuid, CartItem>,
    orders: HashMap<Uuid, Order>,
    reviews: HashMap<Uuid, Review>,
    discounts: HashMap<Uuid, DiscountCode>,
}

/// Process-local store. Every table sits behind one lock, so each call is
/// atomic on its own but nothing spans calls.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let window = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (window, total)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn save(&self, user: User) -> AppResult<User> {
        self.tables.write().await.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|category| category.name == name)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> =
            self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn save(&self, category: Category) -> AppResult<Category> {
        self.tables
            .write()
            .await
            .categories
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Product>, u64)> {
        let mut matches: Vec<Product> = self
            .tables
            .read()
            .await
            .products
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match filter.sort {
                ProductSort::CreatedAt => a.created_at.cmp(&b.created_at),
                ProductSort::Price => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
                ProductSort::Name => a.name.cmp(&b.name),
            };
            if filter.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(paginate(matches, page))
    }

    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|product| product.category_id == category_id)
            .count() as u64)
    }

    async fn save(&self, product: Product) -> AppResult<Product> {
        self.tables
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.products.remove(&id).is_some();
        if removed {
            tables.cart_items.retain(|_, item| item.product_id != id);
            tables.reviews.retain(|_, review| review.product_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        let mut items: Vec<CartItem> = self
            .tables
            .read()
            .await
            .cart_items
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<CartItem>> {
        Ok(self.tables.read().await.cart_items.get(&id).cloned())
    }

    async fn save_item(&self, item: CartItem) -> AppResult<CartItem> {
        self.tables
            .write()
            .await
            .cart_items
            .insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.cart_items.remove(&id).is_some())
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        self.tables
            .write()
            .await
            .cart_items
            .retain(|_, item| item.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> AppResult<(Vec<Order>, u64)> {
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(paginate(orders, page))
    }

    async fn has_purchased(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().any(|order| {
            order.user_id == user_id
                && order.status != OrderStatus::Cancelled
                && order.contains_product(product_id)
        }))
    }

    async fn save(&self, order: Order) -> AppResult<Order> {
        self.tables
            .write()
            .await
            .orders
            .insert(order.id, order.clone());
        Ok(order)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn find_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .tables
            .read()
            .await
            .reviews
            .values()
            .filter(|review| review.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn exists_for(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .any(|review| review.user_id == user_id && review.product_id == product_id))
    }

    async fn average_rating(&self, product_id: Uuid) -> AppResult<f64> {
        let tables = self.tables.read().await;
        let ratings: Vec<i32> = tables
            .reviews
            .values()
            .filter(|review| review.product_id == product_id)
            .map(|review| review.rating)
            .collect();
        if ratings.is_empty() {
            return Ok(0.0);
        }
        let sum: i32 = ratings.iter().sum();
        Ok(f64::from(sum) / ratings.len() as f64)
    }

    async fn save(&self, review: Review) -> AppResult<Review> {
        self.tables
            .write()
            .await
            .reviews
            .insert(review.id, review.clone());
        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DiscountCode>> {
        Ok(self.tables.read().await.discounts.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<DiscountCode>> {
        let tables = self.tables.read().await;
        Ok(tables
            .discounts
            .values()
            .find(|discount| discount.code == code)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<DiscountCode>> {
        let mut codes: Vec<DiscountCode> =
            self.tables.read().await.discounts.values().cloned().collect();
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(codes)
    }

    async fn save(&self, code: DiscountCode) -> AppResult<DiscountCode> {
        self.tables
            .write()
            .await
            .discounts
            .insert(code.id, code.clone());
        Ok(code)
    }
}
